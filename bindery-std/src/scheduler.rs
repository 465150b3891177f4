//! Sweep scheduler - at most one sweep per animation frame per window.
//!
//! ```text
//! Idle --schedule--> Scheduled --frame--> Running --done--> Idle
//!                        ^                   |
//!                        +----schedule-------+  (rerun requested)
//! ```
//!
//! Calls while `Scheduled` collapse into the pending frame. Calls while
//! `Running` request one more frame, so mutations made by handlers during the
//! sweep are picked up. Each window carries its own state; closing a window
//! drops its pending sweep.

use crate::{documents, processor::Processor};
use bindery_core::{NodeId, Window, window::FrameId};
use std::cell::{Cell, RefCell};

/// Where a window's scheduler is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchedulerState {
    /// Nothing pending.
    #[default]
    Idle,
    /// A sweep is queued for the next animation frame.
    Scheduled,
    /// A sweep is running.
    Running,
}

#[derive(Default)]
struct SchedulerSlot {
    state: Cell<SchedulerState>,
    rerun: Cell<bool>,
    frame: Cell<Option<FrameId>>,
    sweeps: Cell<u64>,
    unload_hooked: Cell<bool>,
    processor: RefCell<Option<Processor>>,
}

/// Request a sweep of `window`'s document with the global registry.
pub fn schedule_process_root(window: &Window) {
    schedule(window, None);
}

/// Request a sweep of `window`'s document with a specific processor.
///
/// The most recent processor handed in is the one the sweep uses.
pub fn schedule_process_root_with(window: &Window, processor: Processor) {
    schedule(window, Some(processor));
}

fn schedule(window: &Window, processor: Option<Processor>) {
    if window.is_closed() {
        tracing::debug!(window = ?window.id(), "not scheduling a sweep on a closed window");
        return;
    }
    documents::track(window);

    let slot = window.extension::<SchedulerSlot>();
    if processor.is_some() {
        *slot.processor.borrow_mut() = processor;
    }
    if !slot.unload_hooked.replace(true) {
        window.add_unload_listener(cancel_pending);
    }

    match slot.state.get() {
        SchedulerState::Idle => request_frame(window, &slot),
        SchedulerState::Scheduled => {
            tracing::trace!(window = ?window.id(), "sweep already scheduled");
        }
        SchedulerState::Running => slot.rerun.set(true),
    }
}

fn request_frame(window: &Window, slot: &SchedulerSlot) {
    slot.state.set(SchedulerState::Scheduled);
    let target = window.clone();
    let frame = window.request_animation_frame(move |_| run_sweep(&target));
    slot.frame.set(Some(frame));
}

fn run_sweep(window: &Window) {
    let slot = window.extension::<SchedulerSlot>();
    slot.frame.set(None);
    if window.is_closed() {
        slot.state.set(SchedulerState::Idle);
        return;
    }

    slot.state.set(SchedulerState::Running);
    let processor = slot.processor.borrow().clone().unwrap_or_default();
    let report = processor.process_root(window.document(), NodeId::DOCUMENT);
    slot.sweeps.set(slot.sweeps.get() + 1);
    tracing::debug!(window = ?window.id(), ?report, "scheduled sweep ran");

    if slot.rerun.replace(false) && !window.is_closed() {
        request_frame(window, &slot);
    } else {
        slot.state.set(SchedulerState::Idle);
    }
}

fn cancel_pending(window: &Window) {
    let slot = window.extension::<SchedulerSlot>();
    if let Some(frame) = slot.frame.take() {
        window.cancel_animation_frame(frame);
        tracing::debug!(window = ?window.id(), "dropped pending sweep on unload");
    }
    slot.rerun.set(false);
    slot.state.set(SchedulerState::Idle);
}

/// Current scheduler state of `window`.
pub fn scheduler_state(window: &Window) -> SchedulerState {
    window.extension::<SchedulerSlot>().state.get()
}

/// Number of scheduled sweeps that have run on `window`.
pub fn sweep_count(window: &Window) -> u64 {
    window.extension::<SchedulerSlot>().sweeps.get()
}
