//! DOM events and listener storage.
//!
//! Dispatch follows the DOM path model: capture listeners from the document
//! down to the target's parent, then the target's own listeners, then (for
//! bubbling events) non-capture listeners back up to the document.

use super::{Document, NodeId};
use crate::window::Window;
use std::{cell::Cell, rc::Rc};

/// Parameters for a synthetic event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventInit {
    /// Event type, e.g. `"click"`.
    pub event_type: String,
    /// Whether the event bubbles.
    pub bubbles: bool,
    /// Whether `prevent_default` has an effect.
    pub cancelable: bool,
}

impl EventInit {
    /// A non-bubbling, non-cancelable event.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            bubbles: false,
            cancelable: false,
        }
    }

    /// A bubbling, cancelable event, the shape of most UI events.
    pub fn bubbling(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            bubbles: true,
            cancelable: true,
        }
    }

    /// Set whether the event bubbles.
    pub fn with_bubbles(mut self, bubbles: bool) -> Self {
        self.bubbles = bubbles;
        self
    }

    /// Set whether the event is cancelable.
    pub fn with_cancelable(mut self, cancelable: bool) -> Self {
        self.cancelable = cancelable;
        self
    }
}

/// Dispatch phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    /// Not being dispatched.
    None,
    /// Travelling from the document towards the target.
    Capturing,
    /// At the target.
    AtTarget,
    /// Travelling back up to the document.
    Bubbling,
}

/// An event being dispatched through a [`Document`].
pub struct Event {
    init: EventInit,
    document: Document,
    target: NodeId,
    current_target: Cell<NodeId>,
    phase: Cell<EventPhase>,
    default_prevented: Cell<bool>,
    propagation_stopped: Cell<bool>,
    immediate_stopped: Cell<bool>,
}

impl Event {
    pub(crate) fn new(document: Document, target: NodeId, init: EventInit) -> Self {
        Self {
            init,
            document,
            target,
            current_target: Cell::new(target),
            phase: Cell::new(EventPhase::None),
            default_prevented: Cell::new(false),
            propagation_stopped: Cell::new(false),
            immediate_stopped: Cell::new(false),
        }
    }

    /// Event type.
    pub fn event_type(&self) -> &str {
        &self.init.event_type
    }

    /// Whether the event bubbles.
    pub fn bubbles(&self) -> bool {
        self.init.bubbles
    }

    /// Whether the event is cancelable.
    pub fn cancelable(&self) -> bool {
        self.init.cancelable
    }

    /// The node the event was dispatched at.
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// The node whose listeners are currently running.
    ///
    /// Delegating listeners re-point this at the element whose binding is
    /// being invoked, see [`Event::retarget`].
    pub fn current_target(&self) -> NodeId {
        self.current_target.get()
    }

    /// Point `current_target` at `node` for the handlers that run next.
    pub fn retarget(&self, node: NodeId) {
        self.current_target.set(node);
    }

    /// Current dispatch phase.
    pub fn phase(&self) -> EventPhase {
        self.phase.get()
    }

    /// The document the event is dispatched in.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// The window owning the event's document, if any.
    pub fn view(&self) -> Option<Window> {
        self.document.default_view()
    }

    /// Cancel the default action, if the event is cancelable.
    pub fn prevent_default(&self) {
        if self.init.cancelable {
            self.default_prevented.set(true);
        }
    }

    /// Whether the default action was canceled.
    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    /// Stop the event from reaching further nodes.
    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    /// Stop the event from reaching any further listener, including the
    /// remaining listeners on the current node.
    pub fn stop_immediate_propagation(&self) {
        self.propagation_stopped.set(true);
        self.immediate_stopped.set(true);
    }

    /// Whether `stop_propagation` (or the immediate variant) was called.
    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }

    /// Whether `stop_immediate_propagation` was called.
    pub fn immediate_propagation_stopped(&self) -> bool {
        self.immediate_stopped.get()
    }

    pub(crate) fn set_phase(&self, phase: EventPhase) {
        self.phase.set(phase);
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("type", &self.init.event_type)
            .field("target", &self.target)
            .field("current_target", &self.current_target.get())
            .field("phase", &self.phase.get())
            .finish()
    }
}

/// Options for [`Document::add_event_listener`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    /// Run during the capture phase.
    pub capture: bool,
    /// Remove the listener after its first invocation.
    pub once: bool,
}

impl ListenerOptions {
    /// Capture-phase listener.
    pub fn capture() -> Self {
        Self {
            capture: true,
            once: false,
        }
    }

    /// One-shot listener.
    pub fn once() -> Self {
        Self {
            capture: false,
            once: true,
        }
    }
}

/// Handle returned by [`Document::add_event_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

pub(crate) type ListenerFn = Rc<dyn Fn(&Event)>;

pub(crate) struct ListenerEntry {
    pub id: ListenerId,
    pub target: NodeId,
    pub event_type: String,
    pub options: ListenerOptions,
    pub callback: ListenerFn,
}

#[derive(Default)]
pub(crate) struct ListenerTable {
    entries: Vec<ListenerEntry>,
    next_id: u64,
    additions: u64,
}

impl ListenerTable {
    pub fn add(
        &mut self,
        target: NodeId,
        event_type: &str,
        options: ListenerOptions,
        callback: ListenerFn,
    ) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.additions += 1;
        self.entries.push(ListenerEntry {
            id,
            target,
            event_type: event_type.to_string(),
            options,
            callback,
        });
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() < before
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn additions(&self) -> u64 {
        self.additions
    }

    pub fn count(&self, target: NodeId, event_type: &str) -> usize {
        self.entries
            .iter()
            .filter(|e| e.target == target && e.event_type == event_type)
            .count()
    }

    /// Snapshot of listeners on `target` for `event_type` matching `capture`.
    pub fn matching(
        &self,
        target: NodeId,
        event_type: &str,
        capture: Option<bool>,
    ) -> Vec<(ListenerId, bool, ListenerFn)> {
        self.entries
            .iter()
            .filter(|e| {
                e.target == target
                    && e.event_type == event_type
                    && capture.is_none_or(|c| e.options.capture == c)
            })
            .map(|e| (e.id, e.options.once, Rc::clone(&e.callback)))
            .collect()
    }
}
