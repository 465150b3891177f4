//! Bulk registration.
//!
//! Aggregator code calls [`load_callbacks`] once at startup with every
//! module's exported callbacks. Loading is idempotent and order independent:
//! loading the very same callback again is silently accepted, and only a
//! *different* callback reusing a taken id is reported.

use crate::registry::{Registry, callback_id, is_registered_callback};
use bindery_core::{Callback, CallbackSource, RegistryError};
use std::any::Any;

/// Outcome of a bulk load.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Callbacks newly registered.
    pub registered: usize,
    /// Callbacks that were already registered as-is.
    pub unchanged: usize,
    /// Callbacks rejected because another callback holds their id.
    pub conflicts: usize,
}

/// Load callbacks into the global registry.
pub fn load_callbacks(sources: &[&dyn CallbackSource]) -> LoadReport {
    load_callbacks_into(Registry::global(), sources)
}

/// Load callbacks into a specific registry.
pub fn load_callbacks_into(registry: &Registry, sources: &[&dyn CallbackSource]) -> LoadReport {
    let mut report = LoadReport::default();
    for source in sources {
        for callback in source.callbacks() {
            load_one(registry, callback, &mut report);
        }
    }
    tracing::debug!(?report, "callbacks loaded");
    report
}

fn load_one(registry: &Registry, callback: Callback, report: &mut LoadReport) {
    match registry.try_register(callback.clone()) {
        Ok(()) => report.registered += 1,
        Err(RegistryError::Duplicate(id)) => {
            let same = registry
                .resolve(&id)
                .is_some_and(|existing| existing.same_as(&callback));
            if same {
                report.unchanged += 1;
            } else {
                tracing::warn!(id, "a different callback is already registered under this id");
                report.conflicts += 1;
            }
        }
        Err(err) => tracing::warn!(error = %err, "callback not loaded"),
    }
}

/// Load whatever callbacks are found among arbitrary module exports.
///
/// Exports are filtered with [`is_registered_callback`]; a [`Callback`] or a
/// `Vec<Callback>` is loaded, anything else is ignored.
pub fn load_callbacks_from_exports(exports: &[&dyn Any]) -> LoadReport {
    load_exports_into(Registry::global(), exports)
}

/// [`load_callbacks_from_exports`] into a specific registry.
pub fn load_exports_into(registry: &Registry, exports: &[&dyn Any]) -> LoadReport {
    let mut report = LoadReport::default();
    for &export in exports {
        if !is_registered_callback(export) {
            tracing::trace!("export is not a callback, skipped");
            continue;
        }
        if let Some(callbacks) = export.downcast_ref::<Vec<Callback>>() {
            for callback in callbacks {
                load_one(registry, callback.clone(), &mut report);
            }
        } else if let Some(callback) = export.downcast_ref::<Callback>() {
            load_one(registry, callback.clone(), &mut report);
        } else {
            tracing::debug!(
                id = callback_id(export),
                "bound reference carries no handler, skipped"
            );
        }
    }
    report
}

// ============================================================================
// Distributed collection
// ============================================================================

/// A callback submitted with `inventory::submit!`.
///
/// The attribute macros emit one of these per annotated function. The
/// factory must hand out the same callback on every call (the macros back it
/// with a static) so repeated loads are recognised as unchanged.
#[cfg(feature = "inventory")]
pub struct CollectedCallback {
    factory: fn() -> Callback,
}

#[cfg(feature = "inventory")]
impl CollectedCallback {
    /// Wrap a factory.
    pub const fn new(factory: fn() -> Callback) -> Self {
        Self { factory }
    }

    /// Build the callback.
    pub fn callback(&self) -> Callback {
        (self.factory)()
    }
}

#[cfg(feature = "inventory")]
inventory::collect!(CollectedCallback);

/// Every collected callback, sorted by id.
#[cfg(feature = "inventory")]
pub fn collected_callbacks() -> Vec<Callback> {
    let mut callbacks: Vec<Callback> = inventory::iter::<CollectedCallback>
        .into_iter()
        .map(CollectedCallback::callback)
        .collect();
    callbacks.sort_by(|a, b| a.id().cmp(b.id()));
    callbacks
}

/// Load every collected callback into the global registry.
#[cfg(feature = "inventory")]
pub fn load_collected_callbacks() -> LoadReport {
    load_callbacks(&[&collected_callbacks()])
}
