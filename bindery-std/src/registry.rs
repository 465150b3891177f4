//! Callback registry - stable string id to callback.
//!
//! There is one process-wide registry ([`Registry::global`]) that markup
//! resolves against by default. Standalone registries can be created for
//! isolation and handed to a [`Processor`](crate::processor::Processor).
//!
//! Registration is first-wins: a second callback with an id that is already
//! present is rejected, and the original keeps working.

use crate::codec::BoundReference;
use bindery_core::{Callback, RegistryError};
use std::{
    any::Any,
    collections::HashMap,
    sync::{Arc, LazyLock, PoisonError, RwLock},
};

static GLOBAL: LazyLock<Arc<Registry>> = LazyLock::new(|| Arc::new(Registry::new()));

/// A map from callback id to [`Callback`].
#[derive(Default)]
pub struct Registry {
    callbacks: RwLock<HashMap<String, Callback>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static Arc<Registry> {
        &GLOBAL
    }

    /// Add a callback, failing if the id is taken.
    pub fn try_register(&self, callback: Callback) -> Result<(), RegistryError> {
        let mut callbacks = self.callbacks.write().unwrap_or_else(PoisonError::into_inner);
        if callbacks.contains_key(callback.id()) {
            return Err(RegistryError::Duplicate(callback.id().to_string()));
        }
        callbacks.insert(callback.id().to_string(), callback);
        Ok(())
    }

    /// Add a callback.
    ///
    /// Returns `false` and logs a warning if the id is already registered; the
    /// existing registration is left untouched.
    pub fn register(&self, callback: Callback) -> bool {
        match self.try_register(callback) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring duplicate callback registration");
                false
            }
        }
    }

    /// Remove a callback. Returns whether it was present.
    pub fn unregister(&self, id: &str) -> bool {
        self.callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    /// Look up a callback.
    pub fn resolve(&self, id: &str) -> Option<Callback> {
        self.callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// Drop every registration.
    pub fn clear(&self) {
        self.callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.callbacks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("ids", &self.ids()).finish()
    }
}

/// The id carried by a callback-shaped value, if `value` is one.
pub fn callback_id(value: &dyn Any) -> Option<&str> {
    if let Some(callback) = value.downcast_ref::<Callback>() {
        Some(callback.id())
    } else {
        value.downcast_ref::<BoundReference>().map(BoundReference::id)
    }
}

/// Type guard for bulk loaders: whether `value` is a callback value built by
/// this crate (a [`Callback`], a `Vec<Callback>` or a [`BoundReference`])
/// rather than some other module export.
///
/// Says nothing about registration; use [`Registry::contains`] for that.
pub fn is_registered_callback(value: &dyn Any) -> bool {
    callback_id(value).is_some() || value.is::<Vec<Callback>>()
}

// ============================================================================
// Global shorthands
// ============================================================================

/// [`Registry::register`] on the global registry.
pub fn register(callback: Callback) -> bool {
    Registry::global().register(callback)
}

/// [`Registry::unregister`] on the global registry.
pub fn unregister(id: &str) -> bool {
    Registry::global().unregister(id)
}

/// [`Registry::resolve`] on the global registry.
pub fn resolve(id: &str) -> Option<Callback> {
    Registry::global().resolve(id)
}
