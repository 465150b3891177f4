//! Typed extension slots.
//!
//! Documents and windows carry an [`Extensions`] map so that higher layers
//! (wiring state, scheduler state) can hang per-document data off the host
//! objects without the host knowing their types.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    rc::Rc,
};

/// A map from type to a single shared value of that type.
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Rc<dyn Any>>,
}

impl Extensions {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value of type `T`, inserting `T::default()` on first access.
    pub fn get_or_default<T: Default + 'static>(&mut self) -> Rc<T> {
        let slot = self
            .map
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Rc::new(T::default()) as Rc<dyn Any>);
        match Rc::clone(slot).downcast::<T>() {
            Ok(value) => value,
            // The key is the TypeId of T, so the downcast cannot miss.
            Err(_) => unreachable!("extension slot holds a foreign type"),
        }
    }

    /// Get the value of type `T` if present.
    pub fn get<T: 'static>(&self) -> Option<Rc<T>> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|slot| Rc::clone(slot).downcast::<T>().ok())
    }

    /// Remove the value of type `T`.
    pub fn remove<T: 'static>(&mut self) -> Option<Rc<T>> {
        self.map
            .remove(&TypeId::of::<T>())
            .and_then(|slot| slot.downcast::<T>().ok())
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if no values are stored.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl std::fmt::Debug for Extensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extensions")
            .field("len", &self.map.len())
            .finish()
    }
}
