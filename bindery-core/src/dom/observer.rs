//! Attribute mutation observers.
//!
//! Unlike the browser's `MutationObserver`, records are delivered
//! synchronously, right after the mutation and after every internal borrow
//! has been released, so observers may freely mutate the document.

use super::{Document, NodeId};
use std::rc::Rc;

/// A single attribute change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMutation {
    /// Element whose attribute changed.
    pub target: NodeId,
    /// Attribute name (`"class"` for class list changes).
    pub name: String,
    /// Value before the change, `None` if the attribute was absent.
    pub old_value: Option<String>,
}

/// Handle returned by [`Document::observe_attributes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u64);

pub(crate) type ObserverFn = Rc<dyn Fn(&Document, &AttributeMutation)>;

#[derive(Default)]
pub(crate) struct ObserverTable {
    entries: Vec<(ObserverId, NodeId, ObserverFn)>,
    next_id: u64,
}

impl ObserverTable {
    pub fn add(&mut self, target: NodeId, callback: ObserverFn) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, target, callback));
        id
    }

    pub fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _, _)| *entry != id);
        self.entries.len() < before
    }

    pub fn for_target(&self, target: NodeId) -> Vec<ObserverFn> {
        self.entries
            .iter()
            .filter(|(_, node, _)| *node == target)
            .map(|(_, _, cb)| Rc::clone(cb))
            .collect()
    }

    pub fn count(&self, target: NodeId) -> usize {
        self.entries.iter().filter(|(_, node, _)| *node == target).count()
    }
}
