//! Element handle - a document plus a node id.

use crate::{
    dom::{Document, NodeId},
    window::Window,
};

/// An element in a specific document.
///
/// This is what mount-style callbacks receive. Cloning is cheap.
#[derive(Clone)]
pub struct Element {
    document: Document,
    node: NodeId,
}

impl Element {
    /// Wrap `node` of `document`.
    pub fn new(document: Document, node: NodeId) -> Self {
        Self { document, node }
    }

    /// Node id inside the owner document.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Owner document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Owner window, if the document is displayed.
    pub fn window(&self) -> Option<Window> {
        self.document.default_view()
    }

    /// Lowercase tag name.
    pub fn tag_name(&self) -> String {
        self.document.tag_name(self.node).unwrap_or_default()
    }

    /// Whether the element is attached to its document.
    pub fn is_connected(&self) -> bool {
        self.document.is_connected(self.node)
    }

    /// Get an attribute.
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.document.get_attribute(self.node, name)
    }

    /// Whether the element has an attribute.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.document.has_attribute(self.node, name)
    }

    /// Set an attribute.
    pub fn set_attribute(&self, name: &str, value: &str) {
        self.document.set_attribute(self.node, name, value);
    }

    /// Remove an attribute.
    pub fn remove_attribute(&self, name: &str) -> Option<String> {
        self.document.remove_attribute(self.node, name)
    }

    /// Whether the element has a class.
    pub fn has_class(&self, class: &str) -> bool {
        self.document.has_class(self.node, class)
    }

    /// Add a class.
    pub fn add_class(&self, class: &str) {
        self.document.add_class(self.node, class);
    }

    /// Remove a class.
    pub fn remove_class(&self, class: &str) {
        self.document.remove_class(self.node, class);
    }

    /// Toggle a class, returning whether it is now present.
    pub fn toggle_class(&self, class: &str, force: Option<bool>) -> bool {
        self.document.toggle_class(self.node, class, force)
    }

    /// Descendant elements in document order, not including this one.
    pub fn descendants(&self) -> Vec<Element> {
        self.document
            .descendants(self.node)
            .into_iter()
            .map(|node| Element::new(self.document.clone(), node))
            .collect()
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node && self.document.ptr_eq(&other.document)
    }
}

impl Eq for Element {}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Element")
            .field("document", &self.document.id())
            .field("node", &self.node)
            .field("tag", &self.tag_name())
            .finish()
    }
}
