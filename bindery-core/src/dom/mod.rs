//! Host DOM - a single-threaded document model.
//!
//! [`Document`] is a cheap-to-clone handle to an arena tree. It provides the
//! slice of the browser DOM the callback system relies on: attribute and class
//! manipulation, event listeners with capture/target/bubble dispatch,
//! attribute observers, and a typed extension slot for per-document state.
//!
//! Every method takes `&self`; interior state sits behind `RefCell`s whose
//! borrows never span a user callback.

mod event;
mod node;
mod observer;

pub use event::{Event, EventInit, EventPhase, ListenerId, ListenerOptions};
pub use node::{Attribute, ElementData, NodeData, NodeId};
pub use observer::{AttributeMutation, ObserverId};

use crate::{
    error::DomError,
    extensions::Extensions,
    window::{Window, WindowInner},
};
use event::ListenerTable;
use node::Tree;
use observer::ObserverTable;
use std::{
    cell::RefCell,
    rc::{Rc, Weak},
    sync::atomic::{AtomicU64, Ordering},
};

/// Process-unique document identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

impl DocumentId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

struct DocumentInner {
    id: DocumentId,
    tree: RefCell<Tree>,
    listeners: RefCell<ListenerTable>,
    observers: RefCell<ObserverTable>,
    extensions: RefCell<Extensions>,
    view: RefCell<Weak<WindowInner>>,
}

/// Handle to an HTML document.
#[derive(Clone)]
pub struct Document(Rc<DocumentInner>);

impl Document {
    /// Create a document with the usual `html`/`head`/`body` skeleton.
    pub fn new() -> Self {
        let doc = Self::empty();
        let html = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        // Fresh nodes under a container: none of these can fail.
        let _ = doc.append_child(NodeId::DOCUMENT, html);
        let _ = doc.append_child(html, head);
        let _ = doc.append_child(html, body);
        doc
    }

    /// Create a document containing only the document node.
    pub fn empty() -> Self {
        Self(Rc::new(DocumentInner {
            id: DocumentId::next(),
            tree: RefCell::new(Tree::new()),
            listeners: RefCell::new(ListenerTable::default()),
            observers: RefCell::new(ObserverTable::default()),
            extensions: RefCell::new(Extensions::new()),
            view: RefCell::new(Weak::new()),
        }))
    }

    /// Document identifier.
    pub fn id(&self) -> DocumentId {
        self.0.id
    }

    /// Whether two handles refer to the same document.
    pub fn ptr_eq(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// The document node.
    pub fn root(&self) -> NodeId {
        NodeId::DOCUMENT
    }

    /// The window this document is displayed in.
    pub fn default_view(&self) -> Option<Window> {
        self.0.view.borrow().upgrade().map(Window::from_inner)
    }

    pub(crate) fn set_view(&self, view: Weak<WindowInner>) {
        *self.0.view.borrow_mut() = view;
    }

    // ========================================================================
    // Tree
    // ========================================================================

    /// Create a detached element.
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.0
            .tree
            .borrow_mut()
            .push(NodeData::Element(ElementData::new(tag)))
    }

    /// Create a detached text node.
    pub fn create_text(&self, text: &str) -> NodeId {
        self.0.tree.borrow_mut().push(NodeData::Text(text.to_string()))
    }

    /// Create a detached comment node.
    pub fn create_comment(&self, text: &str) -> NodeId {
        self.0
            .tree
            .borrow_mut()
            .push(NodeData::Comment(text.to_string()))
    }

    /// Append `child` as the last child of `parent`, moving it if attached.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.0.tree.borrow_mut().insert(parent, child, None)
    }

    /// Insert `child` before `reference` (or append when `None`).
    ///
    /// Fails with [`DomError::NotFound`] if `reference` is not a child of
    /// `parent`.
    pub fn insert_before(
        &self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.0.tree.borrow_mut().insert(parent, child, reference)
    }

    /// Detach `node` from its parent. The node and its subtree stay usable.
    pub fn remove(&self, node: NodeId) -> Result<(), DomError> {
        self.0.tree.borrow_mut().detach(node)
    }

    /// Parent of `node`.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.0.tree.borrow().parent(node)
    }

    /// Children of `node`.
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.0
            .tree
            .borrow()
            .get(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// `node` and all of its descendants, in document order.
    pub fn subtree(&self, node: NodeId) -> Vec<NodeId> {
        self.0.tree.borrow().subtree(node)
    }

    /// Element nodes of the subtree rooted at `node`, in document order.
    pub fn elements(&self, node: NodeId) -> Vec<NodeId> {
        let tree = self.0.tree.borrow();
        tree.subtree(node)
            .into_iter()
            .filter(|id| tree.element(*id).is_some())
            .collect()
    }

    /// Element descendants of `node`, in document order, not including `node`.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut elements = self.elements(node);
        if elements.first() == Some(&node) {
            elements.remove(0);
        }
        elements
    }

    /// Ancestors of `node`, nearest first, not including `node`.
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let tree = self.0.tree.borrow();
        let mut out = Vec::new();
        let mut current = tree.parent(node);
        while let Some(id) = current {
            out.push(id);
            current = tree.parent(id);
        }
        out
    }

    /// Whether `node` is attached to the document node.
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.0
            .tree
            .borrow()
            .is_inclusive_ancestor(NodeId::DOCUMENT, node)
    }

    /// Whether `ancestor` is `node` or contains it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.0.tree.borrow().is_inclusive_ancestor(ancestor, node)
    }

    /// Number of nodes ever created in this document.
    pub fn node_count(&self) -> usize {
        self.0.tree.borrow().len()
    }

    /// A clone of the node's data.
    pub fn node_data(&self, node: NodeId) -> Option<NodeData> {
        self.0.tree.borrow().get(node).ok().map(|n| n.data.clone())
    }

    /// Whether `node` is an element.
    pub fn is_element(&self, node: NodeId) -> bool {
        self.0.tree.borrow().element(node).is_some()
    }

    /// Lowercase tag name of an element.
    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        self.0.tree.borrow().element(node).map(|e| e.tag.clone())
    }

    /// The `<html>` element.
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(NodeId::DOCUMENT)
            .into_iter()
            .find(|id| self.is_element(*id))
    }

    /// The `<body>` element.
    pub fn body(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.children(html)
            .into_iter()
            .find(|id| self.tag_name(*id).as_deref() == Some("body"))
    }

    /// First connected element whose `id` attribute equals `id`.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        let tree = self.0.tree.borrow();
        tree.subtree(NodeId::DOCUMENT)
            .into_iter()
            .find(|node| tree.element(*node).and_then(|e| e.get("id")) == Some(id))
    }

    /// Concatenated text of the subtree.
    pub fn text_content(&self, node: NodeId) -> String {
        let tree = self.0.tree.borrow();
        let mut out = String::new();
        for id in tree.subtree(node) {
            if let Ok(n) = tree.get(id)
                && let NodeData::Text(t) = &n.data
            {
                out.push_str(t);
            }
        }
        out
    }

    /// Replace the children of `node` with a single text node.
    pub fn set_text_content(&self, node: NodeId, text: &str) -> Result<(), DomError> {
        for child in self.children(node) {
            self.remove(child)?;
        }
        if !text.is_empty() {
            let t = self.create_text(text);
            self.append_child(node, t)?;
        }
        Ok(())
    }

    // ========================================================================
    // Attributes & classes
    // ========================================================================

    /// Get an attribute.
    pub fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.0
            .tree
            .borrow()
            .element(node)
            .and_then(|e| e.get(name).map(str::to_string))
    }

    /// Whether the element has an attribute.
    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.0
            .tree
            .borrow()
            .element(node)
            .is_some_and(|e| e.get(name).is_some())
    }

    /// All attributes of an element, in insertion order.
    pub fn attributes(&self, node: NodeId) -> Vec<Attribute> {
        self.0
            .tree
            .borrow()
            .element(node)
            .map(|e| e.attrs.clone())
            .unwrap_or_default()
    }

    /// Set an attribute. Non-elements are ignored.
    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        let old = {
            let mut tree = self.0.tree.borrow_mut();
            let Some(element) = tree.element_mut(node) else {
                return;
            };
            element.set(&name, value.to_string())
        };
        if old.as_deref() != Some(value) {
            self.notify(node, name, old);
        }
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        let old = self.0.tree.borrow_mut().element_mut(node)?.remove(&name);
        if old.is_some() {
            self.notify(node, name, old.clone());
        }
        old
    }

    /// Class names from the `class` attribute.
    pub fn class_list(&self, node: NodeId) -> Vec<String> {
        self.get_attribute(node, "class")
            .map(|v| v.split_ascii_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Whether the element has a class.
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.0
            .tree
            .borrow()
            .element(node)
            .and_then(|e| e.get("class"))
            .is_some_and(|v| v.split_ascii_whitespace().any(|c| c == class))
    }

    /// Add a class. No-op if present.
    pub fn add_class(&self, node: NodeId, class: &str) {
        self.toggle_class(node, class, Some(true));
    }

    /// Remove a class. No-op if absent.
    pub fn remove_class(&self, node: NodeId, class: &str) {
        self.toggle_class(node, class, Some(false));
    }

    /// Toggle a class, or force it on/off. Returns whether it is now present.
    pub fn toggle_class(&self, node: NodeId, class: &str, force: Option<bool>) -> bool {
        let mut classes = self.class_list(node);
        let present = classes.iter().any(|c| c == class);
        let want = force.unwrap_or(!present);
        if want == present {
            return present;
        }
        if want {
            classes.push(class.to_string());
        } else {
            classes.retain(|c| c != class);
        }
        self.set_attribute(node, "class", &classes.join(" "));
        want
    }

    fn notify(&self, target: NodeId, name: String, old_value: Option<String>) {
        let observers = self.0.observers.borrow().for_target(target);
        if observers.is_empty() {
            return;
        }
        let record = AttributeMutation {
            target,
            name,
            old_value,
        };
        for observer in observers {
            observer(self, &record);
        }
    }

    // ========================================================================
    // Observers
    // ========================================================================

    /// Observe attribute changes on `node`.
    pub fn observe_attributes(
        &self,
        node: NodeId,
        callback: impl Fn(&Document, &AttributeMutation) + 'static,
    ) -> ObserverId {
        self.0.observers.borrow_mut().add(node, Rc::new(callback))
    }

    /// Stop an observer. Returns `false` if it was already gone.
    pub fn disconnect_observer(&self, id: ObserverId) -> bool {
        self.0.observers.borrow_mut().remove(id)
    }

    /// Number of observers attached to `node`.
    pub fn observer_count(&self, node: NodeId) -> usize {
        self.0.observers.borrow().count(node)
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Register an event listener on `target` (an element or the document).
    pub fn add_event_listener(
        &self,
        target: NodeId,
        event_type: &str,
        options: ListenerOptions,
        listener: impl Fn(&Event) + 'static,
    ) -> ListenerId {
        self.0
            .listeners
            .borrow_mut()
            .add(target, event_type, options, Rc::new(listener))
    }

    /// Remove a listener. Returns `false` if it was already gone.
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.0.listeners.borrow_mut().remove(id)
    }

    /// Number of listeners on `target` for `event_type`.
    pub fn listener_count(&self, target: NodeId, event_type: &str) -> usize {
        self.0.listeners.borrow().count(target, event_type)
    }

    /// Total number of `add_event_listener` calls made on this document.
    pub fn listener_additions(&self) -> u64 {
        self.0.listeners.borrow().additions()
    }

    /// Dispatch an event at `target`.
    ///
    /// Returns `false` if a listener canceled the default action.
    pub fn dispatch_event(&self, target: NodeId, init: EventInit) -> bool {
        let event = Event::new(self.clone(), target, init);
        let mut path = self.ancestors(target);
        path.reverse();

        event.set_phase(event::EventPhase::Capturing);
        for node in &path {
            self.invoke(&event, *node, Some(true));
            if event.propagation_stopped() {
                return self.finish(&event);
            }
        }

        event.set_phase(event::EventPhase::AtTarget);
        self.invoke(&event, target, Some(true));
        if !event.immediate_propagation_stopped() {
            self.invoke(&event, target, Some(false));
        }
        if event.propagation_stopped() || !event.bubbles() {
            return self.finish(&event);
        }

        event.set_phase(event::EventPhase::Bubbling);
        for node in path.iter().rev() {
            self.invoke(&event, *node, Some(false));
            if event.propagation_stopped() {
                break;
            }
        }
        self.finish(&event)
    }

    fn invoke(&self, event: &Event, node: NodeId, capture: Option<bool>) {
        let listeners =
            self.0
                .listeners
                .borrow()
                .matching(node, event.event_type(), capture);
        for (id, once, callback) in listeners {
            // A listener removed by an earlier one must not run.
            if !self.0.listeners.borrow().contains(id) {
                continue;
            }
            if once {
                self.remove_event_listener(id);
            }
            event.retarget(node);
            callback(event);
            if event.immediate_propagation_stopped() {
                break;
            }
        }
    }

    fn finish(&self, event: &Event) -> bool {
        event.set_phase(event::EventPhase::None);
        !event.default_prevented()
    }

    // ========================================================================
    // Extensions
    // ========================================================================

    /// Per-document value of type `T`, created with `T::default()` on first use.
    pub fn extension<T: Default + 'static>(&self) -> Rc<T> {
        self.0.extensions.borrow_mut().get_or_default::<T>()
    }

    /// Per-document value of type `T` if it was created.
    pub fn existing_extension<T: 'static>(&self) -> Option<Rc<T>> {
        self.0.extensions.borrow().get::<T>()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.0.id)
            .field("nodes", &self.node_count())
            .finish()
    }
}
