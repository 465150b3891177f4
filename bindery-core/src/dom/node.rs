//! DOM nodes - arena storage.
//!
//! Nodes live in a flat `Vec` and refer to each other by [`NodeId`]. Removed
//! nodes stay in the arena (detached), so an id is never reused while its
//! document is alive.

use crate::error::DomError;

/// Node identifier (index into the document arena).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// The document node itself.
    pub const DOCUMENT: NodeId = NodeId(0);

    /// Raw arena index.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Node-specific data.
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Document root
    Document,
    /// Element
    Element(ElementData),
    /// Text content
    Text(String),
    /// Comment
    Comment(String),
}

/// Element-specific data.
#[derive(Debug, Clone)]
pub struct ElementData {
    /// Lowercase tag name.
    pub tag: String,
    /// Attributes in insertion order.
    pub attrs: Vec<Attribute>,
}

impl ElementData {
    pub(crate) fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    /// Get an attribute value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, returning the previous value.
    pub(crate) fn set(&mut self, name: &str, value: String) -> Option<String> {
        for attr in self.attrs.iter_mut() {
            if attr.name == name {
                return Some(std::mem::replace(&mut attr.value, value));
            }
        }
        self.attrs.push(Attribute {
            name: name.to_string(),
            value,
        });
        None
    }

    /// Remove an attribute, returning its value.
    pub(crate) fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self.attrs.iter().position(|a| a.name == name)?;
        Some(self.attrs.remove(pos).value)
    }
}

/// Attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Lowercase attribute name.
    pub name: String,
    /// Raw (unescaped) value.
    pub value: String,
}

#[derive(Debug)]
pub(crate) struct Node {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub data: NodeData,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            data,
        }
    }
}

/// Arena-based node storage.
#[derive(Debug)]
pub(crate) struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Document)],
        }
    }

    pub fn get(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(id.index()).ok_or(DomError::NoSuchNode(id.0))
    }

    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes
            .get_mut(id.index())
            .ok_or(DomError::NoSuchNode(id.0))
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes.get(id.index())?.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes.get_mut(id.index())?.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(data));
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.index()).and_then(|n| n.parent)
    }

    /// `true` if `ancestor` is `node` or one of its ancestors.
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = &self.get(parent).ok()?.children;
        let pos = siblings.iter().position(|c| *c == node)?;
        siblings.get(pos + 1).copied()
    }

    pub fn detach(&mut self, child: NodeId) -> Result<(), DomError> {
        if let Some(parent) = self.get(child)?.parent {
            self.get_mut(parent)?.children.retain(|c| *c != child);
            self.get_mut(child)?.parent = None;
        }
        Ok(())
    }

    pub fn insert(
        &mut self,
        parent: NodeId,
        child: NodeId,
        before: Option<NodeId>,
    ) -> Result<(), DomError> {
        if child == NodeId::DOCUMENT {
            return Err(DomError::HierarchyRequest("the document node cannot be inserted"));
        }
        match self.get(parent)?.data {
            NodeData::Document | NodeData::Element(_) => {}
            _ => return Err(DomError::HierarchyRequest("parent cannot have children")),
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest("insertion would create a cycle"));
        }
        if let Some(reference) = before
            && self.get(reference)?.parent != Some(parent)
        {
            return Err(DomError::NotFound(reference.0));
        }
        // Inserting a node before itself keeps its place.
        let before = match before {
            Some(reference) if reference == child => self.next_sibling(child),
            other => other,
        };
        self.detach(child)?;
        let children = &mut self.get_mut(parent)?.children;
        let pos = before
            .and_then(|b| children.iter().position(|c| *c == b))
            .unwrap_or(children.len());
        children.insert(pos, child);
        self.get_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Pre-order walk of `root` and its descendants.
    pub fn subtree(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id.index()) else {
                continue;
            };
            out.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }
}
