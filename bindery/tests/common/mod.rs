#![allow(dead_code)]

use bindery::{
    BoundReference, Callback, Config, Document, NodeId, Processor, Registry, Window, bind,
    to_attributes,
};
use std::sync::Arc;

// ============================================================================
// Fixtures
// ============================================================================

/// A registry of its own, a processor over it and a fresh window.
pub struct Fixture {
    pub registry: Arc<Registry>,
    pub processor: Processor,
    pub window: Window,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_window(Window::new())
    }

    pub fn with_window(window: Window) -> Self {
        let registry = Arc::new(Registry::new());
        let processor = Processor::with_registry(registry.clone()).with_config(Config::default());
        Self {
            registry,
            processor,
            window,
        }
    }

    pub fn doc(&self) -> &Document {
        self.window.document()
    }

    pub fn register(&self, callbacks: &[&Callback]) {
        for callback in callbacks {
            assert!(self.registry.register((*callback).clone()));
        }
    }

    /// Sweep the whole document.
    pub fn sweep(&self) -> bindery::ProcessReport {
        self.processor.process_root(self.doc(), NodeId::DOCUMENT)
    }

    /// Append `<tag>` carrying `bindings` to `parent`.
    pub fn element_in(&self, parent: NodeId, tag: &str, bindings: &[BoundReference]) -> NodeId {
        let doc = self.doc();
        let node = doc.create_element(tag);
        to_attributes(bindings).spread_onto(doc, node);
        doc.append_child(parent, node).unwrap();
        node
    }

    /// Append `<tag>` carrying `bindings` to the body.
    pub fn element(&self, tag: &str, bindings: &[BoundReference]) -> NodeId {
        let body = self.doc().body().unwrap();
        self.element_in(body, tag, bindings)
    }
}

/// Bind with no arguments.
pub fn bare(callback: &Callback) -> BoundReference {
    bind(callback, Vec::<String>::new()).unwrap()
}

/// Bind with string arguments.
pub fn with_args(callback: &Callback, args: &[&str]) -> BoundReference {
    bind(callback, args.iter().copied()).unwrap()
}
