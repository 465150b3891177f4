//! Root processor - one sweep over a subtree.
//!
//! [`Processor::process_root`] walks a subtree in document order, decodes
//! each element's `data-cb-*` attributes and wires every slot it has not
//! wired before:
//!
//! | Slot | Wiring |
//! |------|--------|
//! | common events | one listener on the document per event type |
//! | other events | one listener on the element |
//! | `mount` | handlers run immediately, async ones are spawned |
//! | `afterhide`, `visibility` | one attribute observer per element per slot |
//! | `validate` | element joins the document's validation index |
//!
//! Wiring marks live in memory on the document and are set before any handler
//! runs, so a handler that triggers another sweep cannot wire the same slot
//! twice. Handler failures and panics are logged and contained; one broken
//! binding never stops the rest of the sweep.

use crate::{
    codec::{self, BoundReference},
    config::{self, Config},
    registry::Registry,
};
use bindery_core::{
    BoxError, Callback, CallbackHandler, CallbackKind, Document, Element, Event, HandlerError,
    ListenerOptions, MountOutcome, NodeId, error::panic_message,
};
use futures::FutureExt;
use std::{
    any::Any,
    cell::{Cell, RefCell},
    collections::{BTreeSet, HashMap, HashSet},
    panic::{AssertUnwindSafe, catch_unwind},
    rc::Rc,
    sync::Arc,
};

/// Event types handled by a single document-level listener.
pub const DELEGATED_EVENTS: [&str; 12] = [
    "click",
    "dblclick",
    "change",
    "input",
    "keydown",
    "keyup",
    "submit",
    "pointerdown",
    "pointerup",
    "mousedown",
    "mouseup",
    "contextmenu",
];

/// Events that trigger validation of their target.
pub const VALIDATION_EVENTS: [&str; 2] = ["change", "input"];

/// Attribute holding the first validation error of a field.
pub const ERROR_ATTRIBUTE: &str = "data-bindery-error";

/// Whether `event_type` is delegated to the document.
pub fn is_delegated(event_type: &str) -> bool {
    DELEGATED_EVENTS.contains(&event_type)
}

/// Whether an element counts as hidden: it has the `hidden` attribute or
/// carries `hidden_class`.
pub fn is_hidden(document: &Document, node: NodeId, hidden_class: &str) -> bool {
    document.has_attribute(node, "hidden") || document.has_class(node, hidden_class)
}

/// Counters describing one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessReport {
    /// Elements looked at.
    pub visited: usize,
    /// Element slots wired for the first time.
    pub wired: usize,
    /// Mount handlers started.
    pub mounted: usize,
    /// Bindings skipped because their id was unknown or bound in the wrong slot.
    pub skipped: usize,
    /// Mount handlers that failed or panicked synchronously.
    pub failed: usize,
}

/// A validation failure reported by [`Processor::validate_scope`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// The invalid field.
    pub node: NodeId,
    /// Validator that rejected it.
    pub callback: String,
    /// User-facing message.
    pub message: String,
}

// ============================================================================
// Per-document state
// ============================================================================

#[derive(Default)]
struct WiringState {
    wired: RefCell<HashMap<NodeId, HashSet<CallbackKind>>>,
    bindings: RefCell<HashMap<(NodeId, CallbackKind), Rc<[BoundReference]>>>,
    delegated: RefCell<HashSet<String>>,
    validating: Cell<bool>,
    validators: RefCell<BTreeSet<NodeId>>,
    mounted: RefCell<HashMap<NodeId, HashSet<String>>>,
}

impl WiringState {
    fn is_wired(&self, node: NodeId, kind: &CallbackKind) -> bool {
        self.wired
            .borrow()
            .get(&node)
            .is_some_and(|kinds| kinds.contains(kind))
    }

    fn mark(&self, node: NodeId, kind: CallbackKind) -> bool {
        self.wired.borrow_mut().entry(node).or_default().insert(kind)
    }

    fn store(&self, node: NodeId, kind: CallbackKind, refs: Rc<[BoundReference]>) {
        self.bindings.borrow_mut().insert((node, kind), refs);
    }

    fn bindings_for(&self, node: NodeId, kind: &CallbackKind) -> Option<Rc<[BoundReference]>> {
        self.bindings.borrow().get(&(node, kind.clone())).cloned()
    }

    fn has_mounted(&self, node: NodeId) -> bool {
        self.mounted.borrow().contains_key(&node)
    }

    fn is_mounted(&self, node: NodeId, id: &str) -> bool {
        self.mounted
            .borrow()
            .get(&node)
            .is_some_and(|ids| ids.contains(id))
    }

    fn mark_mounted(&self, node: NodeId, id: &str) {
        self.mounted
            .borrow_mut()
            .entry(node)
            .or_default()
            .insert(id.to_string());
    }
}

/// Whether `kind` has been wired on `node`.
pub fn is_wired(document: &Document, node: NodeId, kind: &CallbackKind) -> bool {
    document
        .existing_extension::<WiringState>()
        .is_some_and(|state| state.is_wired(node, kind))
}

// ============================================================================
// Processor
// ============================================================================

/// Wires bindings against a registry.
///
/// Cheap to clone; listeners installed by a sweep keep a clone so that they
/// resolve against the same registry when events fire.
#[derive(Clone)]
pub struct Processor {
    registry: Arc<Registry>,
    config: Arc<Config>,
}

impl Processor {
    /// A processor over the global registry and configuration.
    pub fn new() -> Self {
        Self::with_registry(Arc::clone(Registry::global()))
    }

    /// A processor over a specific registry.
    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            config: Arc::new(config::current()),
        }
    }

    /// Use `config` instead of the global configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Arc::new(config);
        self
    }

    /// The registry bindings resolve against.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Wire every unwired binding under `root`.
    ///
    /// A slot whose ids are all unknown is left unwired, so a later sweep can
    /// pick it up once the callbacks are registered. Mount bindings are
    /// tracked per id: registered ones run, the rest wait for a later sweep.
    pub fn process_root(&self, document: &Document, root: NodeId) -> ProcessReport {
        let span = tracing::debug_span!("process_root", document = ?document.id(), %root);
        let _enter = span.enter();

        let state = document.extension::<WiringState>();
        let mut report = ProcessReport::default();

        for node in document.elements(root) {
            // An earlier handler may have detached it.
            if !document.contains(root, node) {
                continue;
            }
            report.visited += 1;
            let bindings = codec::from_attributes(document, node);
            if bindings.is_empty() {
                continue;
            }
            for (kind, refs) in group_by_kind(bindings) {
                if !state.is_wired(node, &kind) {
                    self.wire(document, &state, node, kind, refs, &mut report);
                }
            }
        }

        if self.config.debug {
            tracing::info!(?report, "sweep finished");
        } else {
            tracing::debug!(?report, "sweep finished");
        }
        report
    }

    fn wire(
        &self,
        document: &Document,
        state: &WiringState,
        node: NodeId,
        kind: CallbackKind,
        refs: Vec<BoundReference>,
        report: &mut ProcessReport,
    ) {
        if kind == CallbackKind::Mount {
            self.start_mounts(document, state, node, refs, report);
            return;
        }
        let resolved = refs.iter().filter(|r| self.lookup(r).is_some()).count();
        report.skipped += refs.len() - resolved;
        if resolved == 0 {
            return;
        }
        state.mark(node, kind.clone());
        report.wired += 1;

        let refs: Rc<[BoundReference]> = refs.into();
        match kind.clone() {
            CallbackKind::Event(event_type) if is_delegated(&event_type) => {
                self.ensure_delegated(document, state, &event_type);
                state.store(node, kind, refs);
            }
            CallbackKind::Event(event_type) => {
                let processor = self.clone();
                document.add_event_listener(
                    node,
                    &event_type,
                    ListenerOptions::default(),
                    move |event| processor.run_event_bindings(event, &refs),
                );
            }
            CallbackKind::Validator => {
                state.store(node, kind, refs);
                state.validators.borrow_mut().insert(node);
                self.ensure_validation(document, state);
            }
            // After-hide and visibility.
            _ => self.observe_visibility(document, node, refs),
        }
    }

    /// Resolve a binding, warning when it cannot be used.
    fn lookup(&self, r: &BoundReference) -> Option<Callback> {
        let Some(callback) = self.registry.resolve(r.id()) else {
            tracing::warn!(
                id = r.id(),
                slot = r.kind().slot(),
                "unknown callback, binding skipped"
            );
            return None;
        };
        if callback.kind() != r.kind() {
            let err = HandlerError::KindMismatch {
                id: r.id().to_string(),
                expected: r.kind().to_string(),
                found: callback.kind().to_string(),
            };
            tracing::warn!(error = %err, "binding skipped");
            return None;
        }
        Some(callback)
    }

    // ========================================================================
    // Events
    // ========================================================================

    fn ensure_delegated(&self, document: &Document, state: &WiringState, event_type: &str) {
        if !state.delegated.borrow_mut().insert(event_type.to_string()) {
            return;
        }
        let processor = self.clone();
        let kind = CallbackKind::Event(event_type.to_string());
        document.add_event_listener(
            NodeId::DOCUMENT,
            event_type,
            ListenerOptions::default(),
            move |event| processor.delegate(event, &kind),
        );
        tracing::debug!(event_type, "installed delegated listener");
    }

    /// Walk from the target up to the document, running the bindings of each
    /// wired element as if its own listener fired.
    fn delegate(&self, event: &Event, kind: &CallbackKind) {
        let document = event.document().clone();
        let Some(state) = document.existing_extension::<WiringState>() else {
            return;
        };
        let target = event.target();
        let path = std::iter::once(target).chain(document.ancestors(target));
        for node in path {
            if node == NodeId::DOCUMENT {
                break;
            }
            let Some(refs) = state.bindings_for(node, kind) else {
                continue;
            };
            event.retarget(node);
            self.run_event_bindings(event, &refs);
            if event.propagation_stopped() {
                break;
            }
        }
        event.retarget(NodeId::DOCUMENT);
    }

    fn run_event_bindings(&self, event: &Event, refs: &[BoundReference]) {
        for r in refs {
            let Some(callback) = self.lookup(r) else {
                continue;
            };
            if let CallbackHandler::Event(handler) = callback.handler() {
                contain(r.id(), || handler(event, r.args()));
            }
            if event.immediate_propagation_stopped() {
                break;
            }
        }
    }

    // ========================================================================
    // Mount
    // ========================================================================

    /// Start the mount bindings of `node` that have not run yet.
    ///
    /// Every runnable id is marked before the first handler runs. The slot
    /// counts as wired once no id is left waiting for registration.
    fn start_mounts(
        &self,
        document: &Document,
        state: &WiringState,
        node: NodeId,
        refs: Vec<BoundReference>,
        report: &mut ProcessReport,
    ) {
        let first = !state.has_mounted(node);
        let mut waiting = 0;
        let mut ready = Vec::new();
        for r in refs {
            if state.is_mounted(node, r.id()) {
                continue;
            }
            match self.lookup(&r) {
                Some(callback) => {
                    state.mark_mounted(node, r.id());
                    ready.push((r, callback));
                }
                None => waiting += 1,
            }
        }
        report.skipped += waiting;
        if waiting == 0 {
            state.mark(node, CallbackKind::Mount);
        }
        if ready.is_empty() {
            return;
        }
        if first {
            report.wired += 1;
        }
        for (r, callback) in ready {
            self.run_mount(document, node, &r, &callback, report);
        }
    }

    fn run_mount(
        &self,
        document: &Document,
        node: NodeId,
        r: &BoundReference,
        callback: &Callback,
        report: &mut ProcessReport,
    ) {
        let CallbackHandler::Mount(handler) = callback.handler() else {
            return;
        };
        report.mounted += 1;
        let element = Element::new(document.clone(), node);
        let window = element.window();
        let outcome = catch_unwind(AssertUnwindSafe(|| handler(element, r.args().to_vec())));
        let ok = match outcome {
            Ok(MountOutcome::Done(result)) => log_outcome(r.id(), Ok(result)),
            Ok(MountOutcome::Pending(task)) => match window {
                Some(window) => {
                    let id = r.id().to_string();
                    window.spawn_local(async move {
                        let result = AssertUnwindSafe(task).catch_unwind().await;
                        log_outcome(&id, result);
                    });
                    true
                }
                None => {
                    tracing::warn!(
                        id = r.id(),
                        "document has no window, async mount handler dropped"
                    );
                    false
                }
            },
            Err(payload) => log_outcome(r.id(), Err(payload)),
        };
        if !ok {
            report.failed += 1;
        }
    }

    // ========================================================================
    // Visibility
    // ========================================================================

    fn observe_visibility(&self, document: &Document, node: NodeId, refs: Rc<[BoundReference]>) {
        let processor = self.clone();
        let was_visible = Cell::new(!is_hidden(document, node, &self.config.hidden_class));
        document.observe_attributes(node, move |document, mutation| {
            if mutation.name != "hidden" && mutation.name != "class" {
                return;
            }
            let visible = !is_hidden(document, mutation.target, &processor.config.hidden_class);
            if was_visible.replace(visible) == visible {
                return;
            }
            let element = Element::new(document.clone(), mutation.target);
            processor.run_visibility_bindings(&element, visible, &refs);
        });
    }

    fn run_visibility_bindings(&self, element: &Element, visible: bool, refs: &[BoundReference]) {
        for r in refs {
            let Some(callback) = self.lookup(r) else {
                continue;
            };
            match callback.handler() {
                CallbackHandler::AfterHide(handler) if !visible => {
                    contain(r.id(), || handler(element.clone(), r.args()));
                }
                CallbackHandler::Visibility(handler) => {
                    contain(r.id(), || handler(element.clone(), visible, r.args()));
                }
                _ => {}
            }
        }
    }

    // ========================================================================
    // Validation
    // ========================================================================

    fn ensure_validation(&self, document: &Document, state: &WiringState) {
        if state.validating.replace(true) {
            return;
        }
        for event_type in VALIDATION_EVENTS {
            let processor = self.clone();
            document.add_event_listener(
                NodeId::DOCUMENT,
                event_type,
                ListenerOptions::default(),
                move |event| {
                    let document = event.document();
                    let target = event.target();
                    let Some(state) = document.existing_extension::<WiringState>() else {
                        return;
                    };
                    if state.validators.borrow().contains(&target) {
                        processor.validate_node(document, &state, target);
                    }
                },
            );
        }
    }

    fn validate_node(
        &self,
        document: &Document,
        state: &WiringState,
        node: NodeId,
    ) -> Option<FieldError> {
        let refs = state.bindings_for(node, &CallbackKind::Validator)?;
        let element = Element::new(document.clone(), node);
        let mut failure = None;
        for r in refs.iter() {
            let Some(callback) = self.lookup(r) else {
                continue;
            };
            let CallbackHandler::Validator(validator) = callback.handler() else {
                continue;
            };
            match catch_unwind(AssertUnwindSafe(|| validator(&element, r.args()))) {
                Ok(Some(message)) => {
                    failure = Some(FieldError {
                        node,
                        callback: r.id().to_string(),
                        message,
                    });
                    break;
                }
                Ok(None) => {}
                Err(payload) => {
                    log_outcome(r.id(), Err(payload));
                }
            }
        }
        match &failure {
            Some(err) => {
                document.set_attribute(node, "aria-invalid", "true");
                document.set_attribute(node, ERROR_ATTRIBUTE, &err.message);
            }
            None => {
                document.remove_attribute(node, "aria-invalid");
                document.remove_attribute(node, ERROR_ATTRIBUTE);
            }
        }
        failure
    }

    /// Run the validators of every wired field under `scope`, in document
    /// order, reflecting each result on its field.
    pub fn validate_scope(&self, document: &Document, scope: NodeId) -> Vec<FieldError> {
        let Some(state) = document.existing_extension::<WiringState>() else {
            return Vec::new();
        };
        let fields: Vec<NodeId> = {
            let validators = state.validators.borrow();
            document
                .elements(scope)
                .into_iter()
                .filter(|node| validators.contains(node))
                .collect()
        };
        fields
            .into_iter()
            .filter_map(|node| self.validate_node(document, &state, node))
            .collect()
    }
}

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Processor")
            .field("callbacks", &self.registry.len())
            .field("config", &self.config)
            .finish()
    }
}

fn group_by_kind(bindings: Vec<BoundReference>) -> Vec<(CallbackKind, Vec<BoundReference>)> {
    let mut groups: Vec<(CallbackKind, Vec<BoundReference>)> = Vec::new();
    for binding in bindings {
        match groups.iter_mut().find(|(kind, _)| kind == binding.kind()) {
            Some((_, group)) => group.push(binding),
            None => groups.push((binding.kind().clone(), vec![binding])),
        }
    }
    groups
}

type Outcome = Result<Result<(), BoxError>, Box<dyn Any + Send>>;

/// Log a handler failure. Returns whether the handler succeeded.
fn log_outcome(id: &str, outcome: Outcome) -> bool {
    let err = match outcome {
        Ok(Ok(())) => return true,
        Ok(Err(source)) => HandlerError::Failed {
            id: id.to_string(),
            source,
        },
        Err(payload) => HandlerError::Panicked {
            id: id.to_string(),
            message: panic_message(payload.as_ref()),
        },
    };
    tracing::error!(error = %err, "callback failed");
    false
}

fn contain(id: &str, f: impl FnOnce() -> Result<(), BoxError>) -> bool {
    log_outcome(id, catch_unwind(AssertUnwindSafe(f)))
}

// ============================================================================
// Global shorthands
// ============================================================================

/// [`Processor::process_root`] with the global registry.
pub fn process_root(document: &Document, root: NodeId) -> ProcessReport {
    Processor::new().process_root(document, root)
}

/// [`Processor::validate_scope`] with the global registry.
pub fn validate_scope(document: &Document, scope: NodeId) -> Vec<FieldError> {
    Processor::new().validate_scope(document, scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{bind, to_attributes};
    use bindery_core::{EventInit, Window};
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    fn setup() -> (Arc<Registry>, Processor, Window) {
        let registry = Arc::new(Registry::new());
        let processor = Processor::with_registry(registry.clone()).with_config(Config::default());
        (registry, processor, Window::new())
    }

    fn element_with(doc: &Document, tag: &str, bindings: &[BoundReference]) -> NodeId {
        let node = doc.create_element(tag);
        to_attributes(bindings).spread_onto(doc, node);
        let body = doc.body().unwrap();
        doc.append_child(body, node).unwrap();
        node
    }

    fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let c = Arc::new(AtomicUsize::new(0));
        (c.clone(), c)
    }

    #[test]
    fn test_mount_runs_once_across_sweeps() {
        let (registry, processor, window) = setup();
        let (hits, h) = counter();
        let mount = Callback::mount("t:mount", move |_, _| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        registry.register(mount.clone());
        let doc = window.document();
        element_with(doc, "div", &[bind(&mount, Vec::<String>::new()).unwrap()]);

        let first = processor.process_root(doc, NodeId::DOCUMENT);
        assert_eq!(first.mounted, 1);
        assert_eq!(first.wired, 1);
        for _ in 0..3 {
            let again = processor.process_root(doc, NodeId::DOCUMENT);
            assert_eq!(again.wired, 0);
            assert_eq!(again.mounted, 0);
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_resweep_adds_no_listeners() {
        let (registry, processor, window) = setup();
        let click = Callback::event("click", "t:click", |_, _| ());
        let focus = Callback::event("focusout", "t:focus", |_, _| ());
        registry.register(click.clone());
        registry.register(focus.clone());
        let doc = window.document();
        for _ in 0..3 {
            element_with(
                doc,
                "input",
                &[
                    bind(&click, ["a"]).unwrap(),
                    bind(&focus, Vec::<String>::new()).unwrap(),
                ],
            );
        }

        processor.process_root(doc, NodeId::DOCUMENT);
        // One delegated click listener plus one focusout listener per input.
        assert_eq!(doc.listener_additions(), 4);
        processor.process_root(doc, NodeId::DOCUMENT);
        assert_eq!(doc.listener_additions(), 4);
    }

    #[test]
    fn test_delegated_click_sees_element_and_args() {
        let (registry, processor, window) = setup();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let click = Callback::event("click", "t:open", move |event: &Event, args: &[String]| {
            s.lock().unwrap().push((event.current_target(), args.to_vec()));
        });
        registry.register(click.clone());
        let doc = window.document();
        let button = element_with(doc, "button", &[bind(&click, ["target-id"]).unwrap()]);
        let label = doc.create_element("span");
        doc.append_child(button, label).unwrap();

        processor.process_root(doc, NodeId::DOCUMENT);
        doc.dispatch_event(label, EventInit::bubbling("click"));

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![(button, vec!["target-id".to_string()])]);
    }

    #[test]
    fn test_stop_propagation_and_stop_immediate() {
        let (registry, processor, window) = setup();
        let log = Arc::new(Mutex::new(Vec::new()));
        let make = |id: &'static str, stop: Option<bool>| {
            let log = log.clone();
            Callback::event("click", id, move |event: &Event, _: &[String]| {
                log.lock().unwrap().push(id);
                match stop {
                    Some(true) => event.stop_immediate_propagation(),
                    Some(false) => event.stop_propagation(),
                    None => {}
                }
            })
        };
        let outer = make("t:outer", None);
        let stopper = make("t:stop", Some(false));
        let sibling = make("t:sibling", None);
        let immediate = make("t:immediate", Some(true));
        let never = make("t:never", None);
        for cb in [&outer, &stopper, &sibling, &immediate, &never] {
            registry.register(cb.clone());
        }

        let doc = window.document();
        let parent = element_with(doc, "div", &[bind(&outer, Vec::<String>::new()).unwrap()]);
        let child = doc.create_element("button");
        to_attributes(&[
            bind(&stopper, Vec::<String>::new()).unwrap(),
            bind(&sibling, Vec::<String>::new()).unwrap(),
        ])
        .spread_onto(doc, child);
        doc.append_child(parent, child).unwrap();
        let other = doc.create_element("button");
        to_attributes(&[
            bind(&immediate, Vec::<String>::new()).unwrap(),
            bind(&never, Vec::<String>::new()).unwrap(),
        ])
        .spread_onto(doc, other);
        doc.append_child(parent, other).unwrap();
        processor.process_root(doc, NodeId::DOCUMENT);

        doc.dispatch_event(child, EventInit::bubbling("click"));
        assert_eq!(*log.lock().unwrap(), vec!["t:stop", "t:sibling"]);
        log.lock().unwrap().clear();
        doc.dispatch_event(other, EventInit::bubbling("click"));
        assert_eq!(*log.lock().unwrap(), vec!["t:immediate"]);
    }

    #[test]
    fn test_prevent_default_reaches_dispatcher() {
        let (registry, processor, window) = setup();
        let submit = Callback::event("submit", "t:submit", |event: &Event, _: &[String]| {
            event.prevent_default();
        });
        registry.register(submit.clone());
        let doc = window.document();
        let form = element_with(doc, "form", &[bind(&submit, Vec::<String>::new()).unwrap()]);
        processor.process_root(doc, NodeId::DOCUMENT);
        assert!(!doc.dispatch_event(form, EventInit::bubbling("submit")));
    }

    #[test]
    fn test_direct_listener_for_non_delegated_event() {
        let (registry, processor, window) = setup();
        let (hits, h) = counter();
        let blur = Callback::event("focusout", "t:blur", move |_: &Event, _: &[String]| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        registry.register(blur.clone());
        let doc = window.document();
        let input = element_with(doc, "input", &[bind(&blur, Vec::<String>::new()).unwrap()]);
        processor.process_root(doc, NodeId::DOCUMENT);
        assert_eq!(doc.listener_count(input, "focusout"), 1);
        assert_eq!(doc.listener_count(NodeId::DOCUMENT, "focusout"), 0);
        doc.dispatch_event(input, EventInit::new("focusout"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unknown_ids_are_skipped_and_retried() {
        let (registry, processor, window) = setup();
        let (hits, h) = counter();
        let late = Callback::mount("t:late", move |_, _| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        let doc = window.document();
        let node = element_with(doc, "div", &[bind(&late, Vec::<String>::new()).unwrap()]);

        let report = processor.process_root(doc, NodeId::DOCUMENT);
        assert_eq!(report.skipped, 1);
        assert!(!is_wired(doc, node, &CallbackKind::Mount));

        registry.register(late);
        processor.process_root(doc, NodeId::DOCUMENT);
        assert!(is_wired(doc, node, &CallbackKind::Mount));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_late_id_in_mount_list_still_runs() {
        let (registry, processor, window) = setup();
        let (early_hits, e) = counter();
        let (late_hits, l) = counter();
        let early = Callback::mount("t:early", move |_, _| {
            e.fetch_add(1, Ordering::SeqCst);
        });
        let late = Callback::mount("t:late-mount", move |_, _| {
            l.fetch_add(1, Ordering::SeqCst);
        });
        let doc = window.document();
        let node = element_with(
            doc,
            "div",
            &[
                bind(&early, Vec::<String>::new()).unwrap(),
                bind(&late, Vec::<String>::new()).unwrap(),
            ],
        );
        registry.register(early);

        let report = processor.process_root(doc, NodeId::DOCUMENT);
        assert_eq!((report.mounted, report.skipped, report.wired), (1, 1, 1));
        assert!(!is_wired(doc, node, &CallbackKind::Mount));

        registry.register(late);
        let report = processor.process_root(doc, NodeId::DOCUMENT);
        assert_eq!((report.mounted, report.skipped, report.wired), (1, 0, 0));
        assert!(is_wired(doc, node, &CallbackKind::Mount));

        let report = processor.process_root(doc, NodeId::DOCUMENT);
        assert_eq!(report.mounted, 0);
        assert_eq!(early_hits.load(Ordering::SeqCst), 1);
        assert_eq!(late_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_kind_mismatch_is_skipped() {
        let (registry, processor, window) = setup();
        registry.register(Callback::validator("t:same-id", |_, _| None));
        let imposter = Callback::mount("t:same-id", |_, _| -> () { panic!("must not run") });
        let doc = window.document();
        element_with(doc, "div", &[bind(&imposter, Vec::<String>::new()).unwrap()]);
        let report = processor.process_root(doc, NodeId::DOCUMENT);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.mounted, 0);
    }

    #[test]
    fn test_failures_are_contained() {
        let (registry, processor, window) = setup();
        let (hits, h) = counter();
        let panics = Callback::mount("t:panics", |_, _| -> () { panic!("boom") });
        let errors = Callback::mount("t:errors", |_, _| Err::<(), _>("nope"));
        let fine = Callback::mount("t:fine", move |_, _| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        for cb in [&panics, &errors, &fine] {
            registry.register(cb.clone());
        }
        let doc = window.document();
        element_with(doc, "div", &[bind(&panics, Vec::<String>::new()).unwrap()]);
        element_with(doc, "div", &[bind(&errors, Vec::<String>::new()).unwrap()]);
        element_with(doc, "div", &[bind(&fine, Vec::<String>::new()).unwrap()]);

        let report = processor.process_root(doc, NodeId::DOCUMENT);
        assert_eq!(report.mounted, 3);
        assert_eq!(report.failed, 2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_async_mount_runs_on_window() {
        let (registry, processor, window) = setup();
        let (hits, h) = counter();
        let mount = Callback::mount_async("t:async", move |element: Element, _| {
            let h = h.clone();
            async move {
                element.add_class("ready");
                h.fetch_add(1, Ordering::SeqCst);
            }
        });
        registry.register(mount.clone());
        let doc = window.document();
        let node = element_with(doc, "div", &[bind(&mount, Vec::<String>::new()).unwrap()]);
        processor.process_root(doc, NodeId::DOCUMENT);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        window.run_until_stalled();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(doc.has_class(node, "ready"));
    }

    #[test]
    fn test_partial_tree_only_scans_subtree() {
        let (registry, processor, window) = setup();
        let (hits, h) = counter();
        let mount = Callback::mount("t:m", move |_, _| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        registry.register(mount.clone());
        let doc = window.document();
        let binding = [bind(&mount, Vec::<String>::new()).unwrap()];
        element_with(doc, "div", &binding);
        let fresh = element_with(doc, "div", &binding);

        let report = processor.process_root(doc, fresh);
        assert_eq!(report.visited, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_after_hide_fires_on_each_hide() {
        let (registry, processor, window) = setup();
        let (hits, h) = counter();
        let hook = Callback::after_hide("t:hide", move |_, _| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        registry.register(hook.clone());
        let doc = window.document();
        let modal = element_with(doc, "dialog", &[bind(&hook, Vec::<String>::new()).unwrap()]);
        processor.process_root(doc, NodeId::DOCUMENT);
        processor.process_root(doc, NodeId::DOCUMENT);
        assert_eq!(doc.observer_count(modal), 1);

        doc.set_attribute(modal, "title", "ignored");
        doc.add_class(modal, "t-hidden");
        doc.set_attribute(modal, "hidden", "");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        doc.remove_class(modal, "t-hidden");
        doc.remove_attribute(modal, "hidden");
        doc.add_class(modal, "t-hidden");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_visibility_reports_each_flip() {
        let (registry, processor, window) = setup();
        let flips = Arc::new(Mutex::new(Vec::new()));
        let f = flips.clone();
        let hook = Callback::visibility("t:vis", move |_, visible, _| {
            f.lock().unwrap().push(visible);
        });
        registry.register(hook.clone());
        let doc = window.document();
        let panel = element_with(doc, "div", &[bind(&hook, Vec::<String>::new()).unwrap()]);
        doc.add_class(panel, "t-hidden");
        processor.process_root(doc, NodeId::DOCUMENT);

        doc.remove_class(panel, "t-hidden");
        doc.set_attribute(panel, "hidden", "");
        assert_eq!(*flips.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn test_validators_reflect_first_error() {
        let (registry, processor, window) = setup();
        let required = Callback::validator("t:required", |element: &Element, _: &[String]| {
            element
                .attribute("value")
                .is_none_or(|v| v.is_empty())
                .then(|| "required".to_string())
        });
        let never = Callback::validator("t:never", |_: &Element, _: &[String]| {
            Some("second".to_string())
        });
        registry.register(required.clone());
        registry.register(never.clone());
        let doc = window.document();
        let input = element_with(
            doc,
            "input",
            &[bind(&required, Vec::<String>::new()).unwrap()],
        );
        let other = element_with(doc, "input", &[bind(&never, Vec::<String>::new()).unwrap()]);
        processor.process_root(doc, NodeId::DOCUMENT);

        doc.dispatch_event(input, EventInit::bubbling("input"));
        assert_eq!(doc.get_attribute(input, "aria-invalid").as_deref(), Some("true"));
        assert_eq!(doc.get_attribute(input, ERROR_ATTRIBUTE).as_deref(), Some("required"));

        doc.set_attribute(input, "value", "hello");
        doc.dispatch_event(input, EventInit::bubbling("change"));
        assert!(!doc.has_attribute(input, "aria-invalid"));
        assert!(!doc.has_attribute(input, ERROR_ATTRIBUTE));

        let errors = processor.validate_scope(doc, NodeId::DOCUMENT);
        assert_eq!(
            errors,
            vec![FieldError {
                node: other,
                callback: "t:never".into(),
                message: "second".into(),
            }]
        );
    }
}
