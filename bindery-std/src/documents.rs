//! Multi-document support.
//!
//! Every window that has been registered, or scheduled for a sweep, is
//! tracked as active until it unloads. Code that opens a secondary window
//! calls [`register_document`] so setup hooks and the processor see it.
//!
//! The active set is per thread, like the DOM handles it holds.

use crate::scheduler;
use bindery_core::{Element, Event, Window};
use std::{cell::RefCell, rc::Rc};

type SetupHook = Rc<dyn Fn(&Window)>;

thread_local! {
    static ACTIVE: RefCell<Vec<Window>> = const { RefCell::new(Vec::new()) };
    static SETUP_HOOKS: RefCell<Vec<SetupHook>> = const { RefCell::new(Vec::new()) };
}

/// Start tracking `window`. Returns `false` if it was already tracked or is
/// closed.
///
/// Newly tracked windows get an unload listener that removes them again,
/// then every setup hook runs for them.
pub fn track(window: &Window) -> bool {
    if window.is_closed() || is_registered(window) {
        return false;
    }
    ACTIVE.with(|active| active.borrow_mut().push(window.clone()));
    window.add_unload_listener(|window| {
        ACTIVE.with(|active| active.borrow_mut().retain(|w| !w.ptr_eq(window)));
        tracing::debug!(window = ?window.id(), "document unregistered");
    });
    tracing::debug!(window = ?window.id(), url = window.url(), "document registered");

    let hooks = SETUP_HOOKS.with(|hooks| hooks.borrow().clone());
    for hook in hooks {
        hook(window);
    }
    true
}

/// Register a window's document and schedule its first sweep.
pub fn register_document(window: &Window) {
    track(window);
    scheduler::schedule_process_root(window);
}

/// Run `hook` for every window registered from now on.
pub fn on_document_registered(hook: impl Fn(&Window) + 'static) {
    SETUP_HOOKS.with(|hooks| hooks.borrow_mut().push(Rc::new(hook)));
}

/// Whether `window` is tracked.
pub fn is_registered(window: &Window) -> bool {
    ACTIVE.with(|active| active.borrow().iter().any(|w| w.ptr_eq(window)))
}

/// Tracked windows, in registration order.
pub fn active_documents() -> Vec<Window> {
    ACTIVE.with(|active| active.borrow().clone())
}

/// The window an element is displayed in.
pub fn owner_window(element: &Element) -> Option<Window> {
    element.document().default_view()
}

/// The window an event is being dispatched in.
pub fn event_window(event: &Event) -> Option<Window> {
    event.view()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_core::{Document, EventInit, ListenerOptions, NodeId};
    use std::cell::Cell;

    #[test]
    fn test_track_and_unload() {
        let main = Window::new();
        let popup = main.open("about:popup");
        assert!(track(&main));
        assert!(!track(&main));
        assert!(track(&popup));
        assert!(is_registered(&popup));

        popup.close();
        assert!(!is_registered(&popup));
        assert!(is_registered(&main));
        assert!(!track(&popup));
        main.close();
    }

    #[test]
    fn test_setup_hooks_run_for_new_windows() {
        let seen = Rc::new(Cell::new(0));
        let s = seen.clone();
        on_document_registered(move |_| s.set(s.get() + 1));
        let window = Window::new();
        register_document(&window);
        register_document(&window);
        assert_eq!(seen.get(), 1);
        assert_eq!(window.pending_frames(), 1);
        window.close();
    }

    #[test]
    fn test_owner_lookups() {
        let popup = Window::new().open("about:popup");
        let doc = popup.document();
        let button = doc.create_element("button");
        doc.append_child(doc.body().unwrap(), button).unwrap();
        let element = Element::new(doc.clone(), button);
        assert!(owner_window(&element).unwrap().ptr_eq(&popup));
        assert!(owner_window(&Element::new(Document::new(), NodeId::DOCUMENT)).is_none());

        let hit = Rc::new(Cell::new(false));
        let (h, p) = (hit.clone(), popup.clone());
        doc.add_event_listener(button, "click", ListenerOptions::default(), move |event| {
            h.set(event_window(event).is_some_and(|w| w.ptr_eq(&p)));
        });
        doc.dispatch_event(button, EventInit::bubbling("click"));
        assert!(hit.get());
    }
}
