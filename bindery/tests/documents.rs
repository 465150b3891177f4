//! Popup windows, unload and the render-root hook.

mod common;

use bindery::{
    BinderyError, EventInit, SchedulerState, Window, active_documents, create_handler,
    create_mounter, event_window, mount_root, on_document_registered, owner_window,
    register_document, schedule_process_root_with,
};
use bindery_std::{
    documents::is_registered,
    scheduler::{scheduler_state, sweep_count},
    testing::{CallCounter, Recorder},
};
use common::{Fixture, bare};
use std::{cell::Cell, rc::Rc};

#[test]
fn test_popup_is_scheduled_independently() {
    let main = Fixture::new();
    let popup = Fixture::with_window(main.window.open("about:popup"));
    let calls = CallCounter::new();
    let c = calls.clone();
    let mount = create_mounter("doc:mount", move |_, _| c.hit());
    main.register(&[&mount]);
    popup.register(&[&mount]);
    main.element("div", &[bare(&mount)]);
    popup.element("div", &[bare(&mount)]);

    schedule_process_root_with(&main.window, main.processor.clone());
    schedule_process_root_with(&popup.window, popup.processor.clone());
    assert_eq!(main.window.pending_frames(), 1);
    assert_eq!(popup.window.pending_frames(), 1);

    popup.window.run_animation_frame();
    assert_eq!(calls.get(), 1);
    assert_eq!(scheduler_state(&main.window), SchedulerState::Scheduled);
    main.window.run_animation_frame();
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_unload_cancels_pending_sweep() {
    let fx = Fixture::with_window(Window::new().open("about:popup"));
    let calls = CallCounter::new();
    let c = calls.clone();
    let mount = create_mounter("doc:never", move |_, _| c.hit());
    fx.register(&[&mount]);
    fx.element("div", &[bare(&mount)]);

    schedule_process_root_with(&fx.window, fx.processor.clone());
    assert!(is_registered(&fx.window));
    fx.window.close();
    assert!(!is_registered(&fx.window));
    assert_eq!(fx.window.run_animation_frame(), 0);
    assert_eq!(sweep_count(&fx.window), 0);
    assert_eq!(calls.get(), 0);
}

#[test]
fn test_handlers_see_their_own_window() {
    let main = Window::new();
    let popup = Fixture::with_window(main.open("about:popup"));
    let hits = Recorder::new();
    let h = hits.clone();
    let which = create_handler("click", "doc:which", move |event, _| {
        let url = event_window(event).map(|w| w.url().to_string());
        h.push(url.unwrap_or_default());
    });
    popup.register(&[&which]);
    let button = popup.element("button", &[bare(&which)]);
    popup.sweep();

    popup.doc().dispatch_event(button, EventInit::bubbling("click"));
    assert_eq!(hits.values(), vec!["about:popup".to_string()]);

    let element = bindery::Element::new(popup.doc().clone(), button);
    assert!(owner_window(&element).unwrap().ptr_eq(&popup.window));
    assert!(popup.window.opener().unwrap().ptr_eq(&main));
}

#[test]
fn test_register_document_runs_setup_hooks_once() {
    let seen = Rc::new(Cell::new(0));
    let s = seen.clone();
    let window = Window::new().open("about:hooked");
    let target = window.clone();
    on_document_registered(move |w| {
        if w.ptr_eq(&target) {
            s.set(s.get() + 1);
        }
    });

    register_document(&window);
    register_document(&window);
    assert_eq!(seen.get(), 1);
    assert!(active_documents().iter().any(|w| w.ptr_eq(&window)));
    assert_eq!(scheduler_state(&window), SchedulerState::Scheduled);
    window.close();
    assert!(!active_documents().iter().any(|w| w.ptr_eq(&window)));
}

#[test]
fn test_mount_root_with_global_registry() {
    let window = Window::new();
    let doc = window.document();
    assert!(matches!(
        mount_root(&window, "app"),
        Err(BinderyError::MissingRoot(_))
    ));

    let calls = CallCounter::new();
    let c = calls.clone();
    let mount = create_mounter("doc:global-mount", move |_, _| c.hit());
    bindery::load_callbacks(&[&mount]);

    let root = doc.create_element("main");
    doc.set_attribute(root, "id", "app");
    doc.append_child(doc.body().unwrap(), root).unwrap();
    let child = doc.create_element("div");
    bindery::to_attributes(&[bare(&mount)]).spread_onto(doc, child);
    doc.append_child(root, child).unwrap();

    mount_root(&window, "app").unwrap();
    mount_root(&window, "app").unwrap();
    window.run_animation_frame();
    assert_eq!(calls.get(), 1);
    assert!(bindery::unregister("doc:global-mount"));
}
