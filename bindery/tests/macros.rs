//! Attribute-macro declared callbacks and inventory collection.

mod common;

use bindery::{BoxError, CallbackKind, Element, Event, EventInit, bind, collected_callbacks};
use bindery_std::loader::load_callbacks_into;
use common::{Fixture, bare};
use std::sync::atomic::{AtomicUsize, Ordering};

static CLICKS: AtomicUsize = AtomicUsize::new(0);

/// Counts clicks that carry a target.
#[bindery::handler("click", id = "mac:click", arity = 1)]
fn mac_click(_event: &Event, args: &[String]) -> Result<(), BoxError> {
    if args.is_empty() {
        return Err("missing target".into());
    }
    CLICKS.fetch_add(1, Ordering::SeqCst);
    Ok(())
}

#[bindery::mounter(id = "mac:ready")]
async fn mac_ready(element: Element, args: Vec<String>) {
    element.set_attribute("data-ready", &args.join(","));
}

#[bindery::validator(id = "mac:digits")]
fn mac_digits(element: &Element, _args: &[String]) -> Option<String> {
    let value = element.attribute("value").unwrap_or_default();
    (!value.chars().all(|c| c.is_ascii_digit())).then(|| "digits only".to_string())
}

#[bindery::after_hide]
fn auto_id(element: Element, _args: &[String]) {
    element.set_attribute("data-was-hidden", "");
}

#[bindery::visibility(id = "mac:seen")]
fn mac_seen(element: Element, visible: bool, _args: &[String]) {
    element.set_attribute("data-visible", if visible { "yes" } else { "no" });
}

#[test]
fn test_macro_callbacks_have_declared_shape() {
    let click = mac_click.callback();
    assert_eq!(click.id(), "mac:click");
    assert_eq!(click.kind(), &CallbackKind::Event("click".into()));
    assert_eq!(click.arity(), Some(1));
    assert!(click.same_as(&mac_click.callback()));

    assert_eq!(mac_ready.callback().kind(), &CallbackKind::Mount);
    assert_eq!(mac_digits.callback().kind(), &CallbackKind::Validator);
    assert_eq!(mac_seen.callback().kind(), &CallbackKind::Visibility);
    assert_eq!(auto_id.callback().id(), "macros::auto_id");
    assert_eq!(auto_id.callback().kind(), &CallbackKind::AfterHide);
}

#[test]
fn test_macro_body_is_callable_directly() {
    let doc = bindery::Document::new();
    let field = Element::new(doc.clone(), doc.create_element("input"));
    field.set_attribute("value", "12a");
    assert_eq!(mac_digits::call(&field, &[]).as_deref(), Some("digits only"));
}

#[test]
fn test_macro_callbacks_wire_through_a_sweep() {
    let fx = Fixture::new();
    let report = load_callbacks_into(
        &fx.registry,
        &[&mac_click, &mac_ready, &mac_digits, &auto_id, &mac_seen],
    );
    assert_eq!(report.registered, 5);

    let button = fx.element(
        "button",
        &[
            bind(&mac_click.callback(), ["panel"]).unwrap(),
            bind(&mac_ready.callback(), ["a", "b"]).unwrap(),
            bare(&auto_id.callback()),
            bare(&mac_seen.callback()),
        ],
    );
    let input = fx.element("input", &[bare(&mac_digits.callback())]);
    fx.sweep();
    fx.window.run_until_stalled();
    assert_eq!(fx.doc().get_attribute(button, "data-ready").as_deref(), Some("a,b"));

    let before = CLICKS.load(Ordering::SeqCst);
    fx.doc().dispatch_event(button, EventInit::bubbling("click"));
    assert_eq!(CLICKS.load(Ordering::SeqCst), before + 1);

    fx.doc().set_attribute(button, "hidden", "");
    assert!(fx.doc().has_attribute(button, "data-was-hidden"));
    assert_eq!(fx.doc().get_attribute(button, "data-visible").as_deref(), Some("no"));

    fx.doc().set_attribute(input, "value", "x");
    fx.doc().dispatch_event(input, EventInit::bubbling("change"));
    assert_eq!(fx.doc().get_attribute(input, "aria-invalid").as_deref(), Some("true"));
}

#[test]
fn test_inventory_collects_every_declared_callback() {
    let ids: Vec<String> = collected_callbacks()
        .iter()
        .map(|c| c.id().to_string())
        .collect();
    for id in ["mac:click", "mac:ready", "mac:digits", "mac:seen", "macros::auto_id"] {
        assert!(ids.iter().any(|i| i == id), "{id} was not collected");
    }

    let first = bindery::load_collected_callbacks();
    let second = bindery::load_collected_callbacks();
    assert_eq!(second.registered, 0);
    assert_eq!(second.conflicts, 0);
    assert_eq!(second.unchanged, first.registered + first.unchanged);
    assert!(bindery::resolve("mac:click").is_some_and(|c| c.same_as(&mac_click.callback())));
}
