//! Derived primitives - the callback constructors feature modules use.
//!
//! Each function builds a [`Callback`] for one slot. Nothing is registered
//! until the callback is loaded (see [`crate::loader::load_callbacks`]), so
//! modules can export callbacks as plain values.
//!
//! ```rust,ignore
//! static OPEN: LazyLock<Callback> = LazyLock::new(|| {
//!     create_handler("click", "demo:open", |event, args| {
//!         let [target] = args else { return Err("expected a target id".into()) };
//!         open_dialog(event.document(), target)
//!     })
//!     .with_arity(1)
//! });
//! ```

use bindery_core::{Callback, Element, Event, IntoHandlerResult};
use std::{borrow::Cow, future::Future};

/// A callback run once when its element is first processed.
pub fn create_mounter<F, R>(id: impl Into<Cow<'static, str>>, handler: F) -> Callback
where
    F: Fn(Element, Vec<String>) -> R + Send + Sync + 'static,
    R: IntoHandlerResult,
{
    Callback::mount(id, handler)
}

/// A mount callback whose work continues asynchronously on the element's
/// window. The sweep does not wait for it.
pub fn create_async_mounter<F, Fut, R>(id: impl Into<Cow<'static, str>>, handler: F) -> Callback
where
    F: Fn(Element, Vec<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + 'static,
    R: IntoHandlerResult + 'static,
{
    Callback::mount_async(id, handler)
}

/// A handler for DOM events of `event_type`.
///
/// The handler sees the event with `current_target` pointing at the bound
/// element, and may stop propagation or prevent the default action.
pub fn create_handler<F, R>(
    event_type: impl Into<String>,
    id: impl Into<Cow<'static, str>>,
    handler: F,
) -> Callback
where
    F: Fn(&Event, &[String]) -> R + Send + Sync + 'static,
    R: IntoHandlerResult,
{
    Callback::event(event_type, id, handler)
}

/// A validator. Return `Some(message)` to reject the field.
pub fn create_validator<F>(id: impl Into<Cow<'static, str>>, handler: F) -> Callback
where
    F: Fn(&Element, &[String]) -> Option<String> + Send + Sync + 'static,
{
    Callback::validator(id, handler)
}

/// A callback run each time its element goes from visible to hidden.
pub fn create_after_hide_callback<F, R>(id: impl Into<Cow<'static, str>>, handler: F) -> Callback
where
    F: Fn(Element, &[String]) -> R + Send + Sync + 'static,
    R: IntoHandlerResult,
{
    Callback::after_hide(id, handler)
}

/// A callback run each time its element's visibility flips, with the new
/// visibility.
pub fn create_visibility_callback<F, R>(id: impl Into<Cow<'static, str>>, handler: F) -> Callback
where
    F: Fn(Element, bool, &[String]) -> R + Send + Sync + 'static,
    R: IntoHandlerResult,
{
    Callback::visibility(id, handler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_core::CallbackKind;

    #[test]
    fn test_constructors_pick_the_slot() {
        let cases = [
            (create_mounter("p:m", |_, _| ()), CallbackKind::Mount),
            (
                create_async_mounter("p:a", |_, _| async {}),
                CallbackKind::Mount,
            ),
            (
                create_handler("keydown", "p:k", |_, _| ()),
                CallbackKind::Event("keydown".into()),
            ),
            (create_validator("p:v", |_, _| None), CallbackKind::Validator),
            (
                create_after_hide_callback("p:h", |_, _| ()),
                CallbackKind::AfterHide,
            ),
            (
                create_visibility_callback("p:s", |_, _, _| ()),
                CallbackKind::Visibility,
            ),
        ];
        for (callback, kind) in cases {
            assert_eq!(callback.kind(), &kind);
            assert_eq!(callback.arity(), None);
        }
        assert_eq!(create_mounter("p:n", |_, _| ()).with_arity(2).arity(), Some(2));
    }
}
