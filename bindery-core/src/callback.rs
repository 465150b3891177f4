//! # Callbacks
//!
//! A [`Callback`] is a handler function plus the metadata needed to find it
//! again from markup: a stable string id, the slot it is bound in
//! ([`CallbackKind`]) and an optional declared argument count.
//!
//! Callbacks are values. Creating one does not register it; registration is a
//! separate step so that modules can export callbacks and an aggregator can
//! load them all at startup.
//!
//! # Handler shapes
//!
//! | Kind | Signature |
//! |------|-----------|
//! | `Event(type)` | `Fn(&Event, &[String]) -> R` |
//! | `Mount` | `Fn(Element, Vec<String>) -> R` or `-> impl Future<Output = R>` |
//! | `AfterHide` | `Fn(Element, &[String]) -> R` |
//! | `Visibility` | `Fn(Element, bool, &[String]) -> R` |
//! | `Validator` | `Fn(&Element, &[String]) -> Option<String>` |
//!
//! where `R: IntoHandlerResult` (`()` or `Result<(), E>`).

use crate::{dom::Event, element::Element, error::BoxError};
use futures::{FutureExt, future::LocalBoxFuture};
use std::{borrow::Cow, future::Future, sync::Arc};

/// Slot a callback is bound in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CallbackKind {
    /// A DOM event of the given (lowercase) type.
    Event(String),
    /// Runs once when the element is first processed.
    Mount,
    /// Runs when the element goes from visible to hidden.
    AfterHide,
    /// Runs whenever the element's visibility flips.
    Visibility,
    /// Runs on validation passes.
    Validator,
}

impl CallbackKind {
    /// Reserved slot names; event types may not use them.
    pub const RESERVED: [&'static str; 4] = ["mount", "afterhide", "visibility", "validate"];

    /// The slot name used in attribute names.
    pub fn slot(&self) -> &str {
        match self {
            CallbackKind::Event(t) => t,
            CallbackKind::Mount => "mount",
            CallbackKind::AfterHide => "afterhide",
            CallbackKind::Visibility => "visibility",
            CallbackKind::Validator => "validate",
        }
    }

    /// Inverse of [`CallbackKind::slot`].
    pub fn from_slot(slot: &str) -> Self {
        match slot {
            "mount" => CallbackKind::Mount,
            "afterhide" => CallbackKind::AfterHide,
            "visibility" => CallbackKind::Visibility,
            "validate" => CallbackKind::Validator,
            other => CallbackKind::Event(other.to_string()),
        }
    }

    /// Whether this is a DOM event slot.
    pub fn is_event(&self) -> bool {
        matches!(self, CallbackKind::Event(_))
    }
}

impl std::fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallbackKind::Event(t) => write!(f, "`{t}` event"),
            other => f.write_str(other.slot()),
        }
    }
}

// ============================================================================
// Output conversion
// ============================================================================

/// Trait for converting a handler's output into a result.
///
/// # Default Implementations
///
/// - `()` → `Ok(())`
/// - `Result<(), E>` → the error boxed
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid callback output",
    label = "callbacks must return `()` or `Result<(), E>`"
)]
pub trait IntoHandlerResult {
    /// Convert the output.
    fn into_handler_result(self) -> Result<(), BoxError>;
}

impl IntoHandlerResult for () {
    fn into_handler_result(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<E> IntoHandlerResult for Result<(), E>
where
    E: Into<BoxError>,
{
    fn into_handler_result(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

// ============================================================================
// Handler storage
// ============================================================================

/// Result of invoking a mount handler.
pub enum MountOutcome {
    /// The handler finished synchronously.
    Done(Result<(), BoxError>),
    /// The handler returned a future that still has to run.
    Pending(LocalBoxFuture<'static, Result<(), BoxError>>),
}

/// Event handler signature.
pub type EventFn = dyn Fn(&Event, &[String]) -> Result<(), BoxError> + Send + Sync;
/// Mount handler signature.
pub type MountFn = dyn Fn(Element, Vec<String>) -> MountOutcome + Send + Sync;
/// After-hide handler signature.
pub type AfterHideFn = dyn Fn(Element, &[String]) -> Result<(), BoxError> + Send + Sync;
/// Visibility handler signature; the flag is the new visibility.
pub type VisibilityFn = dyn Fn(Element, bool, &[String]) -> Result<(), BoxError> + Send + Sync;
/// Validator signature; `Some(message)` reports an error.
pub type ValidatorFn = dyn Fn(&Element, &[String]) -> Option<String> + Send + Sync;

/// Type-erased handler.
#[derive(Clone)]
pub enum CallbackHandler {
    /// See [`EventFn`].
    Event(Arc<EventFn>),
    /// See [`MountFn`].
    Mount(Arc<MountFn>),
    /// See [`AfterHideFn`].
    AfterHide(Arc<AfterHideFn>),
    /// See [`VisibilityFn`].
    Visibility(Arc<VisibilityFn>),
    /// See [`ValidatorFn`].
    Validator(Arc<ValidatorFn>),
}

impl CallbackHandler {
    fn ptr_eq(&self, other: &CallbackHandler) -> bool {
        use CallbackHandler::*;
        match (self, other) {
            (Event(a), Event(b)) => Arc::ptr_eq(a, b),
            (Mount(a), Mount(b)) => Arc::ptr_eq(a, b),
            (AfterHide(a), AfterHide(b)) => Arc::ptr_eq(a, b),
            (Visibility(a), Visibility(b)) => Arc::ptr_eq(a, b),
            (Validator(a), Validator(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// ============================================================================
// Callback
// ============================================================================

/// A handler plus the metadata that lets markup refer to it.
#[derive(Clone)]
pub struct Callback {
    id: Cow<'static, str>,
    kind: CallbackKind,
    arity: Option<usize>,
    handler: CallbackHandler,
}

impl Callback {
    /// An event callback.
    pub fn event<F, R>(
        event_type: impl Into<String>,
        id: impl Into<Cow<'static, str>>,
        f: F,
    ) -> Self
    where
        F: Fn(&Event, &[String]) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        Self {
            id: id.into(),
            kind: CallbackKind::Event(event_type.into()),
            arity: None,
            handler: CallbackHandler::Event(Arc::new(move |event, args| {
                f(event, args).into_handler_result()
            })),
        }
    }

    /// A synchronous mount callback.
    pub fn mount<F, R>(id: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(Element, Vec<String>) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        Self {
            id: id.into(),
            kind: CallbackKind::Mount,
            arity: None,
            handler: CallbackHandler::Mount(Arc::new(move |element, args| {
                MountOutcome::Done(f(element, args).into_handler_result())
            })),
        }
    }

    /// An asynchronous mount callback. The future runs fire-and-forget.
    pub fn mount_async<F, Fut, R>(id: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(Element, Vec<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + 'static,
        R: IntoHandlerResult + 'static,
    {
        Self {
            id: id.into(),
            kind: CallbackKind::Mount,
            arity: None,
            handler: CallbackHandler::Mount(Arc::new(move |element, args| {
                MountOutcome::Pending(
                    f(element, args)
                        .map(IntoHandlerResult::into_handler_result)
                        .boxed_local(),
                )
            })),
        }
    }

    /// An after-hide callback.
    pub fn after_hide<F, R>(id: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(Element, &[String]) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        Self {
            id: id.into(),
            kind: CallbackKind::AfterHide,
            arity: None,
            handler: CallbackHandler::AfterHide(Arc::new(move |element, args| {
                f(element, args).into_handler_result()
            })),
        }
    }

    /// A visibility callback.
    pub fn visibility<F, R>(id: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(Element, bool, &[String]) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        Self {
            id: id.into(),
            kind: CallbackKind::Visibility,
            arity: None,
            handler: CallbackHandler::Visibility(Arc::new(move |element, visible, args| {
                f(element, visible, args).into_handler_result()
            })),
        }
    }

    /// A validator.
    pub fn validator<F>(id: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(&Element, &[String]) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            kind: CallbackKind::Validator,
            arity: None,
            handler: CallbackHandler::Validator(Arc::new(f)),
        }
    }

    /// Declare how many literal arguments bindings should carry.
    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = Some(arity);
        self
    }

    /// Stable id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Slot.
    pub fn kind(&self) -> &CallbackKind {
        &self.kind
    }

    /// Declared argument count.
    pub fn arity(&self) -> Option<usize> {
        self.arity
    }

    /// The handler.
    pub fn handler(&self) -> &CallbackHandler {
        &self.handler
    }

    /// Whether `other` is this very callback (same id, kind and handler
    /// allocation), as opposed to a different callback reusing the id.
    pub fn same_as(&self, other: &Callback) -> bool {
        self.id == other.id && self.kind == other.kind && self.handler.ptr_eq(&other.handler)
    }
}

impl std::fmt::Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callback")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Sources
// ============================================================================

/// Anything that exports callbacks for bulk loading.
///
/// Implemented for single callbacks, slices and vectors of callbacks, and by
/// the structs generated by the attribute macros.
pub trait CallbackSource {
    /// The callbacks to register.
    fn callbacks(&self) -> Vec<Callback>;
}

impl CallbackSource for Callback {
    fn callbacks(&self) -> Vec<Callback> {
        vec![self.clone()]
    }
}

impl CallbackSource for [Callback] {
    fn callbacks(&self) -> Vec<Callback> {
        self.to_vec()
    }
}

impl CallbackSource for Vec<Callback> {
    fn callbacks(&self) -> Vec<Callback> {
        self.clone()
    }
}

impl<T: CallbackSource + ?Sized> CallbackSource for &T {
    fn callbacks(&self) -> Vec<Callback> {
        (**self).callbacks()
    }
}

impl<T: CallbackSource> CallbackSource for std::sync::LazyLock<T> {
    fn callbacks(&self) -> Vec<Callback> {
        (**self).callbacks()
    }
}
