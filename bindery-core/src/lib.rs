//! # bindery-core
//!
//! Core types for the bindery callback-attribute system.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! crates that only declare callbacks, without pulling in the processor.
//!
//! # Layers
//!
//! ## Host model ([`dom`], [`window`])
//!
//! A single-threaded document model with the slice of browser behavior the
//! callback system needs: attributes, classes, event dispatch with
//! capture/target/bubble phases, attribute observers, and windows with an
//! animation-frame queue, timers and an unload signal.
//!
//! - **Cheap handles**: [`Document`], [`Window`] and [`Element`] are `Rc`
//!   handles; cloning never copies the tree
//! - **Deterministic**: time is virtual and advances only when the host asks
//!
//! ## Callbacks ([`Callback`])
//!
//! A handler plus a stable id and the slot ([`CallbackKind`]) it is bound in.
//! Handlers are `Send + Sync` so a process-wide registry can hold them.
//!
//! ## Spawning ([`TaskSpawner`])
//!
//! Async mount handlers run as `!Send` local tasks on whatever executor the
//! window was built with.
//!
//! # Error Types
//!
//! - [`BinderyError`] - Top-level error type
//! - [`RegistryError`] - Registration errors
//! - [`EncodeError`] / [`DecodeError`] - Attribute grammar errors
//! - [`HandlerError`] - Callback failures

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub mod dom;
pub mod error;
pub mod extensions;
pub mod spawn;
pub mod window;

mod callback;
mod element;

// Re-exports
pub use callback::{
    AfterHideFn, Callback, CallbackHandler, CallbackKind, CallbackSource, EventFn,
    IntoHandlerResult, MountFn, MountOutcome, ValidatorFn, VisibilityFn,
};
pub use dom::{Document, DocumentId, Event, EventInit, ListenerOptions, NodeId};
pub use element::Element;
pub use error::{
    BinderyError, BoxError, DecodeError, DomError, EncodeError, HandlerError, RegistryError,
};
pub use extensions::Extensions;
pub use spawn::{LocalPoolSpawner, TaskSpawner};
#[cfg(feature = "tokio")]
pub use spawn::TokioLocalSpawner;
pub use window::{Window, WindowBuilder, WindowId};
