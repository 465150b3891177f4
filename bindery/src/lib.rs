//! # bindery - callback attributes for server-rendered HTML
//!
//! Server-rendered markup cannot carry closures. `bindery` lets it carry
//! *references* to callbacks instead: behavior is registered under a string
//! id, bound to an element as a `data-cb-<slot>` attribute, and wired up in
//! the browser by a sweep over the document.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bindery::prelude::*;
//!
//! // 1. Declare callbacks (or use the primitives directly).
//! #[bindery::handler("click", id = "demo:greet", arity = 1)]
//! fn greet(event: &Event, args: &[String]) {
//!     let name = &args[0];
//!     // ...
//! }
//!
//! // 2. Server side: bind and render.
//! let attrs = bindery::to_attributes(&[bindery::bind(&greet.callback(), ["world"])?]);
//! let html = format!("<button {}>Hi</button>", attrs.to_html());
//!
//! // 3. Client side: load, then process the root.
//! bindery::load_callbacks(&[&greet]);
//! bindery::mount_root(&window, "app")?;
//! window.run_animation_frame();
//! ```
//!
//! ## Features
//!
//! - `macros` (default): `#[handler]`, `#[mounter]`, `#[validator]`,
//!   `#[after_hide]`, `#[visibility]`; implies `inventory`
//! - `inventory`: [`load_collected_callbacks`] for callbacks submitted
//!   anywhere in the binary
//! - `tokio`: [`TokioLocalSpawner`] for running async mounters in a
//!   `tokio::task::LocalSet`
//! - `testing`: [`testing`] helpers

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod bootstrap;

pub use bootstrap::{Bootstrap, mount_root};

pub use bindery_core::{
    // Callbacks
    AfterHideFn,
    // Errors
    BinderyError,
    BoxError,
    Callback,
    CallbackHandler,
    CallbackKind,
    CallbackSource,
    DecodeError,
    // Host model
    Document,
    DocumentId,
    DomError,
    Element,
    EncodeError,
    Event,
    EventFn,
    EventInit,
    HandlerError,
    IntoHandlerResult,
    ListenerOptions,
    LocalPoolSpawner,
    MountFn,
    MountOutcome,
    NodeId,
    RegistryError,
    TaskSpawner,
    ValidatorFn,
    VisibilityFn,
    Window,
    WindowBuilder,
    WindowId,
};

#[cfg(feature = "tokio")]
pub use bindery_core::TokioLocalSpawner;

// Registry
pub use bindery_std::registry::{
    Registry, callback_id, is_registered_callback, register, resolve, unregister,
};

// Attribute codec
pub use bindery_std::codec::{
    ATTRIBUTE_PREFIX, AttributeMap, BoundReference, DecodedBinding, bind, decode_attributes,
    from_attributes, to_attributes,
};

// Processing
pub use bindery_std::{
    config::Config,
    processor::{FieldError, ProcessReport, Processor, process_root, validate_scope},
    scheduler::{SchedulerState, schedule_process_root, schedule_process_root_with},
};

// Primitives
pub use bindery_std::primitives::{
    create_after_hide_callback, create_async_mounter, create_handler, create_mounter,
    create_validator, create_visibility_callback,
};

// Documents
pub use bindery_std::documents::{
    active_documents, event_window, on_document_registered, owner_window, register_document,
};

// Loading
pub use bindery_std::loader::{LoadReport, load_callbacks, load_callbacks_from_exports};
#[cfg(feature = "inventory")]
pub use bindery_std::loader::{CollectedCallback, collected_callbacks, load_collected_callbacks};

/// Attribute grammar internals.
pub mod codec {
    #![allow(clippy::wildcard_imports)]
    pub use bindery_std::codec::*;
}

/// HTML parsing and serialization.
pub mod html {
    #![allow(clippy::wildcard_imports)]
    pub use bindery_std::html::*;
}

/// Standard `std:` callbacks.
pub mod presets {
    #![allow(clippy::wildcard_imports)]
    pub use bindery_std::presets::*;
}

/// Host document model.
pub mod dom {
    #![allow(clippy::wildcard_imports)]
    pub use bindery_core::dom::*;
}

/// Testing utilities.
#[cfg(feature = "testing")]
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use bindery_std::testing::*;
}

/// Prelude module - common imports for bindery.
///
/// # Usage
///
/// ```rust,ignore
/// use bindery::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        BoxError, Callback, CallbackSource, Document, Element, Event, EventInit, NodeId,
        Window, bind, create_after_hide_callback, create_async_mounter, create_handler,
        create_mounter, create_validator, create_visibility_callback, load_callbacks,
        mount_root, to_attributes,
    };
}

#[cfg(feature = "macros")]
pub use bindery_macros::{after_hide, handler, mounter, validator, visibility};

#[cfg(feature = "inventory")]
pub use inventory;
