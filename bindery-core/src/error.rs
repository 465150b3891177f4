//! Error types for bindery.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`BinderyError`] - Top-level error type for all bindery operations
//! - [`RegistryError`] - Callback registration and lookup errors
//! - [`EncodeError`] / [`DecodeError`] - Attribute grammar errors
//! - [`HandlerError`] - Failures raised by user callbacks
//! - [`DomError`] - Tree manipulation errors from the host DOM
//!
//! Almost everything here is recoverable: the processor logs these errors and
//! moves on. The only error an application is expected to surface is
//! [`BinderyError::MissingRoot`].

use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all bindery operations.
#[derive(Error, Debug)]
pub enum BinderyError {
    /// A registry operation failed.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// A binding could not be encoded into attributes.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// An attribute value could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A callback failed.
    #[error("handler error: {0}")]
    Handler(#[from] HandlerError),

    /// A DOM operation was rejected.
    #[error("dom error: {0}")]
    Dom(#[from] DomError),

    /// The render root container does not exist.
    #[error("render root `#{0}` not found in document")]
    MissingRoot(String),

    /// Markup could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// A custom error occurred.
    #[error(transparent)]
    Custom(BoxError),
}

/// Errors raised by the callback registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A callback with this id is already registered.
    #[error("callback `{0}` is already registered")]
    Duplicate(String),

    /// No callback with this id is registered.
    #[error("callback `{0}` is not registered")]
    Unknown(String),
}

/// Errors raised while encoding bindings into attributes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The event type cannot be used as an attribute name suffix.
    #[error("invalid event type `{0}`: expected lowercase [a-z0-9_-]+ that is not a reserved slot")]
    InvalidEventType(String),

    /// Callback ids must not be empty.
    #[error("callback id must not be empty")]
    EmptyId,
}

/// Errors raised while decoding attribute values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// An entry had an empty callback id.
    #[error("empty callback id in entry {entry}")]
    EmptyId {
        /// Zero-based entry index inside the attribute value.
        entry: usize,
    },

    /// A `%` escape was truncated or not followed by two hex digits.
    #[error("malformed escape at byte {position}")]
    BadEscape {
        /// Byte offset of the offending `%`.
        position: usize,
    },

    /// An escape sequence decoded to invalid UTF-8.
    #[error("escaped bytes are not valid UTF-8")]
    InvalidUtf8,
}

/// Failures raised by user callbacks.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// The handler returned an error.
    #[error("callback `{id}` failed: {source}")]
    Failed {
        /// Callback id.
        id: String,
        /// The error returned by the handler.
        #[source]
        source: BoxError,
    },

    /// The handler panicked.
    #[error("callback `{id}` panicked: {message}")]
    Panicked {
        /// Callback id.
        id: String,
        /// Panic payload, when it was a string.
        message: String,
    },

    /// A binding referenced a callback registered for a different slot.
    #[error("callback `{id}` is a {found} callback, bound as {expected}")]
    KindMismatch {
        /// Callback id.
        id: String,
        /// Slot the binding was encoded in.
        expected: String,
        /// Slot the callback was registered for.
        found: String,
    },
}

/// Errors raised by the host DOM.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// The node id does not belong to this document.
    #[error("node {0} does not exist in this document")]
    NoSuchNode(u32),

    /// The insertion would create a cycle or put a node under a non-container.
    #[error("hierarchy request error: {0}")]
    HierarchyRequest(&'static str),

    /// The reference node of an insertion is not a child of the parent.
    #[error("node {0} is not a child of the insertion parent")]
    NotFound(u32),
}

// Convenience conversions
impl From<BoxError> for BinderyError {
    fn from(err: BoxError) -> Self {
        BinderyError::Custom(err)
    }
}

/// Extracts a readable message from a panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
