//! # bindery-std
//!
//! Standard implementations for the bindery callback-attribute system.
//!
//! This crate provides:
//! - **Registry**: the process-wide id to callback map ([`registry`])
//! - **Attribute codec**: `data-cb-*` encoding and decoding ([`codec`])
//! - **Processor**: one sweep over a subtree, wiring every binding once
//!   ([`processor`])
//! - **Scheduler**: at most one sweep per animation frame per window
//!   ([`scheduler`])
//! - **Primitives and presets**: callback constructors and the `std:`
//!   callback set ([`primitives`], [`presets`])
//! - **Multi-document support**: active windows and setup hooks
//!   ([`documents`])
//! - **Bulk loading**: [`loader`], with `inventory` collection behind the
//!   `inventory` feature
//! - **HTML**: parse and serialize for server rendering ([`html`])

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core types
pub use bindery_core;

// Modules
pub mod codec;
pub mod config;
pub mod documents;
pub mod html;
pub mod loader;
pub mod presets;
pub mod primitives;
pub mod processor;
pub mod registry;
pub mod scheduler;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

#[cfg(feature = "inventory")]
pub use inventory;
