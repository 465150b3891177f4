//! # bindery-macros
//!
//! Attribute macros that turn a plain function into a bindery callback.
//!
//! ```rust,ignore
//! use bindery::prelude::*;
//!
//! #[bindery::handler("click", id = "demo:open", arity = 1)]
//! fn open(event: &Event, args: &[String]) -> Result<(), BoxError> {
//!     // ...
//!     Ok(())
//! }
//!
//! #[bindery::mounter(id = "demo:fade-in")]
//! async fn fade_in(element: Element, args: Vec<String>) {
//!     // ...
//! }
//!
//! // Either load explicitly...
//! bindery::load_callbacks(&[&open, &fade_in]);
//! // ...or collect everything declared anywhere in the binary.
//! bindery::load_collected_callbacks();
//! ```
//!
//! Without `id = ...` the id is the function's module path plus its name.

use proc_macro::TokenStream;

mod args;
mod callback;

use callback::{Slot, expand};

/// Declare an event handler: `fn(event: &Event, args: &[String])`.
///
/// The first argument is the DOM event type.
///
/// # Example
///
/// ```rust,ignore
/// #[bindery::handler("keydown", id = "demo:shortcut")]
/// fn shortcut(event: &Event, _args: &[String]) {
///     event.prevent_default();
/// }
/// ```
#[proc_macro_attribute]
pub fn handler(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(Slot::Event, attr, item)
}

/// Declare a mount callback: `fn(element: Element, args: Vec<String>)`,
/// optionally `async`.
#[proc_macro_attribute]
pub fn mounter(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(Slot::Mount, attr, item)
}

/// Declare a validator: `fn(element: &Element, args: &[String]) -> Option<String>`.
#[proc_macro_attribute]
pub fn validator(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(Slot::Validator, attr, item)
}

/// Declare an after-hide callback: `fn(element: Element, args: &[String])`.
#[proc_macro_attribute]
pub fn after_hide(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(Slot::AfterHide, attr, item)
}

/// Declare a visibility callback:
/// `fn(element: Element, visible: bool, args: &[String])`.
#[proc_macro_attribute]
pub fn visibility(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(Slot::Visibility, attr, item)
}
