//! Attribute arguments shared by every callback macro.

use syn::{Ident, LitInt, LitStr, Token, parse::Parse};

/// Arguments of `#[handler("click", id = "...", arity = 1)]` and friends.
///
/// Only `#[handler]` takes the leading event type; the other macros reject it.
pub(crate) struct CallbackArgs {
    /// Event type literal, first positional argument.
    pub event: Option<LitStr>,
    /// Explicit callback id.
    pub id: Option<LitStr>,
    /// Declared argument count.
    pub arity: Option<usize>,
}

impl Parse for CallbackArgs {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let mut event = None;
        let mut id = None;
        let mut arity = None;

        if input.peek(LitStr) {
            event = Some(input.parse()?);
            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            match ident.to_string().as_str() {
                "id" => {
                    let lit: LitStr = input.parse()?;
                    if lit.value().is_empty() {
                        return Err(syn::Error::new(lit.span(), "callback id must not be empty"));
                    }
                    id = Some(lit);
                }
                "arity" => {
                    let lit: LitInt = input.parse()?;
                    arity = Some(lit.base10_parse()?);
                }
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {}", other),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(CallbackArgs { event, id, arity })
    }
}

/// Slot names that cannot double as event types.
const RESERVED: [&str; 4] = ["mount", "afterhide", "visibility", "validate"];

/// Check an event type literal the way the codec will at bind time.
pub(crate) fn check_event_type(lit: &LitStr) -> syn::Result<()> {
    let value = lit.value();
    let well_formed = !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-');
    if !well_formed {
        return Err(syn::Error::new(
            lit.span(),
            "event type must be lowercase [a-z0-9_-]+",
        ));
    }
    if RESERVED.contains(&value.as_str()) {
        return Err(syn::Error::new(
            lit.span(),
            format!("`{value}` is a reserved slot name, use the dedicated macro"),
        ));
    }
    Ok(())
}
