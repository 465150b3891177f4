//! Expansion shared by the callback macros.
//!
//! An annotated function `f` becomes a unit struct `f` with:
//! - `f::call`, the original function body
//! - `f.callback()`, the `Callback` built from it (one per process)
//! - a `CallbackSource` impl, so `load_callbacks(&[&f])` works
//! - an `inventory` submission picked up by `load_collected_callbacks()`

use crate::args::{CallbackArgs, check_event_type};
use proc_macro::TokenStream;
use quote::quote;
use syn::{FnArg, ItemFn, parse_macro_input};

/// Which slot a macro targets.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Event,
    Mount,
    AfterHide,
    Visibility,
    Validator,
}

impl Slot {
    fn macro_name(self) -> &'static str {
        match self {
            Slot::Event => "handler",
            Slot::Mount => "mounter",
            Slot::AfterHide => "after_hide",
            Slot::Visibility => "visibility",
            Slot::Validator => "validator",
        }
    }

    fn signature(self) -> &'static str {
        match self {
            Slot::Event => "fn(event: &Event, args: &[String])",
            Slot::Mount => "fn(element: Element, args: Vec<String>)",
            Slot::AfterHide => "fn(element: Element, args: &[String])",
            Slot::Visibility => "fn(element: Element, visible: bool, args: &[String])",
            Slot::Validator => "fn(element: &Element, args: &[String]) -> Option<String>",
        }
    }

    fn arg_count(self) -> usize {
        match self {
            Slot::Visibility => 3,
            _ => 2,
        }
    }
}

pub(crate) fn expand(slot: Slot, attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as CallbackArgs);
    let input = parse_macro_input!(item as ItemFn);
    match generate(slot, &args, &input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn generate(
    slot: Slot,
    args: &CallbackArgs,
    input: &ItemFn,
) -> syn::Result<proc_macro2::TokenStream> {
    let sig = &input.sig;
    let fn_name = &sig.ident;
    let fn_vis = &input.vis;
    let fn_attrs = &input.attrs;
    let fn_block = &input.block;
    let inputs = &sig.inputs;
    let output = &sig.output;
    let asyncness = &sig.asyncness;
    let macro_name = slot.macro_name();

    if !sig.generics.params.is_empty() || sig.generics.where_clause.is_some() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            format!("#[{macro_name}] functions cannot be generic"),
        ));
    }
    if let Some(FnArg::Receiver(receiver)) = inputs.first() {
        return Err(syn::Error::new_spanned(
            receiver,
            format!("#[{macro_name}] functions cannot take self"),
        ));
    }
    if inputs.len() != slot.arg_count() {
        return Err(syn::Error::new_spanned(
            &sig.fn_token,
            format!("#[{macro_name}] expects {}", slot.signature()),
        ));
    }
    if asyncness.is_some() && slot != Slot::Mount {
        return Err(syn::Error::new_spanned(
            asyncness,
            format!("#[{macro_name}] functions cannot be async, only mounters can"),
        ));
    }

    let event = match (slot, &args.event) {
        (Slot::Event, Some(event)) => {
            check_event_type(event)?;
            Some(event)
        }
        (Slot::Event, None) => {
            return Err(syn::Error::new_spanned(
                &sig.fn_token,
                "#[handler] needs an event type, e.g. #[handler(\"click\")]",
            ));
        }
        (_, Some(event)) => {
            return Err(syn::Error::new_spanned(
                event,
                format!("#[{macro_name}] does not take an event type"),
            ));
        }
        (_, None) => None,
    };

    let id = match &args.id {
        Some(id) => quote! { #id },
        None => quote! {
            ::core::concat!(::core::module_path!(), "::", ::core::stringify!(#fn_name))
        },
    };

    let constructor = match slot {
        Slot::Event => quote! { ::bindery::Callback::event(#event, #id, #fn_name::call) },
        Slot::Mount if asyncness.is_some() => {
            quote! { ::bindery::Callback::mount_async(#id, #fn_name::call) }
        }
        Slot::Mount => quote! { ::bindery::Callback::mount(#id, #fn_name::call) },
        Slot::AfterHide => quote! { ::bindery::Callback::after_hide(#id, #fn_name::call) },
        Slot::Visibility => quote! { ::bindery::Callback::visibility(#id, #fn_name::call) },
        Slot::Validator => quote! { ::bindery::Callback::validator(#id, #fn_name::call) },
    };
    let arity = args.arity.map(|n| quote! { .with_arity(#n) });

    Ok(quote! {
        #(#fn_attrs)*
        #[allow(non_camel_case_types)]
        #[derive(Clone, Copy, Debug, Default)]
        #fn_vis struct #fn_name;

        impl #fn_name {
            #[doc(hidden)]
            #fn_vis #asyncness fn call(#inputs) #output #fn_block

            /// The callback declared by this item.
            #fn_vis fn callback(&self) -> ::bindery::Callback {
                Self::__bindery_callback()
            }

            #[doc(hidden)]
            pub fn __bindery_callback() -> ::bindery::Callback {
                static CALLBACK: ::std::sync::LazyLock<::bindery::Callback> =
                    ::std::sync::LazyLock::new(|| #constructor #arity);
                ::std::clone::Clone::clone(&*CALLBACK)
            }
        }

        impl ::bindery::CallbackSource for #fn_name {
            fn callbacks(&self) -> ::std::vec::Vec<::bindery::Callback> {
                ::std::vec![Self::__bindery_callback()]
            }
        }

        ::bindery::inventory::submit! {
            ::bindery::CollectedCallback::new(#fn_name::__bindery_callback)
        }
    })
}
