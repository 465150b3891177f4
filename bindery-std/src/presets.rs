//! Standard callbacks under the `std:` namespace.
//!
//! | Id | Slot | Arguments |
//! |----|------|-----------|
//! | `std:nojs` | mount | `[attribute]` or `[attribute, value]`, default `data-nojs` |
//! | `std:show-after` | mount (async) | `[milliseconds]` |
//! | `std:hide-after` | mount (async) | `[milliseconds]` |
//! | `std:toggle` | `click` | `[target element id]` |
//! | `std:reset-on-hide` | afterhide | none |
//! | `std:required` | validate | `[message]` optional |
//! | `std:min-length` | validate | `[length]` or `[length, message]` |
//!
//! Hidden-class presets read the class from [`config::current`].
//!
//! ```rust,ignore
//! bindery::load_callbacks(&[&bindery::presets::callbacks()]);
//! ```

use crate::{
    config,
    primitives::{
        create_after_hide_callback, create_async_mounter, create_handler, create_mounter,
        create_validator,
    },
    processor::ERROR_ATTRIBUTE,
};
use bindery_core::{BoxError, Callback, Element, Event};
use std::{sync::LazyLock, time::Duration};

/// Attribute `std:nojs` removes when no attribute is named.
pub const DEFAULT_NOJS_ATTRIBUTE: &str = "data-nojs";

static NOJS: LazyLock<Callback> = LazyLock::new(|| create_mounter("std:nojs", nojs_mount));

static SHOW_AFTER: LazyLock<Callback> = LazyLock::new(|| {
    create_async_mounter("std:show-after", |element, args| {
        set_hidden_after(element, args, false)
    })
    .with_arity(1)
});

static HIDE_AFTER: LazyLock<Callback> = LazyLock::new(|| {
    create_async_mounter("std:hide-after", |element, args| {
        set_hidden_after(element, args, true)
    })
    .with_arity(1)
});

static TOGGLE: LazyLock<Callback> =
    LazyLock::new(|| create_handler("click", "std:toggle", toggle_target).with_arity(1));

static RESET_ON_HIDE: LazyLock<Callback> =
    LazyLock::new(|| create_after_hide_callback("std:reset-on-hide", reset_fields));

static REQUIRED: LazyLock<Callback> =
    LazyLock::new(|| create_validator("std:required", required));

static MIN_LENGTH: LazyLock<Callback> =
    LazyLock::new(|| create_validator("std:min-length", min_length));

/// `std:nojs`: drop (or overwrite) a no-JS marker once scripting is live.
pub fn nojs() -> Callback {
    NOJS.clone()
}

/// `std:show-after`: remove the hidden class after a delay.
pub fn show_after() -> Callback {
    SHOW_AFTER.clone()
}

/// `std:hide-after`: add the hidden class after a delay.
pub fn hide_after() -> Callback {
    HIDE_AFTER.clone()
}

/// `std:toggle`: flip the hidden class of another element on click.
pub fn toggle() -> Callback {
    TOGGLE.clone()
}

/// `std:reset-on-hide`: clear field values and validation marks under the
/// element each time it is hidden.
pub fn reset_on_hide() -> Callback {
    RESET_ON_HIDE.clone()
}

/// `std:required`: reject an empty `value`.
pub fn required_field() -> Callback {
    REQUIRED.clone()
}

/// `std:min-length`: reject a `value` shorter than the bound length.
pub fn min_length_field() -> Callback {
    MIN_LENGTH.clone()
}

/// Every standard callback.
pub fn callbacks() -> Vec<Callback> {
    vec![
        nojs(),
        show_after(),
        hide_after(),
        toggle(),
        reset_on_hide(),
        required_field(),
        min_length_field(),
    ]
}

// ============================================================================
// Handlers
// ============================================================================

fn nojs_mount(element: Element, args: Vec<String>) {
    let attribute = args.first().map_or(DEFAULT_NOJS_ATTRIBUTE, String::as_str);
    match args.get(1) {
        Some(value) => element.set_attribute(attribute, value),
        None => {
            element.remove_attribute(attribute);
        }
    }
}

fn delay_arg(args: &[String]) -> Result<Duration, BoxError> {
    let raw = args.first().ok_or("expected a delay in milliseconds")?;
    let millis: u64 = raw
        .parse()
        .map_err(|_| format!("`{raw}` is not a delay in milliseconds"))?;
    Ok(Duration::from_millis(millis))
}

async fn set_hidden_after(
    element: Element,
    args: Vec<String>,
    hidden: bool,
) -> Result<(), BoxError> {
    let delay = delay_arg(&args)?;
    let window = element
        .window()
        .ok_or("element is not displayed in a window")?;
    window.sleep(delay).await;
    if window.is_closed() {
        return Ok(());
    }
    let class = config::current().hidden_class;
    if hidden {
        element.add_class(&class);
    } else {
        element.remove_class(&class);
    }
    Ok(())
}

fn toggle_target(event: &Event, args: &[String]) -> Result<(), BoxError> {
    let [target] = args else {
        return Err("expected the id of the element to toggle".into());
    };
    let document = event.document();
    let node = document
        .get_element_by_id(target)
        .ok_or_else(|| format!("no element with id `{target}`"))?;
    let class = config::current().hidden_class;
    let hidden = document.toggle_class(node, &class, None);
    document.set_attribute(
        event.current_target(),
        "aria-expanded",
        if hidden { "false" } else { "true" },
    );
    Ok(())
}

fn reset_fields(element: Element, _args: &[String]) {
    let fields = std::iter::once(element.clone()).chain(element.descendants());
    for field in fields {
        field.remove_attribute("value");
        field.remove_attribute("aria-invalid");
        field.remove_attribute(ERROR_ATTRIBUTE);
    }
}

fn field_value(element: &Element) -> String {
    element.attribute("value").unwrap_or_default()
}

fn required(element: &Element, args: &[String]) -> Option<String> {
    if field_value(element).trim().is_empty() {
        Some(
            args.first()
                .cloned()
                .unwrap_or_else(|| "This field is required".to_string()),
        )
    } else {
        None
    }
}

fn min_length(element: &Element, args: &[String]) -> Option<String> {
    let Some(min) = args.first().and_then(|raw| raw.parse::<usize>().ok()) else {
        tracing::warn!(?args, "std:min-length needs a numeric length, field not checked");
        return None;
    };
    let length = field_value(element).chars().count();
    if length < min {
        Some(
            args.get(1)
                .cloned()
                .unwrap_or_else(|| format!("Enter at least {min} characters")),
        )
    } else {
        None
    }
}
