//! Runtime configuration.
//!
//! A [`Config`] can be built in code or parsed from a URL query string, the
//! way a page opts into debug affordances (`?defer-load-callbacks`).

use std::sync::{LazyLock, PoisonError, RwLock};

/// Class that marks an element as hidden, unless configured otherwise.
pub const DEFAULT_HIDDEN_CLASS: &str = "t-hidden";

/// Query key that delays bulk callback registration (development builds only).
pub const DEFER_LOAD_CALLBACKS: &str = "defer-load-callbacks";

/// Query key that enables debug logging of sweeps.
pub const DEBUG: &str = "bindery-debug";

/// Query key that overrides [`Config::hidden_class`].
pub const HIDDEN_CLASS: &str = "bindery-hidden-class";

static GLOBAL: LazyLock<RwLock<Config>> = LazyLock::new(|| RwLock::new(Config::default()));

/// Runtime options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Class treated like the `hidden` attribute by visibility hooks.
    pub hidden_class: String,
    /// Hold bulk registration until released, to exercise the hydration gap.
    pub defer_load_callbacks: bool,
    /// Log per-sweep reports at `info` instead of `debug`.
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hidden_class: DEFAULT_HIDDEN_CLASS.to_string(),
            defer_load_callbacks: false,
            debug: false,
        }
    }
}

impl Config {
    /// Parse a query string (with or without the leading `?`).
    ///
    /// Unknown keys are ignored. Flags are on when present with an empty
    /// value, `1`, `true` or `yes`.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut config = Config::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                DEFER_LOAD_CALLBACKS => {
                    if cfg!(debug_assertions) {
                        config.defer_load_callbacks = flag(&value);
                    } else {
                        tracing::debug!("ignoring `{DEFER_LOAD_CALLBACKS}` in a release build");
                    }
                }
                DEBUG => config.debug = flag(&value),
                HIDDEN_CLASS if !value.trim().is_empty() => {
                    config.hidden_class = value.trim().to_string();
                }
                _ => {}
            }
        }
        config
    }

    /// Set the hidden class.
    pub fn with_hidden_class(mut self, class: impl Into<String>) -> Self {
        self.hidden_class = class.into();
        self
    }
}

fn flag(value: &str) -> bool {
    matches!(value, "" | "1" | "true" | "yes")
}

/// A copy of the process-wide configuration.
pub fn current() -> Config {
    GLOBAL.read().unwrap_or_else(PoisonError::into_inner).clone()
}

/// Replace the process-wide configuration.
pub fn set_global(config: Config) {
    *GLOBAL.write().unwrap_or_else(PoisonError::into_inner) = config;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.hidden_class, "t-hidden");
        assert!(!config.defer_load_callbacks);
        assert!(!config.debug);
    }

    #[test]
    fn test_from_query() {
        let config = Config::from_query("?page=2&bindery-debug&bindery-hidden-class=is%2Dhidden");
        assert!(config.debug);
        assert_eq!(config.hidden_class, "is-hidden");
        assert!(!config.defer_load_callbacks);

        let off = Config::from_query("bindery-debug=0");
        assert!(!off.debug);
    }

    #[test]
    fn test_defer_flag_is_development_only() {
        let config = Config::from_query("defer-load-callbacks=1");
        assert_eq!(config.defer_load_callbacks, cfg!(debug_assertions));
    }
}
