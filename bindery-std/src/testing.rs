//! Test helpers.
//!
//! Available to this crate's own tests and, with the `testing` feature, to
//! downstream test suites.

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicUsize, Ordering},
};
use tracing::{Level, Subscriber, field::Field, subscriber::DefaultGuard};
use tracing_subscriber::{
    Layer,
    layer::{Context, SubscriberExt},
};

// ============================================================================
// Call tracking
// ============================================================================

/// A shareable call counter, usable from `Send + Sync` handlers.
#[derive(Debug, Default, Clone)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    /// Start at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one call.
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    /// Calls so far.
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Records values in the order handlers see them.
#[derive(Debug)]
pub struct Recorder<T>(Arc<Mutex<Vec<T>>>);

impl<T> Recorder<T> {
    /// An empty recorder.
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(Vec::new())))
    }

    /// Append a value.
    pub fn push(&self, value: T) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(value);
    }

    /// Number of recorded values.
    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> Recorder<T> {
    /// Everything recorded so far.
    pub fn values(&self) -> Vec<T> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Log capture
// ============================================================================

/// Captures `WARN` and `ERROR` events on the current thread while alive.
///
/// ```rust,ignore
/// let warnings = WarningCounter::install();
/// registry.register(duplicate);
/// assert_eq!(warnings.count(), 1);
/// ```
pub struct WarningCounter {
    captured: Arc<Mutex<Vec<String>>>,
    _guard: DefaultGuard,
}

impl WarningCounter {
    /// Install a capturing subscriber as this thread's default.
    pub fn install() -> Self {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let layer = CaptureLayer {
            captured: captured.clone(),
        };
        let guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(layer));
        Self {
            captured,
            _guard: guard,
        }
    }

    /// Warnings and errors seen so far.
    pub fn count(&self) -> usize {
        self.captured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Rendered messages, each `message key=value ...`.
    pub fn messages(&self) -> Vec<String> {
        self.captured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether any captured message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.messages().iter().any(|m| m.contains(needle))
    }

    /// Forget what was captured.
    pub fn reset(&self) {
        self.captured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl std::fmt::Debug for WarningCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarningCounter")
            .field("count", &self.count())
            .finish()
    }
}

struct CaptureLayer {
    captured: Arc<Mutex<Vec<String>>>,
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() > Level::WARN {
            return;
        }
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.captured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(visitor.finish());
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> String {
        let mut out = self.message;
        for field in self.fields {
            out.push(' ');
            out.push_str(&field);
        }
        out
    }
}

impl tracing::field::Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={value}", field.name()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push(format!("{}={value:?}", field.name()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_and_recorder_share_state() {
        let counter = CallCounter::new();
        let clone = counter.clone();
        clone.hit();
        clone.hit();
        assert_eq!(counter.get(), 2);

        let recorder = Recorder::new();
        recorder.clone().push("a");
        recorder.push("b");
        assert_eq!(recorder.values(), vec!["a", "b"]);
    }

    #[test]
    fn test_warning_counter_ignores_lower_levels() {
        let warnings = WarningCounter::install();
        tracing::info!("fine");
        tracing::warn!(id = "x:y", "something off");
        tracing::error!("broken");
        assert_eq!(warnings.count(), 2);
        assert!(warnings.contains("something off id=x:y"));
        warnings.reset();
        assert_eq!(warnings.count(), 0);
    }
}
