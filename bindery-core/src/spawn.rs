//! Task spawning - runtime-agnostic fire-and-forget execution.
//!
//! Async mount handlers hold DOM handles, which are `!Send`, so they run on a
//! local (single-threaded) executor. [`TaskSpawner`] abstracts over which one.

use futures::{
    executor::{LocalPool, LocalSpawner},
    future::LocalBoxFuture,
    task::LocalSpawnExt,
};
use std::cell::RefCell;

/// Trait for spawning `!Send` tasks - implement this for your runtime.
pub trait TaskSpawner {
    /// Spawn a task. The caller does not wait for it.
    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>);

    /// Drive spawned tasks until none can make progress.
    ///
    /// Runtimes that drive themselves (e.g. Tokio) keep the default no-op.
    fn run_until_stalled(&self) {}
}

/// A [`TaskSpawner`] backed by a `futures` [`LocalPool`].
///
/// Tasks only make progress when [`TaskSpawner::run_until_stalled`] is called,
/// which the owning window does after frames and timers.
pub struct LocalPoolSpawner {
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
}

impl LocalPoolSpawner {
    /// Create a spawner with an empty pool.
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            pool: RefCell::new(pool),
            spawner,
        }
    }
}

impl Default for LocalPoolSpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskSpawner for LocalPoolSpawner {
    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
        if let Err(err) = self.spawner.spawn_local(task) {
            tracing::warn!(error = %err, "local pool rejected task");
        }
    }

    fn run_until_stalled(&self) {
        // Re-entrant calls (a task driving the loop) are ignored; the outer
        // call keeps polling until the pool stalls.
        if let Ok(mut pool) = self.pool.try_borrow_mut() {
            pool.run_until_stalled();
        }
    }
}

/// A [`TaskSpawner`] that hands tasks to `tokio::task::spawn_local`.
///
/// Must be used from inside a `tokio::task::LocalSet`.
#[cfg(feature = "tokio")]
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioLocalSpawner;

#[cfg(feature = "tokio")]
impl TaskSpawner for TokioLocalSpawner {
    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
        drop(tokio::task::spawn_local(task));
    }
}
