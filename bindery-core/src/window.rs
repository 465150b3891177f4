//! Windows and the event loop.
//!
//! A [`Window`] owns one [`Document`] plus the per-window scheduling surface:
//! an animation-frame queue and an unload signal. Windows opened from another
//! window share its [`EventLoop`] (virtual clock, timers, task spawner), the
//! way popups share the opener's event loop in a browser.
//!
//! Time is virtual: nothing happens until the host calls
//! [`Window::run_animation_frame`], [`Window::advance`] or
//! [`Window::run_until_stalled`]. This keeps scheduling deterministic.

use crate::{
    dom::Document,
    extensions::Extensions,
    spawn::{LocalPoolSpawner, TaskSpawner},
};
use futures::{FutureExt, channel::oneshot};
use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    future::Future,
    rc::{Rc, Weak},
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

/// Process-unique window identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(u64);

impl WindowId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Handle returned by [`Window::request_animation_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(u64);

/// Handle returned by [`Window::set_timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

type FrameCallback = Box<dyn FnOnce(Duration)>;
type UnloadCallback = Box<dyn FnOnce(&Window)>;
type TimerCallback = Box<dyn FnOnce()>;
/// Timers ordered by deadline, then creation.
type TimerQueue = BTreeMap<(Duration, TimerId), Timer>;

struct Timer {
    window: WindowId,
    callback: TimerCallback,
}

/// Shared clock, timer queue and task spawner.
pub struct EventLoop {
    now: Cell<Duration>,
    timers: RefCell<TimerQueue>,
    next_id: Cell<u64>,
    spawner: Rc<dyn TaskSpawner>,
}

impl EventLoop {
    fn new(spawner: Rc<dyn TaskSpawner>) -> Self {
        Self {
            now: Cell::new(Duration::ZERO),
            timers: RefCell::new(BTreeMap::new()),
            next_id: Cell::new(0),
            spawner,
        }
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Number of pending timers across all windows.
    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    /// Drive spawned tasks until they stall.
    pub fn run_until_stalled(&self) {
        self.spawner.run_until_stalled();
    }

    /// Advance the clock, firing due timers in deadline order.
    pub fn advance(&self, by: Duration) {
        let deadline = self.now.get() + by;
        loop {
            let due = {
                let mut timers = self.timers.borrow_mut();
                match timers.first_key_value() {
                    Some(((at, _), _)) if *at <= deadline => timers.pop_first(),
                    _ => None,
                }
            };
            let Some(((at, _), timer)) = due else {
                break;
            };
            self.now.set(at.max(self.now.get()));
            (timer.callback)();
            self.run_until_stalled();
        }
        self.now.set(deadline);
        self.run_until_stalled();
    }

    fn add_timer(&self, window: WindowId, delay: Duration, callback: TimerCallback) -> TimerId {
        let id = TimerId(self.next_id());
        self.timers
            .borrow_mut()
            .insert((self.now.get() + delay, id), Timer { window, callback });
        id
    }

    fn clear_timer(&self, id: TimerId) -> bool {
        let mut timers = self.timers.borrow_mut();
        let key = timers.keys().find(|(_, t)| *t == id).copied();
        key.and_then(|k| timers.remove(&k)).is_some()
    }

    fn clear_window(&self, window: WindowId) {
        let dropped: Vec<Timer> = {
            let mut timers = self.timers.borrow_mut();
            let keys: Vec<_> = timers
                .iter()
                .filter(|(_, t)| t.window == window)
                .map(|(k, _)| *k)
                .collect();
            keys.into_iter().filter_map(|k| timers.remove(&k)).collect()
        };
        drop(dropped);
    }
}

pub(crate) struct WindowInner {
    id: WindowId,
    url: String,
    document: Document,
    event_loop: Rc<EventLoop>,
    frames: RefCell<Vec<(FrameId, FrameCallback)>>,
    unload: RefCell<Vec<UnloadCallback>>,
    closed: Cell<bool>,
    opener: Option<Weak<WindowInner>>,
    extensions: RefCell<Extensions>,
}

/// Builder for a top-level [`Window`].
#[derive(Default)]
pub struct WindowBuilder {
    url: Option<String>,
    document: Option<Document>,
    spawner: Option<Rc<dyn TaskSpawner>>,
}

impl WindowBuilder {
    /// Set the window URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Display an existing document (e.g. one parsed from server markup).
    pub fn document(mut self, document: Document) -> Self {
        self.document = Some(document);
        self
    }

    /// Use a custom task spawner instead of a local pool.
    pub fn spawner(mut self, spawner: Rc<dyn TaskSpawner>) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Build the window.
    pub fn build(self) -> Window {
        let spawner = self
            .spawner
            .unwrap_or_else(|| Rc::new(LocalPoolSpawner::new()));
        Window::create(
            self.url.unwrap_or_else(|| "about:blank".to_string()),
            self.document.unwrap_or_default(),
            Rc::new(EventLoop::new(spawner)),
            None,
        )
    }
}

/// Handle to a browsing window.
#[derive(Clone)]
pub struct Window(Rc<WindowInner>);

impl Window {
    /// A new top-level window with an empty document.
    pub fn new() -> Self {
        WindowBuilder::default().build()
    }

    /// Start building a top-level window.
    pub fn builder() -> WindowBuilder {
        WindowBuilder::default()
    }

    fn create(
        url: String,
        document: Document,
        event_loop: Rc<EventLoop>,
        opener: Option<Weak<WindowInner>>,
    ) -> Self {
        let inner = Rc::new(WindowInner {
            id: WindowId::next(),
            url,
            document,
            event_loop,
            frames: RefCell::new(Vec::new()),
            unload: RefCell::new(Vec::new()),
            closed: Cell::new(false),
            opener,
            extensions: RefCell::new(Extensions::new()),
        });
        inner.document.set_view(Rc::downgrade(&inner));
        Self(inner)
    }

    pub(crate) fn from_inner(inner: Rc<WindowInner>) -> Self {
        Self(inner)
    }

    /// Window identifier.
    pub fn id(&self) -> WindowId {
        self.0.id
    }

    /// Window URL.
    pub fn url(&self) -> &str {
        &self.0.url
    }

    /// The displayed document.
    pub fn document(&self) -> &Document {
        &self.0.document
    }

    /// Whether two handles refer to the same window.
    pub fn ptr_eq(&self, other: &Window) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// The shared event loop.
    pub fn event_loop(&self) -> &EventLoop {
        &self.0.event_loop
    }

    /// Open a secondary window sharing this window's event loop.
    pub fn open(&self, url: impl Into<String>) -> Window {
        Window::create(
            url.into(),
            Document::new(),
            Rc::clone(&self.0.event_loop),
            Some(Rc::downgrade(&self.0)),
        )
    }

    /// The window that opened this one, if it is still alive.
    pub fn opener(&self) -> Option<Window> {
        self.0
            .opener
            .as_ref()
            .and_then(Weak::upgrade)
            .map(Window)
    }

    // ========================================================================
    // Animation frames
    // ========================================================================

    /// Queue `callback` for the next animation frame.
    ///
    /// On a closed window the callback is dropped without running.
    pub fn request_animation_frame(&self, callback: impl FnOnce(Duration) + 'static) -> FrameId {
        let id = FrameId(self.0.event_loop.next_id());
        if !self.0.closed.get() {
            self.0.frames.borrow_mut().push((id, Box::new(callback)));
        }
        id
    }

    /// Cancel a queued frame callback.
    pub fn cancel_animation_frame(&self, id: FrameId) -> bool {
        let removed = {
            let mut frames = self.0.frames.borrow_mut();
            let pos = frames.iter().position(|(f, _)| *f == id);
            pos.map(|p| frames.remove(p))
        };
        removed.is_some()
    }

    /// Number of queued frame callbacks.
    pub fn pending_frames(&self) -> usize {
        self.0.frames.borrow().len()
    }

    /// Run the callbacks queued before this call, then drive tasks.
    ///
    /// Callbacks requested while the frame runs wait for the next frame.
    /// Returns the number of callbacks that ran.
    pub fn run_animation_frame(&self) -> usize {
        let frames = std::mem::take(&mut *self.0.frames.borrow_mut());
        let now = self.0.event_loop.now();
        let count = frames.len();
        for (_, callback) in frames {
            callback(now);
        }
        self.0.event_loop.run_until_stalled();
        count
    }

    // ========================================================================
    // Timers & tasks
    // ========================================================================

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.0.event_loop.now()
    }

    /// Run `callback` once `delay` of virtual time has passed.
    pub fn set_timeout(&self, delay: Duration, callback: impl FnOnce() + 'static) -> TimerId {
        if self.0.closed.get() {
            return TimerId(self.0.event_loop.next_id());
        }
        self.0
            .event_loop
            .add_timer(self.0.id, delay, Box::new(callback))
    }

    /// Cancel a pending timer.
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        self.0.event_loop.clear_timer(id)
    }

    /// A future that resolves after `delay`, or early if the window closes.
    pub fn sleep(&self, delay: Duration) -> impl Future<Output = ()> + 'static {
        let (tx, rx) = oneshot::channel::<()>();
        self.set_timeout(delay, move || {
            let _ = tx.send(());
        });
        rx.map(|_| ())
    }

    /// Advance the shared clock, firing due timers.
    pub fn advance(&self, by: Duration) {
        self.0.event_loop.advance(by);
    }

    /// Spawn a fire-and-forget task on the window's event loop.
    pub fn spawn_local(&self, task: impl Future<Output = ()> + 'static) {
        self.0.event_loop.spawner.spawn_local(task.boxed_local());
    }

    /// Drive spawned tasks until none can make progress.
    pub fn run_until_stalled(&self) {
        self.0.event_loop.run_until_stalled();
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Run `callback` when the window unloads.
    ///
    /// Registering on a closed window runs nothing.
    pub fn add_unload_listener(&self, callback: impl FnOnce(&Window) + 'static) {
        if !self.0.closed.get() {
            self.0.unload.borrow_mut().push(Box::new(callback));
        }
    }

    /// Close the window: fire unload listeners once, then drop queued frames
    /// and this window's timers.
    pub fn close(&self) {
        if self.0.closed.replace(true) {
            return;
        }
        tracing::debug!(window = ?self.0.id, url = %self.0.url, "window unloading");
        let listeners = std::mem::take(&mut *self.0.unload.borrow_mut());
        for listener in listeners {
            listener(self);
        }
        let frames = std::mem::take(&mut *self.0.frames.borrow_mut());
        drop(frames);
        self.0.event_loop.clear_window(self.0.id);
        self.0.event_loop.run_until_stalled();
    }

    /// Whether the window has been closed.
    pub fn is_closed(&self) -> bool {
        self.0.closed.get()
    }

    /// Per-window value of type `T`, created with `T::default()` on first use.
    pub fn extension<T: Default + 'static>(&self) -> Rc<T> {
        self.0.extensions.borrow_mut().get_or_default::<T>()
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("id", &self.0.id)
            .field("url", &self.0.url)
            .field("closed", &self.0.closed.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_knows_its_view() {
        let window = Window::new();
        let view = window.document().default_view().unwrap();
        assert!(view.ptr_eq(&window));
    }

    #[test]
    fn test_frames_requested_during_frame_wait() {
        let window = Window::new();
        let hits = Rc::new(Cell::new(0));
        let (w, h) = (window.clone(), hits.clone());
        window.request_animation_frame(move |_| {
            h.set(h.get() + 1);
            let h = h.clone();
            w.request_animation_frame(move |_| h.set(h.get() + 1));
        });
        assert_eq!(window.run_animation_frame(), 1);
        assert_eq!(hits.get(), 1);
        assert_eq!(window.run_animation_frame(), 1);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_cancel_frame() {
        let window = Window::new();
        let id = window.request_animation_frame(|_| panic!("canceled frame ran"));
        assert!(window.cancel_animation_frame(id));
        assert_eq!(window.run_animation_frame(), 0);
    }

    #[test]
    fn test_timers_fire_in_order() {
        let window = Window::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for (ms, label) in [(30, "c"), (10, "a"), (20, "b")] {
            let log = log.clone();
            window.set_timeout(Duration::from_millis(ms), move || log.borrow_mut().push(label));
        }
        window.advance(Duration::from_millis(15));
        assert_eq!(*log.borrow(), vec!["a"]);
        window.advance(Duration::from_millis(15));
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
        assert_eq!(window.now(), Duration::from_millis(30));
    }

    #[test]
    fn test_sleep_wakes_task() {
        let window = Window::new();
        let done = Rc::new(Cell::new(false));
        let (d, sleep) = (done.clone(), window.sleep(Duration::from_millis(5)));
        window.spawn_local(async move {
            sleep.await;
            d.set(true);
        });
        window.run_until_stalled();
        assert!(!done.get());
        window.advance(Duration::from_millis(5));
        assert!(done.get());
    }

    #[test]
    fn test_close_fires_unload_once_and_drops_work() {
        let window = Window::new();
        let unloads = Rc::new(Cell::new(0));
        let u = unloads.clone();
        window.add_unload_listener(move |_| u.set(u.get() + 1));
        window.request_animation_frame(|_| panic!("frame ran after close"));
        window.set_timeout(Duration::ZERO, || panic!("timer ran after close"));
        window.close();
        window.close();
        assert_eq!(unloads.get(), 1);
        assert_eq!(window.run_animation_frame(), 0);
        window.advance(Duration::from_millis(1));
        assert!(window.is_closed());
    }

    #[test]
    fn test_popup_shares_clock_and_keeps_own_frames() {
        let main = Window::new();
        let popup = main.open("about:popup");
        assert!(popup.opener().unwrap().ptr_eq(&main));
        popup.request_animation_frame(|_| {});
        assert_eq!(main.pending_frames(), 0);
        assert_eq!(popup.pending_frames(), 1);
        main.advance(Duration::from_millis(7));
        assert_eq!(popup.now(), Duration::from_millis(7));
    }
}
