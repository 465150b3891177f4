//! Application startup.
//!
//! A [`Bootstrap`] carries the runtime [`Config`] and the registry callbacks
//! are loaded into. With `defer-load-callbacks` on the page URL (debug builds
//! only) bulk loads are held back until [`Bootstrap::release_deferred`], so
//! the server-rendered page can be inspected before any callback runs.
//!
//! ```rust,ignore
//! let window = Window::builder().url(page_url).document(parsed).build();
//! let bootstrap = Bootstrap::from_window(&window);
//! bootstrap.load(&[&bindery::presets::callbacks(), &my_feature::callbacks()]);
//! bootstrap.mount_root(&window, "app")?;
//! ```

use bindery_core::{BinderyError, Callback, CallbackSource, Window};
use bindery_std::{
    config::{self, Config},
    documents,
    loader::{LoadReport, load_callbacks_into},
    processor::Processor,
    registry::Registry,
    scheduler,
};
use std::{cell::RefCell, sync::Arc};

/// Startup state for one application.
#[derive(Debug)]
pub struct Bootstrap {
    config: Arc<Config>,
    registry: Arc<Registry>,
    deferred: RefCell<Vec<Callback>>,
}

impl Bootstrap {
    /// Use `config` and the global registry.
    pub fn new(config: Config) -> Self {
        Self::with_registry(config, Registry::global().clone())
    }

    /// Use `config` and a specific registry.
    pub fn with_registry(config: Config, registry: Arc<Registry>) -> Self {
        Self {
            config: Arc::new(config),
            registry,
            deferred: RefCell::new(Vec::new()),
        }
    }

    /// Read the configuration from the query string of `window`'s URL.
    pub fn from_window(window: &Window) -> Self {
        let query = url::Url::parse(window.url())
            .ok()
            .and_then(|url| url.query().map(str::to_owned))
            .unwrap_or_default();
        Self::new(Config::from_query(&query))
    }

    /// The configuration in use.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The registry callbacks are loaded into.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Make this configuration the process-wide one, so preset callbacks see
    /// the same hidden class as the processor.
    pub fn install_config(&self) {
        config::set_global(Config::clone(&self.config));
    }

    /// A processor bound to this bootstrap's registry and configuration.
    pub fn processor(&self) -> Processor {
        Processor::with_registry(self.registry.clone()).with_config(Config::clone(&self.config))
    }

    /// Load callbacks, or hold them back while loading is deferred.
    pub fn load(&self, sources: &[&dyn CallbackSource]) -> LoadReport {
        if self.config.defer_load_callbacks {
            let mut deferred = self.deferred.borrow_mut();
            for source in sources {
                deferred.extend(source.callbacks());
            }
            tracing::info!(pending = deferred.len(), "callback loading deferred");
            return LoadReport::default();
        }
        let report = load_callbacks_into(&self.registry, sources);
        if self.config.debug {
            tracing::info!(ids = ?self.registry.ids(), ?report, "callbacks loaded");
        }
        report
    }

    /// Callbacks held back so far.
    pub fn pending(&self) -> usize {
        self.deferred.borrow().len()
    }

    /// Load everything held back by [`Bootstrap::load`], then schedule a
    /// sweep of every active document so the markup comes alive.
    pub fn release_deferred(&self) -> LoadReport {
        let deferred = std::mem::take(&mut *self.deferred.borrow_mut());
        let report = load_callbacks_into(&self.registry, &[&deferred]);
        if report.registered > 0 {
            for window in documents::active_documents() {
                scheduler::schedule_process_root_with(&window, self.processor());
            }
        }
        report
    }

    /// [`mount_root`] with this bootstrap's processor.
    pub fn mount_root(&self, window: &Window, root_id: &str) -> Result<(), BinderyError> {
        find_root(window, root_id)?;
        scheduler::schedule_process_root_with(window, self.processor());
        Ok(())
    }
}

impl Default for Bootstrap {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

/// Render-root lifecycle hook: call once the root container `#root_id` is in
/// `window`'s document. Schedules a sweep with the global registry.
///
/// A missing root is the one error an application should surface.
pub fn mount_root(window: &Window, root_id: &str) -> Result<(), BinderyError> {
    find_root(window, root_id)?;
    scheduler::schedule_process_root(window);
    Ok(())
}

fn find_root(window: &Window, root_id: &str) -> Result<(), BinderyError> {
    match window.document().get_element_by_id(root_id) {
        Some(_) => Ok(()),
        None => Err(BinderyError::MissingRoot(root_id.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_std::scheduler::{SchedulerState, scheduler_state};

    fn isolated(config: Config) -> Bootstrap {
        Bootstrap::with_registry(config, Arc::new(Registry::new()))
    }

    #[test]
    fn test_deferred_loading() {
        let bootstrap = isolated(Config {
            defer_load_callbacks: true,
            ..Config::default()
        });
        let callback = Callback::mount("boot:a", |_, _| ());
        assert_eq!(bootstrap.load(&[&callback]), LoadReport::default());
        assert_eq!(bootstrap.pending(), 1);
        assert!(!bootstrap.registry().contains("boot:a"));

        let report = bootstrap.release_deferred();
        assert_eq!(report.registered, 1);
        assert_eq!(bootstrap.pending(), 0);
        assert!(bootstrap.registry().contains("boot:a"));
    }

    #[test]
    fn test_release_schedules_active_documents() {
        let bootstrap = isolated(Config {
            defer_load_callbacks: true,
            ..Config::default()
        });
        let window = Window::new();
        let doc = window.document();
        let root = doc.create_element("main");
        doc.set_attribute(root, "id", "app");
        doc.append_child(doc.body().unwrap(), root).unwrap();
        bootstrap.mount_root(&window, "app").unwrap();
        window.run_animation_frame();
        assert_eq!(scheduler_state(&window), SchedulerState::Idle);

        bootstrap.load(&[&Callback::mount("boot:late", |_, _| ())]);
        assert_eq!(scheduler_state(&window), SchedulerState::Idle);
        bootstrap.release_deferred();
        assert_eq!(scheduler_state(&window), SchedulerState::Scheduled);

        // Nothing new to load: no extra sweep.
        window.run_animation_frame();
        bootstrap.release_deferred();
        assert_eq!(scheduler_state(&window), SchedulerState::Idle);
    }

    #[test]
    fn test_immediate_loading() {
        let bootstrap = isolated(Config::default());
        let report = bootstrap.load(&[&Callback::mount("boot:b", |_, _| ())]);
        assert_eq!(report.registered, 1);
        assert_eq!(bootstrap.pending(), 0);
    }

    #[test]
    fn test_mount_root_requires_container() {
        let window = Window::new();
        let bootstrap = isolated(Config::default());
        let err = bootstrap.mount_root(&window, "app").unwrap_err();
        assert!(matches!(err, BinderyError::MissingRoot(ref id) if id == "app"));
        assert_eq!(scheduler_state(&window), SchedulerState::Idle);

        let doc = window.document();
        let root = doc.create_element("main");
        doc.set_attribute(root, "id", "app");
        doc.append_child(doc.body().unwrap(), root).unwrap();
        bootstrap.mount_root(&window, "app").unwrap();
        assert_eq!(scheduler_state(&window), SchedulerState::Scheduled);
    }

    #[test]
    fn test_config_from_window_url() {
        let window = Window::builder()
            .url("https://example.test/page?bindery-debug=1&bindery-hidden-class=gone")
            .build();
        let bootstrap = Bootstrap::from_window(&window);
        assert!(bootstrap.config().debug);
        assert_eq!(bootstrap.config().hidden_class, "gone");
    }
}
