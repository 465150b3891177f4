//! Async mounters on a Tokio `LocalSet`.
#![cfg(feature = "tokio")]

mod common;

use bindery::{TokioLocalSpawner, Window, create_async_mounter};
use common::{Fixture, bare};
use std::{rc::Rc, time::Duration};

#[tokio::test]
async fn test_async_mounter_runs_on_local_set() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let window = Window::builder()
                .spawner(Rc::new(TokioLocalSpawner))
                .build();
            let fx = Fixture::with_window(window);
            let load = create_async_mounter("tokio:load", |element, args| async move {
                tokio::time::sleep(Duration::from_millis(1)).await;
                element.set_attribute("data-loaded", &args.join(" "));
            });
            fx.register(&[&load]);
            let node = fx.element("section", &[common::with_args(&load, &["from", "storage"])]);
            let unloaded = fx.element("section", &[bare(&load)]);

            let report = fx.sweep();
            assert_eq!(report.mounted, 2);
            // The sweep returns before the tasks finish.
            assert!(!fx.doc().has_attribute(node, "data-loaded"));

            tokio::time::sleep(Duration::from_millis(20)).await;
            assert_eq!(
                fx.doc().get_attribute(node, "data-loaded").as_deref(),
                Some("from storage")
            );
            assert_eq!(fx.doc().get_attribute(unloaded, "data-loaded").as_deref(), Some(""));
        })
        .await;
}
