//! Failure isolation: a failed module fails every importer, nothing
//! activates, and the failure is terminal for the loader's lifetime.

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use lattice_core::{LoadError, Loader};
use lattice_engine::{ModuleEngine, TextEngine};
use lattice_providers::{SourceError, SourceFuture, SourceProvider};

use crate::common::{base_key, fixture, key};

#[tokio::test]
async fn missing_dependency_fails_every_importer_without_activation() {
    let fx = fixture(&[
        ("a.js", "import { x } from \"./b.js\";\nexport let a = x;"),
        ("b.js", "import { x } from \"./missing.js\";\nexport let x = x;"),
    ]);

    let err = fx.loader.import("./a.js").await.unwrap_err();
    match err {
        LoadError::NotFound { ref key, .. } => {
            assert_eq!(key, &crate::common::key("missing.js"));
        }
        other => panic!("expected NotFound, got {other:?}"),
    }

    // The intermediate importer rejects with the same originating failure.
    let err = fx.loader.import("./b.js").await.unwrap_err();
    assert!(matches!(err, LoadError::NotFound { .. }));

    // No partial-graph activation: nothing was instantiated or evaluated.
    assert!(fx.evaluated().is_empty());
}

#[tokio::test]
async fn failed_entries_are_terminal_for_the_loader() {
    let fx = fixture(&[("a.js", "import \"./missing.js\";\nexport let a = 1;")]);

    assert!(fx.loader.import("./a.js").await.is_err());
    assert!(fx.loader.import("./a.js").await.is_err());

    // The failure was cached, not retried: one acquisition attempt total.
    assert_eq!(fx.fetches("missing.js"), 1);
    assert_eq!(fx.fetches("a.js"), 1);
}

#[tokio::test]
async fn parse_errors_fail_the_graph() {
    let fx = fixture(&[
        ("a.js", "import \"./bad.js\";\nexport let a = 1;"),
        ("bad.js", "export let = ;"),
    ]);

    let err = fx.loader.import("./a.js").await.unwrap_err();
    assert!(matches!(err, LoadError::Parse { .. }));
    assert!(fx.evaluated().is_empty());
}

#[tokio::test]
async fn evaluation_errors_carry_the_originating_key() {
    let fx = fixture(&[
        ("a.js", "export let x = 1;\nexport let y = x();"),
    ]);

    let err = fx.loader.import("./a.js").await.unwrap_err();
    match err {
        LoadError::Evaluation { ref key, .. } => assert_eq!(key, &crate::common::key("a.js")),
        other => panic!("expected Evaluation, got {other:?}"),
    }
}

#[tokio::test]
async fn unsupported_schemes_reject_at_resolution() {
    let fx = fixture(&[]);
    let err = fx.loader.import("gopher://old/a.js").await.unwrap_err();
    assert!(matches!(err, LoadError::Resolve(_)));
}

/// A provider whose fetches never complete.
struct HangingProvider;

impl SourceProvider for HangingProvider {
    fn fetch(&self, _locator: &Url) -> SourceFuture<'_> {
        Box::pin(std::future::pending())
    }
}

#[tokio::test]
async fn fetch_timeout_fails_the_module_instead_of_hanging() {
    let loader = Loader::builder(
        Arc::new(TextEngine::new()) as Arc<dyn ModuleEngine>,
        Arc::new(HangingProvider),
    )
    .base(base_key())
    .fetch_timeout(Duration::from_millis(25))
    .build()
    .unwrap();

    let err = loader.import("./a.js").await.unwrap_err();
    match err {
        LoadError::NotFound { key: k, source } => {
            assert_eq!(k, key("a.js"));
            assert!(matches!(source, SourceError::TimedOut { .. }));
        }
        other => panic!("expected NotFound/TimedOut, got {other:?}"),
    }
}
