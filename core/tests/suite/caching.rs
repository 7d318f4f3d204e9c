//! Idempotent caching and single-flight deduplication.

use lattice_types::Value;

use crate::common::{fixture, key};

#[tokio::test]
async fn repeated_import_loads_each_module_once() {
    let fx = fixture(&[
        ("a.js", "import { f } from \"./b.js\";\nexport let two = f();"),
        ("b.js", "export let f = fn() => 2;"),
    ]);

    let first = fx.loader.import("./a.js").await.unwrap();
    let second = fx.loader.import("./a.js").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(fx.fetches("a.js"), 1);
    assert_eq!(fx.fetches("b.js"), 1);
}

#[tokio::test]
async fn importing_a_dependency_directly_reuses_its_entry() {
    let fx = fixture(&[
        ("a.js", "import { f } from \"./b.js\";\nexport let two = f();"),
        ("b.js", "export let f = fn() => 2;"),
    ]);

    fx.loader.import("./a.js").await.unwrap();
    let b = fx.loader.import("./b.js").await.unwrap();

    assert_eq!(b.key(), &key("b.js"));
    assert_eq!(fx.fetches("b.js"), 1);
}

#[tokio::test]
async fn overlapping_imports_share_one_creation() {
    let fx = fixture(&[("a.js", "export let x = 1;")]);

    // Both imports are in flight before either completes; the second must
    // observe the first's registered entry rather than creating its own.
    let (first, second) = tokio::join!(fx.loader.import("./a.js"), fx.loader.import("./a.js"));

    assert_eq!(first.unwrap(), second.unwrap());
    assert_eq!(fx.fetches("a.js"), 1);
}

#[tokio::test]
async fn overlapping_imports_wait_for_dependencies_found_mid_flight() {
    let fx = fixture(&[
        ("a.js", "import { f } from \"./b.js\";\nexport let two = f();"),
        ("b.js", "export let f = fn() => 2;"),
    ]);

    // The second import joins a.js while its creation is still in flight, so
    // b.js is discovered by the first import's load. Both must nonetheless
    // wait for the whole graph before activating.
    let (first, second) = tokio::join!(fx.loader.import("./a.js"), fx.loader.import("./a.js"));

    let first = first.unwrap();
    assert_eq!(first, second.unwrap());
    assert_eq!(
        first.namespace().get("two").and_then(Value::as_int),
        Some(2)
    );
    assert_eq!(fx.evaluated(), vec![key("b.js"), key("a.js")]);

    // The overlap must not leave a.js poisoned for later imports.
    let later = fx.loader.import("./a.js").await.unwrap();
    assert_eq!(later, first);
    assert_eq!(fx.fetches("a.js"), 1);
    assert_eq!(fx.fetches("b.js"), 1);
}

#[tokio::test]
async fn each_module_body_runs_exactly_once_across_imports() {
    let fx = fixture(&[
        ("a.js", "import \"./b.js\";\nexport let a = 1;"),
        ("b.js", "export let b = 1;"),
    ]);

    fx.loader.import("./a.js").await.unwrap();
    fx.loader.import("./a.js").await.unwrap();
    fx.loader.import("./b.js").await.unwrap();

    assert_eq!(fx.evaluated(), vec![key("b.js"), key("a.js")]);
}

#[tokio::test]
async fn spelling_variants_of_one_module_share_identity() {
    let fx = fixture(&[
        ("a.js", "import \"./sub/../b.js\";\nexport let a = 1;"),
        ("b.js", "export let b = 1;"),
    ]);

    fx.loader.import("./a.js").await.unwrap();
    fx.loader.import("./b.js").await.unwrap();

    assert_eq!(fx.fetches("b.js"), 1);
}
