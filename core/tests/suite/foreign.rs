//! Foreign-module adapter: legacy synchronous values wrapped as synthetic
//! single-default-export modules, required at most once per locator.

use std::sync::Arc;

use lattice_types::{ModuleKey, Value};

use crate::common::{TestForeign, fixture_with_foreign, key};

fn adapter() -> Arc<TestForeign> {
    Arc::new(
        TestForeign::new()
            .with_module("util", "/lib/util.js", Value::Int(7))
            .with_alias("./util", "/lib/util.js"),
    )
}

#[tokio::test]
async fn foreign_value_appears_as_default_export() {
    let foreign = adapter();
    let fx = fixture_with_foreign(
        &[(
            "a.js",
            "import util from \"legacy://util\";\nexport let v = util;",
        )],
        Arc::clone(&foreign) as Arc<dyn lattice_core::ForeignLoader>,
    );

    let activated = fx.loader.import("./a.js").await.unwrap();
    assert_eq!(activated.namespace().get("v").and_then(|v| v.as_int()), Some(7));
    assert_eq!(foreign.require_count("/lib/util.js"), 1);
}

#[tokio::test]
async fn repeated_foreign_imports_require_once() {
    let foreign = adapter();
    let fx = fixture_with_foreign(
        &[
            (
                "a.js",
                "import util from \"legacy://util\";\nexport let a = util;",
            ),
            (
                "b.js",
                "import util from \"legacy://util\";\nexport let b = util;",
            ),
        ],
        Arc::clone(&foreign) as Arc<dyn lattice_core::ForeignLoader>,
    );

    fx.loader.import("./a.js").await.unwrap();
    fx.loader.import("./b.js").await.unwrap();
    let direct = fx.loader.import("legacy://util").await.unwrap();

    assert_eq!(direct.key(), &ModuleKey::parse("legacy:///lib/util.js").unwrap());
    assert_eq!(
        direct.namespace().get("default").and_then(|v| v.as_int()),
        Some(7)
    );
    assert_eq!(foreign.require_count("/lib/util.js"), 1);
}

#[tokio::test]
async fn request_spellings_converge_on_one_foreign_module() {
    let foreign = adapter();
    let fx = fixture_with_foreign(
        &[],
        Arc::clone(&foreign) as Arc<dyn lattice_core::ForeignLoader>,
    );

    let a = fx.loader.import("legacy://util").await.unwrap();
    let b = fx.loader.import("legacy://./util").await.unwrap();

    assert_eq!(a.key(), b.key());
    assert_eq!(foreign.require_count("/lib/util.js"), 1);
}

#[tokio::test]
async fn unknown_foreign_requests_fail_resolution() {
    let foreign = adapter();
    let fx = fixture_with_foreign(
        &[],
        Arc::clone(&foreign) as Arc<dyn lattice_core::ForeignLoader>,
    );

    let err = fx.loader.import("legacy://nope").await.unwrap_err();
    assert!(matches!(err, lattice_core::LoadError::Resolve(_)));
}

#[tokio::test]
async fn foreign_caller_supplies_its_own_referrer() {
    let foreign = adapter();
    let fx = fixture_with_foreign(
        &[("sub/m.js", "export let ok = 1;")],
        Arc::clone(&foreign) as Arc<dyn lattice_core::ForeignLoader>,
    );

    // A foreign caller imports through the loader with its own identity;
    // relative resolution happens against that identity, not the base.
    let referrer = key("sub/host.js");
    let activated = fx.loader.import_from("./m.js", &referrer).await.unwrap();

    assert_eq!(activated.key(), &key("sub/m.js"));
    assert_eq!(activated.namespace().get("ok").and_then(|v| v.as_int()), Some(1));
}
