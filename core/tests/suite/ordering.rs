//! Activation ordering: every dependency's body completes before its
//! dependents', and nothing evaluates until the whole graph is linked.

use crate::common::{fixture, key};

#[tokio::test]
async fn linear_chain_evaluates_leaf_first() {
    let fx = fixture(&[
        ("a.js", "import { g } from \"./b.js\";\nexport let result = g();"),
        ("b.js", "import { f } from \"./c.js\";\nexport let g = f;"),
        ("c.js", "export let f = fn() => 2;"),
    ]);

    let activated = fx.loader.import("./a.js").await.unwrap();

    assert_eq!(
        activated.namespace().get("result").and_then(|v| v.as_int()),
        Some(2)
    );
    assert_eq!(
        fx.evaluated(),
        vec![key("c.js"), key("b.js"), key("a.js")],
        "chain must evaluate deepest dependency first"
    );
}

#[tokio::test]
async fn diamond_shares_the_common_leaf() {
    let fx = fixture(&[
        ("a.js", "import \"./b.js\";\nimport \"./c.js\";\nexport let a = 1;"),
        ("b.js", "import \"./d.js\";\nexport let b = 1;"),
        ("c.js", "import \"./d.js\";\nexport let c = 1;"),
        ("d.js", "export let d = 1;"),
    ]);

    fx.loader.import("./a.js").await.unwrap();

    let evaluated = fx.evaluated();
    assert_eq!(fx.fetches("d.js"), 1);
    assert_eq!(evaluated.iter().filter(|k| **k == key("d.js")).count(), 1);
    // d precedes both of its dependents; a is last.
    let pos = |name: &str| evaluated.iter().position(|k| *k == key(name)).unwrap();
    assert!(pos("d.js") < pos("b.js"));
    assert!(pos("d.js") < pos("c.js"));
    assert_eq!(pos("a.js"), evaluated.len() - 1);
}

#[tokio::test]
async fn deep_chain_is_fully_linked_before_any_evaluation() {
    // Five-deep chain: if activation started before the fixed-point wait
    // finished discovering e.js, the head's transitive call would fail.
    let fx = fixture(&[
        ("a.js", "import { f } from \"./b.js\";\nexport let r = f();"),
        ("b.js", "import { f } from \"./c.js\";\nexport let f = f;"),
        ("c.js", "import { f } from \"./d.js\";\nexport let f = f;"),
        ("d.js", "import { f } from \"./e.js\";\nexport let f = f;"),
        ("e.js", "export let f = fn() => 2;"),
    ]);

    let activated = fx.loader.import("./a.js").await.unwrap();

    assert_eq!(activated.namespace().get("r").and_then(|v| v.as_int()), Some(2));
    assert_eq!(
        fx.evaluated(),
        vec![key("e.js"), key("d.js"), key("c.js"), key("b.js"), key("a.js")]
    );
}
