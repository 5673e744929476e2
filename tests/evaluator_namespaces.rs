use rstest::{fixture, rstest};
use treepath::simple_node::{doc, elem, elem_ns, ns, text};
use treepath::{ContextBuilder, Error, EvalContext, NodeKind, SimpleNode, TreeNode, compile};

/// Two `item` elements in different namespaces plus one in none.
#[fixture]
fn mixed() -> SimpleNode {
    doc()
        .child(
            elem("root")
                .namespace(ns("a", "urn:alpha"))
                .child(elem_ns("a", "item", "urn:alpha").child(text("first")))
                .child(elem_ns("b", "item", "urn:beta").child(text("second")))
                .child(elem("item").child(text("plain"))),
        )
        .build()
}

fn ctx_with_bindings(node: SimpleNode) -> EvalContext<SimpleNode> {
    ContextBuilder::new()
        .with_node(node)
        .with_namespace("x", "urn:alpha")
        .with_namespace("y", "urn:beta")
        .build()
}

#[rstest]
fn prefixed_name_test_matches_by_uri(mixed: SimpleNode) {
    let ctx = ctx_with_bindings(mixed);
    let alpha = compile("/root/x:item").unwrap().select_nodes(&ctx).unwrap();
    assert_eq!(alpha.len(), 1);
    assert_eq!(alpha[0].string_value(), "first");
    let beta = compile("/root/y:item").unwrap().select_nodes(&ctx).unwrap();
    assert_eq!(beta[0].string_value(), "second");
}

#[rstest]
fn unprefixed_name_test_matches_no_namespace(mixed: SimpleNode) {
    let ctx = ctx_with_bindings(mixed);
    let plain = compile("/root/item").unwrap().select_nodes(&ctx).unwrap();
    assert_eq!(plain.len(), 1);
    assert_eq!(plain[0].string_value(), "plain");
}

#[rstest]
fn prefixed_wildcard_selects_whole_namespace(mixed: SimpleNode) {
    let ctx = ctx_with_bindings(mixed);
    let alpha = compile("/root/x:*").unwrap().select_nodes(&ctx).unwrap();
    assert_eq!(alpha.len(), 1);
    assert_eq!(alpha[0].string_value(), "first");
}

#[rstest]
fn unbound_prefix_is_an_evaluation_error(mixed: SimpleNode) {
    let ctx = ctx_with_bindings(mixed);
    let err = compile("/root/zz:item").unwrap().evaluate(&ctx).unwrap_err();
    assert!(matches!(err, Error::Evaluation(_)), "unexpected: {err:?}");
}

#[rstest]
fn namespace_axis_yields_namespace_nodes(mixed: SimpleNode) {
    let ctx = ctx_with_bindings(mixed.clone());
    let root = compile("/root").unwrap().select_nodes(&ctx).unwrap()[0].clone();
    let nodes = compile("namespace::*")
        .unwrap()
        .select_nodes(&ContextBuilder::new().with_node(root).build())
        .unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].kind(), NodeKind::Namespace);
    assert_eq!(nodes[0].string_value(), "urn:alpha");
}
