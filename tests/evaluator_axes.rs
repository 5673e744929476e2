//! Axis semantics over a host adapter that is not the built-in tree: an
//! index-backed arena with its own document-order comparator and no namespace
//! support.

use std::sync::Arc;

use rstest::{fixture, rstest};
use treepath::{
    Axis, ContextBuilder, Error, EvalContext, NodeKind, QName, TreeNode, compile,
};

#[derive(Debug)]
struct Arena {
    nodes: Vec<Record>,
}

#[derive(Debug)]
struct Record {
    kind: NodeKind,
    name: Option<QName>,
    value: String,
    parent: Option<usize>,
    children: Vec<usize>,
    attrs: Vec<usize>,
}

#[derive(Debug, Clone)]
struct Node {
    arena: Arc<Arena>,
    idx: usize,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.arena, &other.arena) && self.idx == other.idx
    }
}
impl Eq for Node {}

impl Node {
    fn at(&self, idx: usize) -> Node {
        Node {
            arena: Arc::clone(&self.arena),
            idx,
        }
    }
}

impl TreeNode for Node {
    fn kind(&self) -> NodeKind {
        self.arena.nodes[self.idx].kind
    }
    fn name(&self) -> Option<QName> {
        self.arena.nodes[self.idx].name.clone()
    }
    fn string_value(&self) -> String {
        self.arena.nodes[self.idx].value.clone()
    }
    fn parent(&self) -> Option<Self> {
        self.arena.nodes[self.idx].parent.map(|i| self.at(i))
    }
    fn children(&self) -> Vec<Self> {
        self.arena.nodes[self.idx]
            .children
            .iter()
            .map(|&i| self.at(i))
            .collect()
    }
    fn attributes(&self) -> Vec<Self> {
        self.arena.nodes[self.idx]
            .attrs
            .iter()
            .map(|&i| self.at(i))
            .collect()
    }
    // No namespaces() override: the namespace axis stays unsupported.
    fn compare_document_order(&self, other: &Self) -> std::cmp::Ordering {
        // Allocation order is preorder in this arena.
        self.idx.cmp(&other.idx)
    }
}

fn el(arena: &mut Arena, parent: Option<usize>, local: &str) -> usize {
    let idx = arena.nodes.len();
    arena.nodes.push(Record {
        kind: NodeKind::Element,
        name: Some(QName::local(local)),
        value: String::new(),
        parent,
        children: Vec::new(),
        attrs: Vec::new(),
    });
    if let Some(p) = parent {
        arena.nodes[p].children.push(idx);
    }
    idx
}

/// root > (a > (b, c), d)
#[fixture]
fn tree() -> Node {
    let mut arena = Arena { nodes: Vec::new() };
    let root = el(&mut arena, None, "root");
    let a = el(&mut arena, Some(root), "a");
    let _b = el(&mut arena, Some(a), "b");
    let _c = el(&mut arena, Some(a), "c");
    let _d = el(&mut arena, Some(root), "d");
    Node {
        arena: Arc::new(arena),
        idx: 0,
    }
}

fn ctx(node: Node) -> EvalContext<Node> {
    ContextBuilder::new().with_node(node).build()
}

fn names(nodes: &[Node]) -> Vec<String> {
    nodes
        .iter()
        .map(|n| n.name().map(|q| q.local).unwrap_or_default())
        .collect()
}

#[rstest]
#[case("descendant::*", &["a", "b", "c", "d"])]
#[case("descendant-or-self::*", &["root", "a", "b", "c", "d"])]
#[case("child::*", &["a", "d"])]
#[case("//c/ancestor::*", &["root", "a"])]
#[case("//c/ancestor-or-self::*", &["root", "a", "c"])]
#[case("//b/following::*", &["c", "d"])]
#[case("//c/preceding::*", &["b"])]
#[case("//c/preceding-sibling::*", &["b"])]
#[case("//b/following-sibling::*", &["c"])]
#[case("//d/preceding::*", &["a", "b", "c"])]
#[case("//c/self::*", &["c"])]
#[case("//b/parent::*", &["a"])]
fn axis_members_in_document_order(tree: Node, #[case] expr: &str, #[case] expected: &[&str]) {
    let got = compile(expr).unwrap().select_nodes(&ctx(tree)).unwrap();
    assert_eq!(names(&got), expected, "{expr}");
}

#[rstest]
fn unsupported_axis_is_typed_and_skippable(tree: Node) {
    // A harness policy: run many cases, skip the ones the model cannot
    // realize, fail on everything else.
    let cases = ["self::*", "namespace::*", "child::*"];
    let mut evaluated = 0;
    let mut skipped = 0;
    for case in cases {
        match compile(case).unwrap().evaluate(&ctx(tree.clone())) {
            Ok(_) => evaluated += 1,
            Err(Error::UnsupportedAxis { axis }) => {
                assert_eq!(axis, Axis::Namespace);
                skipped += 1;
            }
            Err(other) => panic!("unexpected error for {case}: {other}"),
        }
    }
    assert_eq!((evaluated, skipped), (2, 1));
}

#[rstest]
fn ancestors_of_root_are_empty(tree: Node) {
    let got = compile("ancestor::*").unwrap().select_nodes(&ctx(tree)).unwrap();
    assert!(got.is_empty());
}
