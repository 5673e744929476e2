//! Simple in-memory tree implementing [`TreeNode`], used by tests, docs and
//! quick prototypes.
//!
//! Focus:
//! - Ergonomic builder for quick test tree creation
//! - Node identity via `Arc` pointer equality
//! - Namespace-node support, so the namespace axis works out of the box
//!
//! Example:
//! ```
//! use treepath::simple_node::{attr, elem, text};
//! use treepath::TreeNode;
//!
//! // <root id="r"><child>Hello</child><child/></root>
//! let root = elem("root")
//!     .attr(attr("id", "r"))
//!     .child(elem("child").child(text("Hello")))
//!     .child(elem("child"))
//!     .build();
//!
//! assert_eq!(root.name().unwrap().local, "root");
//! assert_eq!(root.children().len(), 2);
//! assert_eq!(root.string_value(), "Hello");
//! ```

use std::fmt;
use std::sync::{Arc, RwLock, Weak};

use crate::model::{NodeKind, QName, TreeNode};
use crate::runtime::Error;

#[derive(Debug)]
struct Inner {
    kind: NodeKind,
    name: Option<QName>,
    value: Option<String>, // text / attribute / comment / PI / namespace content
    parent: RwLock<Option<Weak<Inner>>>,
    attributes: RwLock<Vec<SimpleNode>>,
    namespaces: RwLock<Vec<SimpleNode>>,
    children: RwLock<Vec<SimpleNode>>,
}

/// An `Arc`-backed node; clones share identity.
#[derive(Clone)]
pub struct SimpleNode(Arc<Inner>);

impl PartialEq for SimpleNode {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for SimpleNode {}

impl fmt::Debug for SimpleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleNode")
            .field("kind", &self.0.kind)
            .field("name", &self.0.name)
            .field("value", &self.0.value)
            .finish()
    }
}

impl SimpleNode {
    fn new(kind: NodeKind, name: Option<QName>, value: Option<String>) -> Self {
        SimpleNode(Arc::new(Inner {
            kind,
            name,
            value,
            parent: RwLock::new(None),
            attributes: RwLock::new(Vec::new()),
            namespaces: RwLock::new(Vec::new()),
            children: RwLock::new(Vec::new()),
        }))
    }

    pub fn document() -> SimpleNodeBuilder {
        SimpleNodeBuilder::new(NodeKind::Document, None, None)
    }

    pub fn element(name: &str) -> SimpleNodeBuilder {
        SimpleNodeBuilder::new(NodeKind::Element, Some(QName::local(name)), None)
    }

    /// Element in a namespace, e.g. `<b:book xmlns:b="urn:books">`.
    pub fn namespaced_element(prefix: &str, name: &str, uri: &str) -> SimpleNodeBuilder {
        SimpleNodeBuilder::new(
            NodeKind::Element,
            Some(QName {
                prefix: Some(prefix.to_string()),
                local: name.to_string(),
                ns_uri: Some(uri.to_string()),
            }),
            None,
        )
    }

    pub fn attribute(name: &str, value: &str) -> SimpleNode {
        SimpleNode::new(
            NodeKind::Attribute,
            Some(QName::local(name)),
            Some(value.to_string()),
        )
    }

    /// Attribute with a namespace prefix, e.g. `xml:lang`.
    pub fn prefixed_attribute(prefix: &str, name: &str, value: &str) -> SimpleNode {
        SimpleNode::new(
            NodeKind::Attribute,
            Some(QName {
                prefix: Some(prefix.to_string()),
                local: name.to_string(),
                ns_uri: None,
            }),
            Some(value.to_string()),
        )
    }

    pub fn text(value: &str) -> SimpleNode {
        SimpleNode::new(NodeKind::Text, None, Some(value.to_string()))
    }

    pub fn comment(value: &str) -> SimpleNode {
        SimpleNode::new(NodeKind::Comment, None, Some(value.to_string()))
    }

    pub fn pi(target: &str, data: &str) -> SimpleNode {
        SimpleNode::new(
            NodeKind::ProcessingInstruction,
            Some(QName::local(target)),
            Some(data.to_string()),
        )
    }

    pub fn namespace(prefix: &str, uri: &str) -> SimpleNode {
        SimpleNode::new(
            NodeKind::Namespace,
            Some(QName {
                prefix: Some(prefix.to_string()),
                local: prefix.to_string(),
                ns_uri: Some(uri.to_string()),
            }),
            Some(uri.to_string()),
        )
    }
}

pub struct SimpleNodeBuilder {
    node: SimpleNode,
    pending_children: Vec<SimpleNode>,
    pending_attrs: Vec<SimpleNode>,
    pending_ns: Vec<SimpleNode>,
}

impl SimpleNodeBuilder {
    fn new(kind: NodeKind, name: Option<QName>, value: Option<String>) -> Self {
        Self {
            node: SimpleNode::new(kind, name, value),
            pending_children: Vec::new(),
            pending_attrs: Vec::new(),
            pending_ns: Vec::new(),
        }
    }

    pub fn child(mut self, child: impl Into<SimpleNodeOrBuilder>) -> Self {
        self.pending_children.push(child.into().build());
        self
    }

    pub fn attr(mut self, attr: SimpleNode) -> Self {
        debug_assert!(attr.kind() == NodeKind::Attribute);
        self.pending_attrs.push(attr);
        self
    }

    pub fn namespace(mut self, ns: SimpleNode) -> Self {
        debug_assert!(ns.kind() == NodeKind::Namespace);
        self.pending_ns.push(ns);
        self
    }

    pub fn build(self) -> SimpleNode {
        let down = Arc::downgrade(&self.node.0);
        {
            let mut attrs = self.node.0.attributes.write().expect("no poisoned lock");
            for a in &self.pending_attrs {
                *a.0.parent.write().expect("no poisoned lock") = Some(down.clone());
            }
            attrs.extend(self.pending_attrs);
        }
        {
            let mut nss = self.node.0.namespaces.write().expect("no poisoned lock");
            for n in &self.pending_ns {
                *n.0.parent.write().expect("no poisoned lock") = Some(down.clone());
            }
            nss.extend(self.pending_ns);
        }
        {
            let mut ch = self.node.0.children.write().expect("no poisoned lock");
            for c in &self.pending_children {
                *c.0.parent.write().expect("no poisoned lock") = Some(down.clone());
            }
            ch.extend(self.pending_children);
        }
        self.node
    }
}

pub enum SimpleNodeOrBuilder {
    Built(SimpleNode),
    Builder(SimpleNodeBuilder),
}

impl SimpleNodeOrBuilder {
    fn build(self) -> SimpleNode {
        match self {
            SimpleNodeOrBuilder::Built(n) => n,
            SimpleNodeOrBuilder::Builder(b) => b.build(),
        }
    }
}

impl From<SimpleNode> for SimpleNodeOrBuilder {
    fn from(n: SimpleNode) -> Self {
        SimpleNodeOrBuilder::Built(n)
    }
}

impl From<SimpleNodeBuilder> for SimpleNodeOrBuilder {
    fn from(b: SimpleNodeBuilder) -> Self {
        SimpleNodeOrBuilder::Builder(b)
    }
}

// Convenience helpers for concise test code
pub fn doc() -> SimpleNodeBuilder {
    SimpleNode::document()
}
pub fn elem(name: &str) -> SimpleNodeBuilder {
    SimpleNode::element(name)
}
pub fn elem_ns(prefix: &str, name: &str, uri: &str) -> SimpleNodeBuilder {
    SimpleNode::namespaced_element(prefix, name, uri)
}
pub fn text(v: &str) -> SimpleNode {
    SimpleNode::text(v)
}
pub fn attr(name: &str, v: &str) -> SimpleNode {
    SimpleNode::attribute(name, v)
}
pub fn comment(v: &str) -> SimpleNode {
    SimpleNode::comment(v)
}
pub fn pi(target: &str, data: &str) -> SimpleNode {
    SimpleNode::pi(target, data)
}
pub fn ns(prefix: &str, uri: &str) -> SimpleNode {
    SimpleNode::namespace(prefix, uri)
}

impl TreeNode for SimpleNode {
    fn kind(&self) -> NodeKind {
        self.0.kind
    }

    fn name(&self) -> Option<QName> {
        self.0.name.clone()
    }

    fn string_value(&self) -> String {
        match self.0.kind {
            NodeKind::Element | NodeKind::Document => {
                fn walk(n: &SimpleNode, out: &mut String) {
                    if n.0.kind == NodeKind::Text {
                        if let Some(v) = &n.0.value {
                            out.push_str(v);
                        }
                    }
                    for c in n.children() {
                        walk(&c, out);
                    }
                }
                let mut out = String::new();
                walk(self, &mut out);
                out
            }
            _ => self.0.value.clone().unwrap_or_default(),
        }
    }

    fn parent(&self) -> Option<Self> {
        self.0
            .parent
            .read()
            .ok()?
            .as_ref()
            .and_then(Weak::upgrade)
            .map(SimpleNode)
    }

    fn children(&self) -> Vec<Self> {
        self.0
            .children
            .read()
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    fn attributes(&self) -> Vec<Self> {
        self.0
            .attributes
            .read()
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    fn namespaces(&self) -> Result<Vec<Self>, Error> {
        Ok(self
            .0
            .namespaces
            .read()
            .map(|v| v.clone())
            .unwrap_or_default())
    }
}
