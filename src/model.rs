use core::cmp::Ordering;
use core::fmt;

use crate::runtime::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
    Namespace,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
    pub ns_uri: Option<String>,
}

impl QName {
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
            ns_uri: None,
        }
    }
}

/// A prefix-free name: what variable and function lookups key on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpandedName {
    pub ns_uri: Option<String>,
    pub local: String,
}

impl ExpandedName {
    pub fn new(ns_uri: Option<String>, local: impl Into<String>) -> Self {
        Self {
            ns_uri,
            local: local.into(),
        }
    }

    pub fn local(local: impl Into<String>) -> Self {
        Self::new(None, local)
    }
}

impl fmt::Display for ExpandedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ns_uri {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// The thirteen traversal directions of the query language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    Following,
    PrecedingSibling,
    Preceding,
    Attribute,
    Namespace,
    SelfAxis,
}

impl Axis {
    pub fn as_str(self) -> &'static str {
        match self {
            Axis::Child => "child",
            Axis::Descendant => "descendant",
            Axis::DescendantOrSelf => "descendant-or-self",
            Axis::Parent => "parent",
            Axis::Ancestor => "ancestor",
            Axis::AncestorOrSelf => "ancestor-or-self",
            Axis::FollowingSibling => "following-sibling",
            Axis::Following => "following",
            Axis::PrecedingSibling => "preceding-sibling",
            Axis::Preceding => "preceding",
            Axis::Attribute => "attribute",
            Axis::Namespace => "namespace",
            Axis::SelfAxis => "self",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compare two nodes by ancestry and stable sibling order (fallback algorithm).
///
/// Properties:
/// - If one node is an ancestor of the other, the ancestor precedes the descendant.
/// - Among siblings, attributes come first, then namespace nodes, then children;
///   within each group the order provided by the adapter is preserved.
/// - Nodes from different roots compare `Equal` (the fallback cannot establish a
///   global order; adapters with multi-root trees must override
///   `TreeNode::compare_document_order`, e.g. with `(tree_id, preorder_index)`).
pub fn compare_by_ancestry<N: TreeNode>(a: &N, b: &N) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    fn path_to_root<N: TreeNode>(mut n: N) -> Vec<N> {
        let mut p = vec![n.clone()];
        while let Some(parent) = n.parent() {
            p.push(parent.clone());
            n = parent;
        }
        p.reverse();
        p
    }
    let pa = path_to_root(a.clone());
    let pb = path_to_root(b.clone());
    let mut i = 0usize;
    let len = core::cmp::min(pa.len(), pb.len());
    while i < len && pa[i] == pb[i] {
        i += 1;
    }
    if i == len {
        // One path is a prefix of the other: the shorter path is the ancestor.
        return pa.len().cmp(&pb.len());
    }
    if i == 0 {
        // Different roots: no global order without adapter support.
        return Ordering::Equal;
    }
    let parent = &pa[i - 1];
    let mut sibs: Vec<N> = Vec::new();
    sibs.extend(parent.attributes());
    if let Ok(ns) = parent.namespaces() {
        sibs.extend(ns);
    }
    sibs.extend(parent.children());
    let posa = sibs.iter().position(|n| n == &pa[i]);
    let posb = sibs.iter().position(|n| n == &pb[i]);
    match (posa, posb) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => Ordering::Equal,
    }
}

/// The traversal contract a host document model implements.
///
/// Node values are cheap opaque handles (typically an `Arc` or an index into a
/// shared tree); equality is node identity. The engine never constructs nodes
/// and never mutates the tree.
pub trait TreeNode: Clone + PartialEq + Eq + fmt::Debug {
    fn kind(&self) -> NodeKind;
    fn name(&self) -> Option<QName>;
    fn string_value(&self) -> String;

    fn parent(&self) -> Option<Self>;
    fn children(&self) -> Vec<Self>;
    fn attributes(&self) -> Vec<Self>;

    /// Namespace nodes in scope on this node. Most models have no namespace
    /// node support; the default reports the axis as unsupported, which
    /// callers treat as skippable rather than fatal.
    fn namespaces(&self) -> Result<Vec<Self>, Error> {
        Err(Error::UnsupportedAxis {
            axis: Axis::Namespace,
        })
    }

    /// Default document order comparison uses ancestry and sibling order.
    /// Adapters with a cheap total order should override.
    fn compare_document_order(&self, other: &Self) -> Ordering {
        compare_by_ancestry(self, other)
    }

    /// Members of `axis` from this node, in axis direction: document order for
    /// forward axes, reverse document order (nearest first) for reverse axes.
    fn axis_members(&self, axis: Axis) -> Result<Vec<Self>, Error> {
        match axis {
            Axis::SelfAxis => Ok(vec![self.clone()]),
            Axis::Child => Ok(self.children()),
            Axis::Attribute => Ok(if self.kind() == NodeKind::Element {
                self.attributes()
            } else {
                Vec::new()
            }),
            Axis::Namespace => {
                if self.kind() == NodeKind::Element {
                    self.namespaces()
                } else {
                    Ok(Vec::new())
                }
            }
            Axis::Parent => Ok(self.parent().into_iter().collect()),
            Axis::Descendant => {
                let mut acc = Vec::new();
                collect_descendants(self, &mut acc);
                Ok(acc)
            }
            Axis::DescendantOrSelf => {
                let mut acc = vec![self.clone()];
                collect_descendants(self, &mut acc);
                Ok(acc)
            }
            Axis::Ancestor => {
                let mut acc = Vec::new();
                let mut cur = self.parent();
                while let Some(p) = cur {
                    acc.push(p.clone());
                    cur = p.parent();
                }
                Ok(acc)
            }
            Axis::AncestorOrSelf => {
                let mut acc = vec![self.clone()];
                let mut cur = self.parent();
                while let Some(p) = cur {
                    acc.push(p.clone());
                    cur = p.parent();
                }
                Ok(acc)
            }
            Axis::FollowingSibling => {
                let (sibs, pos) = sibling_position(self);
                Ok(match pos {
                    Some(i) => sibs.into_iter().skip(i + 1).collect(),
                    None => Vec::new(),
                })
            }
            Axis::PrecedingSibling => {
                let (sibs, pos) = sibling_position(self);
                Ok(match pos {
                    Some(i) => sibs.into_iter().take(i).rev().collect(),
                    None => Vec::new(),
                })
            }
            Axis::Following => {
                // Subtrees after this node, nearest ancestor level first; this
                // is exactly document order of everything past the end of the
                // subtree rooted here.
                let mut acc = Vec::new();
                let mut cur = self.clone();
                loop {
                    for sib in cur.axis_members(Axis::FollowingSibling)? {
                        acc.push(sib.clone());
                        collect_descendants(&sib, &mut acc);
                    }
                    match cur.parent() {
                        Some(p) => cur = p,
                        None => break,
                    }
                }
                Ok(acc)
            }
            Axis::Preceding => {
                // Reverse document order: nearest preceding subtree first, each
                // subtree itself reversed; ancestors are excluded by
                // construction.
                let mut acc = Vec::new();
                let mut cur = self.clone();
                loop {
                    for sib in cur.axis_members(Axis::PrecedingSibling)? {
                        let mut sub = vec![sib.clone()];
                        collect_descendants(&sib, &mut sub);
                        sub.reverse();
                        acc.extend(sub);
                    }
                    match cur.parent() {
                        Some(p) => cur = p,
                        None => break,
                    }
                }
                Ok(acc)
            }
        }
    }
}

/// Child-node siblings (via the parent) plus this node's index among them.
/// Attribute and namespace nodes are not children, so they have no siblings.
fn sibling_position<N: TreeNode>(n: &N) -> (Vec<N>, Option<usize>) {
    match n.parent() {
        Some(p) => {
            let sibs = p.children();
            let pos = sibs.iter().position(|s| s == n);
            (sibs, pos)
        }
        None => (Vec::new(), None),
    }
}

/// Follow parents to the top of the tree.
pub fn document_root<N: TreeNode>(mut node: N) -> N {
    while let Some(p) = node.parent() {
        node = p;
    }
    node
}

fn collect_descendants<N: TreeNode>(n: &N, out: &mut Vec<N>) {
    for c in n.children() {
        out.push(c.clone());
        collect_descendants(&c, out);
    }
}
