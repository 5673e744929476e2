//! Ordering and uniqueness of node-sets.
//!
//! Every node-set the engine hands out is deduplicated by node identity and
//! sorted in document order. Both passes are stable, so the whole operation
//! is idempotent and never grows the distinct-node count.

use crate::model::TreeNode;

/// Deduplicate by identity (first occurrence wins), then stable-sort into
/// document order using the model's comparator.
pub fn sort_document_order<N: TreeNode>(nodes: Vec<N>) -> Vec<N> {
    let mut unique: Vec<N> = Vec::with_capacity(nodes.len());
    for n in nodes {
        if !unique.contains(&n) {
            unique.push(n);
        }
    }
    unique.sort_by(|a, b| a.compare_document_order(b));
    unique
}

/// Merge two already-normalized node-sets into one normalized set.
pub fn union<N: TreeNode>(mut left: Vec<N>, right: Vec<N>) -> Vec<N> {
    left.extend(right);
    sort_document_order(left)
}
