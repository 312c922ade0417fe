//! Filter-tree normalization and per-dimension grouping.
//!
//! MDX filters one dimension's member set at a time; an OR that spans
//! two dimensions cannot be expressed on a single axis set. The
//! normalization pass therefore splits every multi-dimension OR by
//! duplicating the containing tree once per branch, to a fixed point.
//! The grouping pass then reads off each dimension's AND-only
//! contribution.

use std::collections::BTreeSet;

use super::{FilterNode, Relation};

/// Dimensions named anywhere under a node.
pub fn dimensions_of(node: &FilterNode) -> BTreeSet<&str> {
    let mut dims = BTreeSet::new();
    for leaf in node.leaves() {
        dims.insert(leaf.dimension.as_str());
    }
    dims
}

/// Whether every leaf under `node` names one dimension.
pub fn is_solid(node: &FilterNode) -> bool {
    dimensions_of(node).len() == 1
}

/// Normalize a filter tree into a forest with no OR node spanning more
/// than one dimension.
///
/// Each pass replaces one offending tree with two copies, one per OR
/// branch; every split strictly reduces the multi-dimension OR count of
/// the trees it produces, so the loop reaches a fixed point (bounded by
/// two to the number of OR nodes). Applying `to_forest` to its own
/// output returns it unchanged.
pub fn to_forest(root: FilterNode) -> Vec<FilterNode> {
    let mut forest = vec![root];
    loop {
        let mut changed = false;
        let mut next = Vec::with_capacity(forest.len());
        for tree in forest {
            match split_once(&tree) {
                Some((left, right)) => {
                    next.push(left);
                    next.push(right);
                    changed = true;
                }
                None => next.push(tree),
            }
        }
        forest = next;
        if !changed {
            return forest;
        }
    }
}

/// Rebuild `tree` twice, replacing its first multi-dimension OR node
/// with that node's left and right child respectively.
fn split_once(tree: &FilterNode) -> Option<(FilterNode, FilterNode)> {
    let FilterNode::Branch {
        relation,
        level,
        left,
        right,
    } = tree
    else {
        return None;
    };

    if *relation == Relation::Or && dimensions_of(tree).len() > 1 {
        return Some(((**left).clone(), (**right).clone()));
    }

    if let Some((a, b)) = split_once(left) {
        return Some((
            FilterNode::branch(*relation, *level, a, (**right).clone()),
            FilterNode::branch(*relation, *level, b, (**right).clone()),
        ));
    }
    if let Some((a, b)) = split_once(right) {
        return Some((
            FilterNode::branch(*relation, *level, (**left).clone(), a),
            FilterNode::branch(*relation, *level, (**left).clone(), b),
        ));
    }
    None
}

/// Group a normalized forest into one filter per dimension.
///
/// A subtree belongs wholly to one dimension when every leaf beneath it
/// names that dimension; such maximal subtrees become the dimension's
/// filter. Contributions to the same dimension from different forest
/// trees are combined with AND. Dimensions appear in first-appearance
/// order.
pub fn dimension_filters(forest: &[FilterNode]) -> Vec<(String, FilterNode)> {
    let mut out: Vec<(String, FilterNode)> = Vec::new();
    for tree in forest {
        collect_solid(tree, &mut out);
    }
    out
}

fn collect_solid(node: &FilterNode, out: &mut Vec<(String, FilterNode)>) {
    let dims = dimensions_of(node);
    if dims.len() == 1 {
        let dim = (*dims.iter().next().expect("non-empty")).to_string();
        match out.iter_mut().find(|(d, _)| *d == dim) {
            Some((_, existing)) => {
                let merged =
                    FilterNode::branch(Relation::And, 0, existing.clone(), node.clone());
                *existing = merged;
            }
            None => out.push((dim, node.clone())),
        }
        return;
    }

    if let FilterNode::Branch { left, right, .. } = node {
        collect_solid(left, out);
        collect_solid(right, out);
    }
}
