//! Generic boolean filters over cube dimensions.
//!
//! The report layer hands this module a flat, precedence-annotated list
//! of comparisons and AND/OR junctions ([`FilterItem`]). The list is
//! compiled into a binary tree ([`compile::build_filter_tree`]), the
//! tree is normalized into a forest with no OR spanning more than one
//! dimension ([`normalize::to_forest`]), and the forest is grouped into
//! one AND-only filter per dimension ([`normalize::dimension_filters`])
//! for the MDX compiler to consume.

pub mod compile;
pub mod normalize;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use compile::build_filter_tree;
pub use normalize::{dimension_filters, to_forest};

/// Junction relation between two filter subtrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    And,
    Or,
}

/// Comparison operator of a filter leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Pattern match with `%` wildcards.
    Like,
    /// Membership in the value list.
    In,
}

/// One comparison against a dimension level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterLeaf {
    /// Dimension identifier (hierarchy unique name when scoped).
    pub dimension: String,
    pub level_unique_name: String,
    pub level_number: i32,
    pub op: CompareOp,
    pub values: Vec<String>,
    /// Nesting depth assigned by the condition-list UI.
    pub level: i32,
}

impl FilterLeaf {
    pub fn new(
        dimension: impl Into<String>,
        level_unique_name: impl Into<String>,
        level_number: i32,
        op: CompareOp,
        values: Vec<String>,
    ) -> Self {
        Self {
            dimension: dimension.into(),
            level_unique_name: level_unique_name.into(),
            level_number,
            op,
            values,
            level: 0,
        }
    }

    /// Same leaf at a given nesting depth.
    pub fn at_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    /// Evaluate this comparison against one row value.
    pub fn matches(&self, value: &str) -> bool {
        let target = self.values.first().map(String::as_str).unwrap_or("");
        match self.op {
            CompareOp::Eq => compare(value, target) == std::cmp::Ordering::Equal,
            CompareOp::Ne => compare(value, target) != std::cmp::Ordering::Equal,
            CompareOp::Lt => compare(value, target) == std::cmp::Ordering::Less,
            CompareOp::Le => compare(value, target) != std::cmp::Ordering::Greater,
            CompareOp::Gt => compare(value, target) == std::cmp::Ordering::Greater,
            CompareOp::Ge => compare(value, target) != std::cmp::Ordering::Less,
            CompareOp::Like => like_match(value, target),
            CompareOp::In => self.values.iter().any(|v| v == value),
        }
    }
}

/// Compare two values numerically when both parse, textually otherwise.
fn compare(a: &str, b: &str) -> std::cmp::Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
        _ => a.cmp(b),
    }
}

/// `%`-wildcard match: segments between wildcards must appear in order,
/// with the first and last anchored when the pattern has no leading or
/// trailing wildcard.
fn like_match(value: &str, pattern: &str) -> bool {
    let anchored_start = !pattern.starts_with('%');
    let anchored_end = !pattern.ends_with('%');
    let segments: Vec<&str> = pattern.split('%').filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
        [] => true,
        [only] if anchored_start && anchored_end => value == *only,
        _ => {
            let mut rest = value;
            let last = segments.len() - 1;
            for (i, seg) in segments.iter().enumerate() {
                if i == 0 && anchored_start {
                    if !rest.starts_with(seg) {
                        return false;
                    }
                    rest = &rest[seg.len()..];
                } else if i == last && anchored_end {
                    return rest.ends_with(seg);
                } else {
                    match rest.find(seg) {
                        Some(pos) => rest = &rest[pos + seg.len()..],
                        None => return false,
                    }
                }
            }
            true
        }
    }
}

/// A compiled filter tree.
///
/// Invariants: every leaf names exactly one dimension + level +
/// comparison; every branch has exactly two children. Built once per
/// query and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterNode {
    Leaf(FilterLeaf),
    Branch {
        relation: Relation,
        /// Nesting depth of the junction that produced this branch.
        level: i32,
        left: Box<FilterNode>,
        right: Box<FilterNode>,
    },
}

impl FilterNode {
    pub fn branch(relation: Relation, level: i32, left: FilterNode, right: FilterNode) -> Self {
        FilterNode::Branch {
            relation,
            level,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// All leaves, left to right.
    pub fn leaves(&self) -> Vec<&FilterLeaf> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a FilterLeaf>) {
        match self {
            FilterNode::Leaf(leaf) => out.push(leaf),
            FilterNode::Branch { left, right, .. } => {
                left.collect_leaves(out);
                right.collect_leaves(out);
            }
        }
    }

    /// Evaluate the tree against a row of dimension values.
    ///
    /// `row` maps dimension identifiers to the row's value for that
    /// dimension. A dimension absent from the row fails its comparisons.
    pub fn evaluate(&self, row: &HashMap<String, String>) -> bool {
        match self {
            FilterNode::Leaf(leaf) => row
                .get(&leaf.dimension)
                .is_some_and(|v| leaf.matches(v)),
            FilterNode::Branch {
                relation,
                left,
                right,
                ..
            } => match relation {
                Relation::And => left.evaluate(row) && right.evaluate(row),
                Relation::Or => left.evaluate(row) || right.evaluate(row),
            },
        }
    }
}

/// One entry of the flat condition list handed in by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterItem {
    Comparison(FilterLeaf),
    Junction { relation: Relation, level: i32 },
}

impl FilterItem {
    pub fn and(level: i32) -> Self {
        FilterItem::Junction {
            relation: Relation::And,
            level,
        }
    }

    pub fn or(level: i32) -> Self {
        FilterItem::Junction {
            relation: Relation::Or,
            level,
        }
    }
}
