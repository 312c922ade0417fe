//! Per-dimension member-set expressions.
//!
//! Each selected dimension contributes one set expression to the tuple
//! axis. An unfiltered dimension is its display level's member list; a
//! filtered one narrows that list, aligning the filter level to the
//! display level with `Ancestor`/`Descendants` navigation when the two
//! differ. AND combines aligned sets with `Intersect`, OR with `Union`.

use crate::filter::{CompareOp, FilterLeaf, FilterNode, Relation};
use crate::query::{CubeQuery, DimensionRef};

use super::{escape_string, member_literal};

/// Signed distance between two level depths.
///
/// Positive when `a` is deeper than `b`; `diff_level(a, b) ==
/// -diff_level(b, a)` and zero only for the same depth.
pub fn diff_level(a: i32, b: i32) -> i32 {
    a - b
}

/// Compiles one dimension's axis set.
pub struct SetCompiler<'a> {
    query: &'a CubeQuery,
}

impl<'a> SetCompiler<'a> {
    pub fn new(query: &'a CubeQuery) -> Self {
        Self { query }
    }

    /// The axis set for a selected dimension, narrowed by its filter
    /// when one exists.
    pub fn axis_set(&self, dref: &DimensionRef, filter: Option<&FilterNode>) -> String {
        match filter {
            Some(node) => self.filter_set(dref, node),
            None => self.default_set(dref),
        }
    }

    /// `{<level>.members}`, excluding already-expanded ancestor paths
    /// so re-running an expanded query does not re-list what a deeper
    /// level already shows.
    pub fn default_set(&self, dref: &DimensionRef) -> String {
        let expanded = self.query.expanded(&dref.dimension);
        let level_set = format!("{{{}.members}}", dref.level_unique_name);
        if expanded.is_empty() {
            return level_set;
        }
        let excluded = expanded.join(", ");
        format!("Except({}, {{{}}})", level_set, excluded)
    }

    /// Compile a filter subtree into a set at the display level.
    fn filter_set(&self, dref: &DimensionRef, node: &FilterNode) -> String {
        match node {
            FilterNode::Leaf(leaf) => self.leaf_set(dref, leaf),
            FilterNode::Branch {
                relation,
                left,
                right,
                ..
            } => {
                let l = self.filter_set(dref, left);
                let r = self.filter_set(dref, right);
                match relation {
                    Relation::And => format!("Intersect({}, {})", l, r),
                    Relation::Or => format!("Union({}, {})", l, r),
                }
            }
        }
    }

    /// Compile one comparison, aligning its level to the display level.
    fn leaf_set(&self, dref: &DimensionRef, leaf: &FilterLeaf) -> String {
        let offset = diff_level(dref.level_number, leaf.level_number);
        let matched = self.comparison_set(&leaf.dimension, leaf);

        if offset == 0 {
            return matched;
        }

        let display_members = format!("{{{}.members}}", dref.level_unique_name);
        if offset > 0 {
            // Filter sits above the display level: keep display members
            // whose ancestor at the offset lands in the matched set.
            format!(
                "Filter({}, Rank(Ancestor({}.CurrentMember, {}), {}) > 0)",
                display_members, leaf.dimension, offset, matched
            )
        } else {
            // Filter sits below: keep display members owning at least
            // one matching descendant.
            format!(
                "Filter({}, Count(Intersect(Descendants({}.CurrentMember, {}), {})) > 0)",
                display_members,
                leaf.dimension,
                -offset,
                matched
            )
        }
    }

    /// The member set a comparison matches at its own level.
    fn comparison_set(&self, dimension: &str, leaf: &FilterLeaf) -> String {
        let level = &leaf.level_unique_name;
        let level_members = format!("{{{}.members}}", level);
        match leaf.op {
            CompareOp::Eq | CompareOp::In => {
                let members: Vec<String> = leaf
                    .values
                    .iter()
                    .map(|v| member_literal(level, v))
                    .collect();
                format!("{{{}}}", members.join(", "))
            }
            CompareOp::Ne => {
                let members: Vec<String> = leaf
                    .values
                    .iter()
                    .map(|v| member_literal(level, v))
                    .collect();
                format!("Except({}, {{{}}})", level_members, members.join(", "))
            }
            CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge => {
                let op = match leaf.op {
                    CompareOp::Lt => "<",
                    CompareOp::Le => "<=",
                    CompareOp::Gt => ">",
                    _ => ">=",
                };
                let value = leaf.values.first().map(String::as_str).unwrap_or("");
                format!(
                    "Filter({}, {}.CurrentMember.MEMBER_CAPTION {} \"{}\")",
                    level_members,
                    dimension,
                    op,
                    escape_string(value)
                )
            }
            CompareOp::Like => {
                let value = leaf.values.first().map(String::as_str).unwrap_or("");
                let needle = value.trim_matches('%');
                format!(
                    "Filter({}, InStr({}.CurrentMember.MEMBER_CAPTION, \"{}\") > 0)",
                    level_members,
                    dimension,
                    escape_string(needle)
                )
            }
        }
    }
}
