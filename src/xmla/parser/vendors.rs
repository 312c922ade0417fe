//! Vendor-specific parser semantics.
//!
//! The parser family differs per OLAP vendor in exactly three places:
//! how a member's displayed caption is derived, whether responses carry
//! complete ancestor chains (making cache walks unnecessary), and how
//! named-group membership is detected. Everything else is shared.

use crate::model::{CubeType, Member};
use crate::query::GroupSpec;

/// The three seams a vendor may override.
pub trait VendorSemantics: std::fmt::Debug + Sync {
    /// Vendor name for display/logging.
    fn name(&self) -> &'static str;

    /// The full caption shown for a member: the plain caption by
    /// default, the ancestor-qualified path for vendors that display
    /// qualified names.
    fn display_caption(&self, member: &Member) -> String {
        member.caption.clone()
    }

    /// Whether responses deliver only the leaf member of each
    /// hierarchy, so ancestor columns must be resolved against the
    /// level cache. Vendors that send complete chains per tuple never
    /// need the cache.
    fn caches_ancestor_levels(&self) -> bool {
        true
    }

    /// Detect named-group membership: the caption substituted for a
    /// member that is a compiled group member, `None` for ordinary
    /// members.
    fn group_caption(&self, member: &Member, groups: &GroupSpec) -> Option<String> {
        groups
            .named_groups
            .iter()
            .find(|g| member.unique_name == format!("{}.[{}]", g.dimension, g.name))
            .map(|g| g.name.clone())
    }
}

/// Qualified member path from a unique name: `[Region].[State].[NY]`
/// becomes `State.NY` (the hierarchy segment is dropped).
fn qualified_path(unique_name: &str) -> String {
    let segments: Vec<&str> = unique_name
        .split('.')
        .map(|s| s.trim_start_matches('[').trim_end_matches(']'))
        .collect();
    if segments.len() > 1 {
        segments[1..].join(".")
    } else {
        unique_name.to_string()
    }
}

/// Generic SQL-OLAP providers: leaf-only tuples, plain captions.
#[derive(Debug)]
pub struct SqlServerSemantics;

impl VendorSemantics for SqlServerSemantics {
    fn name(&self) -> &'static str {
        "sqlserver"
    }
}

/// Open-source multidimensional providers: complete ancestor chains
/// arrive in every tuple, so the cache is never consulted.
#[derive(Debug)]
pub struct MondrianSemantics;

impl VendorSemantics for MondrianSemantics {
    fn name(&self) -> &'static str {
        "mondrian"
    }

    fn caches_ancestor_levels(&self) -> bool {
        false
    }
}

/// Enterprise performance management providers: qualified captions,
/// leaf-only tuples.
#[derive(Debug)]
pub struct EssbaseSemantics;

impl VendorSemantics for EssbaseSemantics {
    fn name(&self) -> &'static str {
        "essbase"
    }

    fn display_caption(&self, member: &Member) -> String {
        qualified_path(&member.unique_name)
    }
}

/// SAP-style providers: qualified captions; group members surface by
/// caption rather than unique name.
#[derive(Debug)]
pub struct SapSemantics;

impl VendorSemantics for SapSemantics {
    fn name(&self) -> &'static str {
        "sap"
    }

    fn display_caption(&self, member: &Member) -> String {
        qualified_path(&member.unique_name)
    }

    fn group_caption(&self, member: &Member, groups: &GroupSpec) -> Option<String> {
        groups
            .named_groups
            .iter()
            .find(|g| member.caption == g.name)
            .map(|g| g.name.clone())
    }
}

impl CubeType {
    /// The parser semantics for this vendor.
    pub fn semantics(&self) -> &'static dyn VendorSemantics {
        match self {
            CubeType::SqlServer => &SqlServerSemantics,
            CubeType::Mondrian => &MondrianSemantics,
            CubeType::Essbase => &EssbaseSemantics,
            CubeType::Sap => &SapSemantics,
        }
    }
}
