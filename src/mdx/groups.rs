//! Named-group compilation (extended dialect).
//!
//! A named group over member captions at one level becomes three
//! auxiliary named sets (the raw members, their children, and the
//! aggregation-filtered child set) plus one calculated member that
//! aggregates the children under the current measure. The group is then
//! woven into the dimension's axis set with a nested
//! `IIF(CurrentMember IS ..., ...)` chain so non-grouped members fall
//! through unchanged.

use crate::query::{GroupSpec, NamedGroup};

use super::dialect::MdxDialect;
use super::member_literal;

/// WITH-clause artifacts produced from a group spec.
#[derive(Debug, Default)]
pub struct GroupArtifacts {
    /// Named sets, in definition order: (name, set expression).
    pub named_sets: Vec<(String, String)>,
    /// Calculated members: (member unique name, value expression).
    pub calc_members: Vec<(String, String)>,
}

/// Compiles group specs into WITH artifacts and axis-set weaves.
pub struct GroupCompiler<'a> {
    dialect: &'a dyn MdxDialect,
    spec: &'a GroupSpec,
}

impl<'a> GroupCompiler<'a> {
    pub fn new(dialect: &'a dyn MdxDialect, spec: &'a GroupSpec) -> Self {
        Self { dialect, spec }
    }

    fn members_set_name(group: &NamedGroup) -> String {
        format!("{} Members", group.name)
    }

    fn children_set_name(group: &NamedGroup) -> String {
        format!("{} Children", group.name)
    }

    fn filtered_set_name(group: &NamedGroup) -> String {
        format!("{} Filtered", group.name)
    }

    /// The calculated member a group compiles into.
    pub fn group_member_name(group: &NamedGroup) -> String {
        format!("{}.[{}]", group.dimension, group.name)
    }

    /// Compile every group into its named sets and calculated member.
    pub fn compile(&self) -> GroupArtifacts {
        let mut artifacts = GroupArtifacts::default();
        for group in &self.spec.named_groups {
            let raw: Vec<String> = group
                .members
                .iter()
                .map(|c| member_literal(&group.level_unique_name, c))
                .collect();
            let members_name = Self::members_set_name(group);
            let children_name = Self::children_set_name(group);
            let filtered_name = Self::filtered_set_name(group);

            artifacts
                .named_sets
                .push((members_name.clone(), format!("{{{}}}", raw.join(", "))));
            artifacts.named_sets.push((
                children_name.clone(),
                format!(
                    "Generate({}, {{{}.CurrentMember.Children}})",
                    self.dialect.embed_named_set(&members_name),
                    group.dimension
                ),
            ));
            artifacts.named_sets.push((
                filtered_name.clone(),
                format!(
                    "Filter({}, NOT IsEmpty([Measures].CurrentMember))",
                    self.dialect.embed_named_set(&children_name)
                ),
            ));

            artifacts.calc_members.push((
                Self::group_member_name(group),
                format!(
                    "IIF(Count({}) = 0, NULL, Aggregate({}, [Measures].CurrentMember))",
                    self.dialect.embed_named_set(&filtered_name),
                    self.dialect.embed_named_set(&children_name)
                ),
            ));
        }
        artifacts
    }

    /// Weave a dimension's groups into its axis set: every grouped
    /// member maps to its group's calculated member, everything else
    /// falls through as itself.
    pub fn weave_axis_set(&self, dimension: &str, base_set: &str) -> String {
        let groups = self.spec.groups_for(dimension);
        if groups.is_empty() {
            return base_set.to_string();
        }

        let mut expr = format!("{{{}.CurrentMember}}", dimension);
        // innermost-first so the first group declared wins the chain head
        for group in groups.iter().rev() {
            let member = Self::group_member_name(group);
            for caption in group.members.iter().rev() {
                expr = format!(
                    "IIF({}.CurrentMember IS {}, {{{}}}, {})",
                    dimension,
                    member_literal(&group.level_unique_name, caption),
                    member,
                    expr
                );
            }
        }
        format!("Generate({}, {})", base_set, expr)
    }
}
