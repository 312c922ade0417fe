//! The query model handed in by the report layer.
//!
//! A [`CubeQuery`] is built per logical request and discarded once the
//! MDX text and the tabular result are produced; it is never shared
//! across requests. The optional [`GroupSpec`] carries the grouping and
//! aggregation directives that the extended-dialect compiler turns into
//! named sets and calculated members.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::filter::FilterNode;
use crate::model::DataType;

/// One selected dimension level, in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionRef {
    /// Dimension identifier (hierarchy unique name when scoped).
    pub dimension: String,
    /// The lowest visible level of this dimension in the report.
    pub level_unique_name: String,
    pub level_number: i32,
}

impl DimensionRef {
    pub fn new(
        dimension: impl Into<String>,
        level_unique_name: impl Into<String>,
        level_number: i32,
    ) -> Self {
        Self {
            dimension: dimension.into(),
            level_unique_name: level_unique_name.into(),
            level_number,
        }
    }
}

/// One selected measure, in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureRef {
    pub name: String,
    pub unique_name: String,
    pub data_type: DataType,
}

impl MeasureRef {
    pub fn new(name: impl Into<String>, unique_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unique_name: unique_name.into(),
            data_type: DataType::Float,
        }
    }
}

/// Statistical aggregate applied to a measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AggregateFormula {
    #[default]
    None,
    Sum,
    Average,
    Count,
    Max,
    Min,
    PercentOfTotal,
    RunningTotal,
}

/// A user-defined grouping of members at one level, compiled into a
/// calculated member before it can be referenced like a regular member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedGroup {
    /// Group name; becomes the calculated member's name.
    pub name: String,
    /// Dimension identifier the group lives on.
    pub dimension: String,
    pub level_unique_name: String,
    /// Captions of the members collected into the group.
    pub members: Vec<String>,
}

/// Aggregate directive for one measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureAggregate {
    /// Unique name of the base measure.
    pub measure: String,
    pub formula: AggregateFormula,
}

/// A calculated measure defined by a raw MDX value expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalcMeasure {
    pub name: String,
    pub expression: String,
}

/// Grouping/aggregation directives (the extended query model).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub named_groups: Vec<NamedGroup>,
    pub aggregates: Vec<MeasureAggregate>,
    pub calc_measures: Vec<CalcMeasure>,
}

impl GroupSpec {
    /// Groups defined on one dimension, in declaration order.
    pub fn groups_for(&self, dimension: &str) -> Vec<&NamedGroup> {
        self.named_groups
            .iter()
            .filter(|g| g.dimension == dimension)
            .collect()
    }

    /// The aggregate formula for a measure, `None` when unset.
    pub fn formula_for(&self, measure: &str) -> AggregateFormula {
        self.aggregates
            .iter()
            .find(|a| a.measure == measure)
            .map(|a| a.formula)
            .unwrap_or(AggregateFormula::None)
    }
}

/// One logical query against a cube.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CubeQuery {
    /// Data source the query executes against.
    pub datasource: String,
    /// Cube name or alias.
    pub cube: String,
    pub dimensions: Vec<DimensionRef>,
    pub measures: Vec<MeasureRef>,
    /// Compiled boolean filter over dimensions, if any.
    pub filter: Option<FilterNode>,
    /// Member unique names whose children have been made visible, per
    /// dimension identifier. Keeps expansion idempotent: an expanded
    /// member's own level set excludes it rather than re-fetching the
    /// whole level.
    pub expanded_paths: BTreeMap<String, Vec<String>>,
    /// Member unique names pinned on the slicer (WHERE) axis.
    pub slicer: Vec<String>,
    /// Emit NON EMPTY on the row axis.
    pub non_empty: bool,
    /// Grouping/aggregation directives.
    pub groups: Option<GroupSpec>,
    /// MAXROWS for drillthrough statements.
    pub drill_max_rows: Option<u32>,
}

impl CubeQuery {
    pub fn new(datasource: impl Into<String>, cube: impl Into<String>) -> Self {
        Self {
            datasource: datasource.into(),
            cube: cube.into(),
            ..Default::default()
        }
    }

    /// The selected level for a dimension identifier, if selected.
    pub fn dimension_ref(&self, dimension: &str) -> Option<&DimensionRef> {
        self.dimensions.iter().find(|d| d.dimension == dimension)
    }

    /// Expanded member unique names for a dimension.
    pub fn expanded(&self, dimension: &str) -> &[String] {
        self.expanded_paths
            .get(dimension)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
