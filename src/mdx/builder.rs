//! Statement assembly.
//!
//! Produces the final `[WITH ...] SELECT ... FROM ... [WHERE ...]`
//! text. The crossjoined dimension sets ride axis 0 (ON COLUMNS), so
//! each tuple there becomes one output row; the measure set rides
//! axis 1 (ON ROWS). A query with no dimensions puts the measures on
//! the only axis, and the parser produces a single row for it.

use crate::filter::{dimension_filters, to_forest, FilterNode};
use crate::model::DataType;
use crate::query::{AggregateFormula, CubeQuery};

use super::aggregate::{aggregate_member_name, compile_aggregate};
use super::dialect::{Dialect, MdxDialect};
use super::groups::GroupCompiler;
use super::set::SetCompiler;
use super::{escape_name, MdxError, MdxResult};

/// A compiled statement plus everything the result parser needs to
/// demultiplex cells.
#[derive(Debug, Clone)]
pub struct CompiledStatement {
    pub text: String,
    /// Position of each output measure within the measure axis; the
    /// parser maps cell ordinals through this list.
    pub measure_indexes: Vec<usize>,
    /// Display name per output measure column.
    pub measure_names: Vec<String>,
    /// Declared type per output measure column; fallback for cells
    /// without an `xsi:type`.
    pub cell_types: Vec<DataType>,
}

/// Compiles a [`CubeQuery`] into MDX text.
pub struct MdxBuilder<'a> {
    dialect: Dialect,
    query: &'a CubeQuery,
}

impl<'a> MdxBuilder<'a> {
    pub fn new(query: &'a CubeQuery, dialect: Dialect) -> Self {
        Self { dialect, query }
    }

    pub fn build(&self) -> MdxResult<CompiledStatement> {
        if self.query.dimensions.is_empty() && self.query.measures.is_empty() {
            return Err(MdxError::EmptyQuery);
        }

        let per_dim: Vec<(String, FilterNode)> = match &self.query.filter {
            Some(filter) => dimension_filters(&to_forest(filter.clone())),
            None => Vec::new(),
        };

        let groups = self
            .query
            .groups
            .as_ref()
            .filter(|_| self.dialect.supports_named_groups());

        if let Some(spec) = groups {
            for g in &spec.named_groups {
                if self.query.dimension_ref(&g.dimension).is_none() {
                    return Err(MdxError::GroupDimensionNotSelected {
                        group: g.name.clone(),
                        dimension: g.dimension.clone(),
                    });
                }
            }
        }

        let mut with_parts: Vec<String> = Vec::new();
        let group_compiler = groups.map(|spec| GroupCompiler::new(self.dialect.dialect(), spec));
        if let Some(compiler) = &group_compiler {
            let artifacts = compiler.compile();
            for (name, def) in &artifacts.named_sets {
                with_parts.push(format!("SET [{}] AS '{}'", escape_name(name), def));
            }
            for (name, def) in &artifacts.calc_members {
                with_parts.push(format!("MEMBER {} AS '{}'", name, def));
            }
        }

        // Measure axis entries, swapping in statistical calculated
        // members where a formula applies.
        let mut measure_axis: Vec<String> = Vec::new();
        let mut measure_names: Vec<String> = Vec::new();
        let mut cell_types: Vec<DataType> = Vec::new();
        for m in &self.query.measures {
            let formula = groups
                .map(|s| s.formula_for(&m.unique_name))
                .unwrap_or(AggregateFormula::None);
            let compiled = if self.query.dimensions.is_empty() {
                None
            } else {
                compile_aggregate(
                    formula,
                    &self.current_children_set(),
                    &m.unique_name,
                    &self.current_tuple(),
                )
            };
            match compiled {
                Some(expr) => {
                    let name = aggregate_member_name(&m.name, formula);
                    with_parts.push(format!("MEMBER {} AS '{}'", name, expr));
                    measure_names.push(format!("{} {}", m.name, formula.as_str()));
                    measure_axis.push(name);
                }
                None => {
                    measure_names.push(m.name.clone());
                    measure_axis.push(m.unique_name.clone());
                }
            }
            cell_types.push(m.data_type);
        }
        if let Some(spec) = groups {
            for cm in &spec.calc_measures {
                let name = format!("[Measures].[{}]", escape_name(&cm.name));
                with_parts.push(format!("MEMBER {} AS '{}'", name, cm.expression));
                measure_axis.push(name);
                measure_names.push(cm.name.clone());
                cell_types.push(DataType::Float);
            }
        }

        // Dimension axis: one set per selected dimension, crossjoined.
        // When several levels of one dimension are selected, only the
        // deepest rides the axis; the parser rebuilds ancestor columns
        // from the member cache.
        let set_compiler = SetCompiler::new(self.query);
        let mut dim_sets: Vec<String> = Vec::new();
        for dref in self.axis_refs() {
            let filter = per_dim
                .iter()
                .find(|(d, _)| *d == dref.dimension)
                .map(|(_, f)| f);
            let mut set = set_compiler.axis_set(dref, filter);
            if let Some(compiler) = &group_compiler {
                set = compiler.weave_axis_set(&dref.dimension, &set);
            }
            dim_sets.push(set);
        }

        let mut text = String::new();
        if !with_parts.is_empty() {
            text.push_str("WITH ");
            text.push_str(&with_parts.join(" "));
            text.push(' ');
        }
        text.push_str("SELECT ");

        let measures_set = format!("{{{}}}", measure_axis.join(", "));
        match (dim_sets.is_empty(), measure_axis.is_empty()) {
            (false, false) => {
                if self.query.non_empty {
                    text.push_str("NON EMPTY ");
                }
                text.push_str(&crossjoin(&dim_sets));
                text.push_str(" ON COLUMNS, ");
                text.push_str(&measures_set);
                text.push_str(" ON ROWS");
            }
            (false, true) => {
                if self.query.non_empty {
                    text.push_str("NON EMPTY ");
                }
                text.push_str(&crossjoin(&dim_sets));
                text.push_str(" ON COLUMNS");
            }
            (true, false) => {
                text.push_str(&measures_set);
                text.push_str(" ON COLUMNS");
            }
            (true, true) => unreachable!("rejected above"),
        }

        text.push_str(&format!(" FROM [{}]", escape_name(&self.query.cube)));
        if !self.query.slicer.is_empty() {
            text.push_str(&format!(" WHERE ({})", self.query.slicer.join(", ")));
        }

        Ok(CompiledStatement {
            text,
            measure_indexes: (0..measure_axis.len()).collect(),
            measure_names,
            cell_types,
        })
    }

    /// The deepest selected level per dimension, in first-appearance
    /// order. These are the refs that actually reach the axis.
    fn axis_refs(&self) -> Vec<&crate::query::DimensionRef> {
        let mut refs: Vec<&crate::query::DimensionRef> = Vec::new();
        for dref in &self.query.dimensions {
            match refs.iter_mut().find(|r| r.dimension == dref.dimension) {
                Some(existing) => {
                    if dref.level_number > existing.level_number {
                        *existing = dref;
                    }
                }
                None => refs.push(dref),
            }
        }
        refs
    }

    /// Crossjoin of every selected dimension's current children; the
    /// slice statistical aggregates run over.
    fn current_children_set(&self) -> String {
        let parts: Vec<String> = self
            .axis_refs()
            .iter()
            .map(|d| format!("{}.CurrentMember.Children", d.dimension))
            .collect();
        crossjoin(&parts)
    }

    /// Tuple of every selected dimension's current member.
    fn current_tuple(&self) -> String {
        let parts: Vec<String> = self
            .axis_refs()
            .iter()
            .map(|d| format!("{}.CurrentMember", d.dimension))
            .collect();
        format!("({})", parts.join(", "))
    }
}

/// Right-nested crossjoin: `CrossJoin(a, CrossJoin(b, c))`.
fn crossjoin(sets: &[String]) -> String {
    match sets {
        [] => String::new(),
        [only] => only.clone(),
        [first, rest @ ..] => format!("CrossJoin({}, {})", first, crossjoin(rest)),
    }
}
