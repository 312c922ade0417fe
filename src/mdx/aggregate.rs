//! Statistical calculated measures.
//!
//! A measure with a non-`None` aggregate formula is replaced on the
//! axis by a calculated member aggregating over the crossjoin of every
//! selected dimension's current children. Formula-specific shapes come
//! from a template table with `{set}`, `{measure}` and `{current}`
//! placeholders.

use crate::query::AggregateFormula;

impl AggregateFormula {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateFormula::None => "none",
            AggregateFormula::Sum => "Sum",
            AggregateFormula::Average => "Average",
            AggregateFormula::Count => "Count",
            AggregateFormula::Max => "Max",
            AggregateFormula::Min => "Min",
            AggregateFormula::PercentOfTotal => "PercentOfTotal",
            AggregateFormula::RunningTotal => "RunningTotal",
        }
    }
}

/// MDX template for a formula; `None` for the unaggregated case.
fn template(formula: AggregateFormula) -> Option<&'static str> {
    match formula {
        AggregateFormula::None => None,
        AggregateFormula::Sum => Some("Aggregate({set}, {measure})"),
        AggregateFormula::Average => Some("Avg({set}, {measure})"),
        AggregateFormula::Count => Some("Count({set})"),
        AggregateFormula::Max => Some("Max({set}, {measure})"),
        AggregateFormula::Min => Some("Min({set}, {measure})"),
        AggregateFormula::PercentOfTotal => {
            Some("100 * {measure} / IIF(Aggregate({set}, {measure}) = 0, NULL, Aggregate({set}, {measure}))")
        }
        AggregateFormula::RunningTotal => {
            Some("Sum(Head({set}, Rank({current}, {set})), {measure})")
        }
    }
}

/// The calculated member a formula-carrying measure compiles into.
pub fn aggregate_member_name(measure_name: &str, formula: AggregateFormula) -> String {
    format!("[Measures].[{} {}]", measure_name, formula.as_str())
}

/// Render the value expression for a statistical measure.
///
/// `slice_set` is the crossjoin of every selected dimension's current
/// children; `current_tuple` is the tuple of current members, used by
/// the running-total shape. Returns `None` for `AggregateFormula::None`.
pub fn compile_aggregate(
    formula: AggregateFormula,
    slice_set: &str,
    base_measure: &str,
    current_tuple: &str,
) -> Option<String> {
    template(formula).map(|t| {
        t.replace("{set}", slice_set)
            .replace("{measure}", base_measure)
            .replace("{current}", current_tuple)
    })
}
