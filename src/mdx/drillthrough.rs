//! Drillthrough statement generation.
//!
//! A drillthrough request asks for the detail rows behind aggregated
//! cells. One `DRILLTHROUGH MAXROWS <n> SELECT ...` statement is built
//! per distinct combination of concrete filter values (the cartesian
//! merge of each dimension's resolved value list), with the combination
//! pinned on the slicer axis as concrete member literals.

use crate::filter::CompareOp;
use crate::query::CubeQuery;

use super::{escape_name, member_literal, MdxError, MdxResult};

const DEFAULT_MAX_ROWS: u32 = 1000;

/// Build one drillthrough statement per concrete filter-value
/// combination.
pub fn build_drillthrough(query: &CubeQuery) -> MdxResult<Vec<String>> {
    let filter = query
        .filter
        .as_ref()
        .ok_or(MdxError::DrillthroughWithoutValues)?;

    // Resolved concrete values per dimension, in leaf order.
    let mut per_dim: Vec<(String, Vec<String>)> = Vec::new();
    for leaf in filter.leaves() {
        if !matches!(leaf.op, CompareOp::Eq | CompareOp::In) {
            continue;
        }
        let members: Vec<String> = leaf
            .values
            .iter()
            .map(|v| member_literal(&leaf.level_unique_name, v))
            .collect();
        match per_dim.iter_mut().find(|(d, _)| *d == leaf.dimension) {
            Some((_, existing)) => existing.extend(members),
            None => per_dim.push((leaf.dimension.clone(), members)),
        }
    }
    if per_dim.is_empty() {
        return Err(MdxError::DrillthroughWithoutValues);
    }

    let combos = cartesian(&per_dim);
    let max_rows = query.drill_max_rows.unwrap_or(DEFAULT_MAX_ROWS);
    let measures: Vec<String> = query
        .measures
        .iter()
        .map(|m| m.unique_name.clone())
        .collect();
    let measure_set = if measures.is_empty() {
        "{[Measures].DefaultMember}".to_string()
    } else {
        format!("{{{}}}", measures.join(", "))
    };

    Ok(combos
        .into_iter()
        .map(|combo| {
            format!(
                "DRILLTHROUGH MAXROWS {} SELECT {} ON COLUMNS FROM [{}] WHERE ({})",
                max_rows,
                measure_set,
                escape_name(&query.cube),
                combo.join(", ")
            )
        })
        .collect())
}

/// Cartesian merge of each dimension's value list.
fn cartesian(per_dim: &[(String, Vec<String>)]) -> Vec<Vec<String>> {
    let mut combos: Vec<Vec<String>> = vec![Vec::new()];
    for (_, values) in per_dim {
        let mut next = Vec::with_capacity(combos.len() * values.len());
        for combo in &combos {
            for value in values {
                let mut extended = combo.clone();
                extended.push(value.clone());
                next.push(extended);
            }
        }
        combos = next;
    }
    combos
}
