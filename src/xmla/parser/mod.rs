//! Streaming result parsers.
//!
//! One shared parser reconstructs the tabular result (dimension columns
//! plus measure columns) from the tuple/axis/cell stream; vendors plug
//! in through the three seams of [`VendorSemantics`]. Rows are
//! allocated on axis-0 tuple boundaries; cells demultiplex by ordinal
//! through the statement's precomputed measure-index list; ancestor
//! columns a response omits are resolved against the member cache.

pub mod events;
pub mod vendors;

pub use events::{AxisKind, ExecEvent, ExecEventReader};
pub use vendors::VendorSemantics;

use std::cell::RefCell;
use std::collections::HashMap;

use crate::cache::{CacheScope, LevelEntry, MemberCache};
use crate::mdx::CompiledStatement;
use crate::model::{Cube, DataType, Member, Value};
use crate::query::{CubeQuery, DimensionRef};
use crate::result::{Cell, Column, TabularResult};

use super::cancel::CancelToken;
use super::{XmlaError, XmlaResult};

/// Parsed execute response: the tabular result plus the per-level
/// member lists harvested from it (the executor commits those to the
/// cache when the request was not cancelled).
#[derive(Debug)]
pub struct ParsedResult {
    pub table: TabularResult,
    pub levels: Vec<LevelEntry>,
}

/// Parses one execute response for one query.
pub struct ResultParser<'a> {
    query: &'a CubeQuery,
    statement: &'a CompiledStatement,
    cube: &'a Cube,
    cache: Option<(&'a MemberCache, CacheScope)>,
    semantics: &'static dyn VendorSemantics,
    /// Per-request scratch: ancestors already walked, keyed by member
    /// unique name and offset. Discarded with the parser.
    ancestors: RefCell<HashMap<(String, i32), Option<Member>>>,
}

impl<'a> ResultParser<'a> {
    pub fn new(
        query: &'a CubeQuery,
        statement: &'a CompiledStatement,
        cube: &'a Cube,
        cache: Option<(&'a MemberCache, CacheScope)>,
    ) -> Self {
        Self {
            query,
            statement,
            cube,
            cache,
            semantics: cube.cube_type.semantics(),
            ancestors: RefCell::new(HashMap::new()),
        }
    }

    /// Stream the response into a tabular result.
    ///
    /// Observes the cancel token between events: a cancellation mid-
    /// stream raises `Cancelled` and nothing is committed to the cache.
    pub fn parse(&self, body: &str, token: &CancelToken) -> XmlaResult<ParsedResult> {
        let has_dims = !self.query.dimensions.is_empty();

        let mut tuples: Vec<Vec<Member>> = Vec::new();
        let mut current_tuple: Vec<Member> = Vec::new();
        let mut cells: Vec<(usize, String, Option<DataType>)> = Vec::new();
        let mut current_axis: Option<AxisKind> = None;

        for event in ExecEventReader::new(body) {
            if token.is_cancelled() {
                return Err(XmlaError::Cancelled);
            }
            match event? {
                ExecEvent::AxisStart(kind) => current_axis = Some(kind),
                ExecEvent::AxisEnd(_) => current_axis = None,
                ExecEvent::TupleStart if current_axis == Some(AxisKind::Axis0) => {
                    current_tuple.clear();
                }
                ExecEvent::Member(member) if current_axis == Some(AxisKind::Axis0) => {
                    current_tuple.push(member);
                }
                ExecEvent::TupleEnd if current_axis == Some(AxisKind::Axis0) => {
                    tuples.push(std::mem::take(&mut current_tuple));
                }
                ExecEvent::Cell {
                    ordinal,
                    value,
                    declared_type,
                    ..
                } => cells.push((ordinal, value, declared_type)),
                _ => {}
            }
        }

        let levels = harvest_levels(&tuples);
        let table = self.assemble(has_dims, tuples, cells)?;
        Ok(ParsedResult { table, levels })
    }

    fn assemble(
        &self,
        has_dims: bool,
        tuples: Vec<Vec<Member>>,
        cells: Vec<(usize, String, Option<DataType>)>,
    ) -> XmlaResult<TabularResult> {
        let ndims = self.query.dimensions.len();
        let nmeasures = self.statement.measure_names.len();

        let mut columns = Vec::with_capacity(ndims + nmeasures);
        for dref in &self.query.dimensions {
            columns.push(Column::new(self.dimension_column_name(dref), DataType::String));
        }
        for (name, ty) in self
            .statement
            .measure_names
            .iter()
            .zip(&self.statement.cell_types)
        {
            columns.push(Column::new(name.clone(), *ty));
        }

        // One output row per axis-0 tuple; a measures-only statement
        // yields a single row.
        let mut rows: Vec<Vec<Cell>> = Vec::with_capacity(tuples.len().max(1));
        if has_dims {
            for tuple in &tuples {
                let mut row = Vec::with_capacity(ndims + nmeasures);
                for dref in &self.query.dimensions {
                    row.push(self.dimension_cell(dref, tuple)?);
                }
                row.extend(std::iter::repeat(Cell::Value(Value::Null)).take(nmeasures));
                rows.push(row);
            }
        } else {
            rows.push(vec![Cell::Value(Value::Null); nmeasures]);
        }

        // Demultiplex cells: axis 0 varies fastest in the ordinal.
        let ntuples = if has_dims { tuples.len().max(1) } else { 1 };
        for (ordinal, text, declared) in cells {
            let (row_idx, axis_pos) = if has_dims {
                (ordinal % ntuples, ordinal / ntuples)
            } else {
                (0, ordinal)
            };
            let Some(&slot) = self.statement.measure_indexes.get(axis_pos) else {
                continue;
            };
            let ty = declared.unwrap_or_else(|| {
                self.statement
                    .cell_types
                    .get(slot)
                    .copied()
                    .unwrap_or(DataType::String)
            });
            let value = Value::parse(&text, ty).unwrap_or(Value::Null);
            if let Some(cell) = rows.get_mut(row_idx).and_then(|r| r.get_mut(ndims + slot)) {
                *cell = Cell::Value(value);
            }
        }

        Ok(TabularResult { columns, rows })
    }

    /// The cell for one dimension column of one tuple: the delivered
    /// member when its level matches the column, otherwise the ancestor
    /// resolved at the level offset.
    fn dimension_cell(&self, dref: &DimensionRef, tuple: &[Member]) -> XmlaResult<Cell> {
        let members: Vec<&Member> = tuple
            .iter()
            .filter(|m| member_matches(m, dref))
            .collect();

        let resolved = match members.iter().find(|m| m.level_number == dref.level_number) {
            Some(direct) => Some((*direct).clone()),
            None => {
                let deepest = members.iter().max_by_key(|m| m.level_number);
                match deepest {
                    Some(deepest) if deepest.level_number > dref.level_number => {
                        self.resolve_ancestor_column(dref, deepest)?
                    }
                    _ => None,
                }
            }
        };

        Ok(match resolved {
            Some(mut member) => {
                // caption fix-up pass, immediately after creation
                if let Some(groups) = &self.query.groups {
                    if let Some(caption) = self.semantics.group_caption(&member, groups) {
                        member.caption = caption;
                    }
                }
                member.full_caption = self.semantics.display_caption(&member);
                Cell::Member(member)
            }
            None => Cell::Value(Value::Null),
        })
    }

    fn resolve_ancestor_column(
        &self,
        dref: &DimensionRef,
        deepest: &Member,
    ) -> XmlaResult<Option<Member>> {
        if !self.semantics.caches_ancestor_levels() {
            // this vendor sends complete chains; a missing level means
            // the response genuinely has no member there
            return Ok(None);
        }
        let Some((cache, scope)) = &self.cache else {
            return Ok(None);
        };
        let Some(dimension) = self.cube.dimension(&dref.dimension) else {
            return Ok(None);
        };
        let offset = deepest.level_number - dref.level_number;

        let memo_key = (deepest.unique_name.clone(), offset);
        if let Some(hit) = self.ancestors.borrow().get(&memo_key) {
            return Ok(hit.clone());
        }
        let resolved = cache.resolve_ancestor(scope, dimension, deepest, offset)?;
        self.ancestors
            .borrow_mut()
            .insert(memo_key, resolved.clone());
        Ok(resolved)
    }

    fn dimension_column_name(&self, dref: &DimensionRef) -> String {
        self.cube
            .dimension(&dref.dimension)
            .and_then(|d| d.level(&dref.level_unique_name))
            .map(|l| l.caption.clone())
            .unwrap_or_else(|| crate::mdx::last_segment(&dref.level_unique_name).to_string())
    }
}

/// Whether a tuple member belongs to a selected dimension column.
fn member_matches(member: &Member, dref: &DimensionRef) -> bool {
    if member.hierarchy == dref.dimension {
        return true;
    }
    if bare_name(&member.hierarchy) == bare_name(&dref.dimension) {
        return true;
    }
    member
        .level_unique_name
        .starts_with(&format!("{}.", dref.dimension))
}

fn bare_name(name: &str) -> String {
    name.split('.')
        .map(|s| s.trim_start_matches('[').trim_end_matches(']'))
        .collect::<Vec<_>>()
        .join(".")
}

/// Group delivered members by level for eager cache population.
fn harvest_levels(tuples: &[Vec<Member>]) -> Vec<LevelEntry> {
    let mut levels: Vec<LevelEntry> = Vec::new();
    for member in tuples.iter().flatten() {
        if member.level_unique_name.is_empty() || bare_name(&member.hierarchy) == "Measures" {
            continue;
        }
        let entry = match levels
            .iter_mut()
            .find(|l| l.level_unique_name == member.level_unique_name)
        {
            Some(entry) => entry,
            None => {
                levels.push(LevelEntry::new(
                    member.level_unique_name.clone(),
                    member.level_number,
                ));
                levels.last_mut().expect("just pushed")
            }
        };
        if entry.member(&member.unique_name).is_none() {
            entry.members.push(member.clone());
        }
    }
    levels
}
