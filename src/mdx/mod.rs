//! MDX statement compilation.
//!
//! Consumes the query model (selected levels, measures, normalized
//! filter forest, grouping/aggregate directives) and emits MDX text:
//!
//! ```text
//! [WITH <named sets, calculated members>]
//! SELECT [NON EMPTY] <dimension crossjoin> ON COLUMNS
//!      [, <measure set> ON ROWS]
//! FROM [<cube>]
//! [WHERE (<slicer members>)]
//! ```
//!
//! The dimension tuples ride the COLUMNS axis; each tuple becomes one
//! output row of the tabular result. Dialect differences (named-group
//! support, SQL-2000 named-set nesting) live behind [`MdxDialect`].

pub mod aggregate;
pub mod builder;
pub mod dialect;
pub mod drillthrough;
pub mod groups;
pub mod set;

use std::sync::LazyLock;

use regex::Regex;

pub use builder::{CompiledStatement, MdxBuilder};
pub use dialect::{Dialect, MdxDialect};
pub use drillthrough::build_drillthrough;

/// Result type for MDX compilation.
pub type MdxResult<T> = Result<T, MdxError>;

/// Errors that can occur while compiling a statement.
#[derive(Debug, thiserror::Error)]
pub enum MdxError {
    /// The query selects neither dimensions nor measures.
    #[error("query selects no dimensions and no measures")]
    EmptyQuery,

    /// A named group references a dimension the query does not select.
    #[error("named group '{group}' references unselected dimension {dimension}")]
    GroupDimensionNotSelected { group: String, dimension: String },

    /// Drillthrough was requested without any concrete filter values.
    #[error("drillthrough requires at least one concrete filter value")]
    DrillthroughWithoutValues,
}

static LAST_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\[\]]*)\]\s*$").unwrap());

/// Last bracketed segment of a unique name: `[Region].[State]` -> `State`.
///
/// Falls back to the whole input when it carries no brackets.
pub(crate) fn last_segment(unique_name: &str) -> &str {
    LAST_SEGMENT
        .captures(unique_name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(unique_name)
}

/// Escape a name for embedding inside MDX brackets: `]` doubles.
pub(crate) fn escape_name(name: &str) -> String {
    name.replace(']', "]]")
}

/// Escape a string literal for embedding in MDX double quotes.
pub(crate) fn escape_string(s: &str) -> String {
    s.replace('"', "\"\"")
}

/// A member literal under a level: `[Region].[State]` + `NY` ->
/// `[Region].[State].[NY]`.
pub(crate) fn member_literal(level_unique_name: &str, caption: &str) -> String {
    format!("{}.[{}]", level_unique_name, escape_name(caption))
}
