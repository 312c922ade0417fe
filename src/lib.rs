//! # Prism
//!
//! A streaming XMLA client and MDX compiler for OLAP cube queries.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        Query Model (levels, measures, filter list)       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [condition compiler]
//! ┌─────────────────────────────────────────────────────────┐
//! │       Filter Forest (per-dimension AND-only trees)       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [mdx compiler]
//! ┌─────────────────────────────────────────────────────────┐
//! │                    MDX Statement                         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [xmla client, SOAP/HTTP]
//! ┌─────────────────────────────────────────────────────────┐
//! │           Tuple/Axis/Cell Response Stream                │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [result parser + member cache]
//! ┌─────────────────────────────────────────────────────────┐
//! │                   Tabular Result                         │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Metadata discovery (cubes/dimensions/levels/measures) is a separate,
//! simpler path feeding both the compiler (name resolution) and the
//! member cache (level ordering and ancestor lookup).

pub mod cache;
pub mod config;
pub mod execute;
pub mod filter;
pub mod mdx;
pub mod model;
pub mod query;
pub mod result;
pub mod xmla;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::cache::{CacheScope, LevelEntry, MemberCache};
    pub use crate::config::{DataSource, Settings};
    pub use crate::execute::QueryExecutor;
    pub use crate::filter::{
        build_filter_tree, dimension_filters, to_forest, CompareOp, FilterItem, FilterLeaf,
        FilterNode, Relation,
    };
    pub use crate::mdx::{Dialect, MdxBuilder};
    pub use crate::model::{Cube, CubeType, DataType, Dimension, Level, Measure, Member, Value};
    pub use crate::query::{
        AggregateFormula, CubeQuery, DimensionRef, GroupSpec, MeasureRef, NamedGroup,
    };
    pub use crate::result::{Cell, Column, TabularResult};
    pub use crate::xmla::{CancelToken, Credentials, StaticCredentials, XmlaClient, XmlaError};
}

// Also export the workhorse types at the crate root
pub use execute::QueryExecutor;
pub use filter::{build_filter_tree, FilterItem, FilterNode};
pub use mdx::{Dialect, MdxBuilder};
pub use query::CubeQuery;
pub use result::TabularResult;
pub use xmla::{CancelToken, XmlaError, XmlaResult};
