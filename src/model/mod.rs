//! OLAP metadata model.
//!
//! Descriptive objects discovered from the server: cubes, dimensions,
//! hierarchy levels, measures, and resolved members. All of them are
//! serde-serializable because the member cache persists them as JSON
//! rows.

pub mod cube;
pub mod dimension;
pub mod level;
pub mod measure;
pub mod member;
pub mod types;

pub use cube::{Cube, CubeType};
pub use dimension::{Dimension, DimensionKind};
pub use level::Level;
pub use measure::Measure;
pub use member::Member;
pub use types::{DataType, Value};
