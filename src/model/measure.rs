//! Cube measures.

use serde::{Deserialize, Serialize};

use super::types::DataType;

/// A numeric fact exposed by a cube.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Measure {
    pub name: String,
    pub unique_name: String,
    pub caption: String,
    pub data_type: DataType,
    /// Display folder reported by the server, if any.
    pub folder: Option<String>,
}

impl Measure {
    pub fn new(name: impl Into<String>, unique_name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            caption: name.clone(),
            name,
            unique_name: unique_name.into(),
            ..Default::default()
        }
    }
}
