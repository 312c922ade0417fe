//! Hierarchy levels.

use serde::{Deserialize, Serialize};

/// One depth within a dimension hierarchy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Level {
    pub name: String,
    pub unique_name: String,
    pub caption: String,
    /// Depth within the owning dimension; equals the index in
    /// `Dimension::levels`.
    pub number: i32,
    /// Date-format metadata when members of this level should be read
    /// as dates (time dimensions).
    pub as_date: Option<String>,
}

impl Level {
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
