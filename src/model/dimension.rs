//! Dimensions and hierarchy-scoped dimensions.

use serde::{Deserialize, Serialize};

use super::level::Level;

/// What kind of axis a dimension is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DimensionKind {
    #[default]
    Regular,
    Time,
    /// The synthetic `[Measures]` dimension.
    Measure,
}

/// A categorical axis of a cube.
///
/// When a dimension exposes several hierarchies the discovery layer
/// produces one `Dimension` per hierarchy with the hierarchy fields set;
/// such a hierarchy-scoped dimension is addressed by the hierarchy's
/// unique name, not the dimension's (see [`Dimension::identifier`]).
///
/// Invariant: `levels` is ordered by increasing depth and a level's
/// number equals its index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub unique_name: String,
    pub caption: String,
    pub kind: DimensionKind,
    pub levels: Vec<Level>,
    /// Hierarchy name, set when this dimension is scoped to one
    /// hierarchy of a multi-hierarchy dimension.
    pub hierarchy_name: Option<String>,
    pub hierarchy_unique_name: Option<String>,
    pub hierarchy_caption: Option<String>,
}

impl Dimension {
    pub fn new(name: impl Into<String>, unique_name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            caption: name.clone(),
            name,
            unique_name: unique_name.into(),
            ..Default::default()
        }
    }

    /// The identifier used to address this dimension everywhere in the
    /// query model: the hierarchy unique name when hierarchy-scoped,
    /// the dimension unique name otherwise.
    pub fn identifier(&self) -> &str {
        self.hierarchy_unique_name
            .as_deref()
            .unwrap_or(&self.unique_name)
    }

    /// Display caption, preferring the hierarchy caption when scoped.
    pub fn display_caption(&self) -> &str {
        self.hierarchy_caption.as_deref().unwrap_or(&self.caption)
    }

    /// Find a level by unique name, plain name, or caption.
    pub fn level(&self, name: &str) -> Option<&Level> {
        self.levels
            .iter()
            .find(|l| l.unique_name == name || l.name == name || l.caption == name)
    }

    /// Find a level by its depth number.
    pub fn level_at(&self, number: i32) -> Option<&Level> {
        self.levels.get(usize::try_from(number).ok()?)
    }

    /// Append a level, assigning the next level number.
    ///
    /// Keeps the number-equals-index invariant without trusting the
    /// server's ordering.
    pub fn push_level(&mut self, mut level: Level) {
        level.number = self.levels.len() as i32;
        self.levels.push(level);
    }
}
