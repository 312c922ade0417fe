//! Resolved hierarchy members.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A concrete member of a hierarchy level, as returned by the server or
/// read back from the level cache.
///
/// Identity is the unique name alone: two members with the same unique
/// name are the same member regardless of caption or parent fields.
/// Members are immutable after the caption fix-up pass that follows
/// parsing (see [`Member::qualify_caption`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Member {
    pub unique_name: String,
    pub caption: String,
    /// Caption qualified by ancestor captions, `A.B.C` style.
    pub full_caption: String,
    pub parent_unique_name: Option<String>,
    pub hierarchy: String,
    pub level_unique_name: String,
    pub level_number: i32,
    pub parent_level_number: i32,
}

impl Member {
    pub fn new(unique_name: impl Into<String>, caption: impl Into<String>) -> Self {
        let caption = caption.into();
        Self {
            unique_name: unique_name.into(),
            full_caption: caption.clone(),
            caption,
            parent_level_number: -1,
            ..Default::default()
        }
    }

    /// Fix up the full caption from a resolved parent.
    ///
    /// Runs once, immediately after the response that created the member;
    /// members are never mutated after that pass.
    pub fn qualify_caption(&mut self, parent_full_caption: &str) {
        if parent_full_caption.is_empty() {
            self.full_caption = self.caption.clone();
        } else {
            self.full_caption = format!("{}.{}", parent_full_caption, self.caption);
        }
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.unique_name == other.unique_name
    }
}

impl Eq for Member {}

impl Hash for Member {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.unique_name.hash(state);
    }
}
