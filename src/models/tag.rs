//! Tag model
//!
//! Tags are grouped into taxonomy categories (subject, difficulty, progress, ...).
//! They are managed outside this service and are read-only here.

use serde::{Deserialize, Serialize};

/// Tag entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    /// Unique identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Taxonomy category the tag belongs to
    pub category: String,
}

impl Tag {
    pub fn new(id: i64, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            category: category.into(),
        }
    }
}

/// A tag linked to a question, as returned by the batched tag lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionTag {
    pub question_id: i64,
    pub tag: Tag,
}
