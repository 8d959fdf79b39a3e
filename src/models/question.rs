//! Question model
//!
//! This module provides:
//! - `Question` entity
//! - `QuestionWithTags`, a question enriched with its linked tags
//! - `CreateQuestionInput` for the creation workflow
//! - Pagination types for list and search queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Tag;

/// Question entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    /// Unique identifier
    pub id: i64,
    /// Question title
    pub title: String,
    /// Question body
    pub content: String,
    /// Author user ID
    pub author_id: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Question {
    /// Only the author may delete a question.
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.author_id == user_id
    }
}

/// Question with its tags, sorted by tag name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionWithTags {
    #[serde(flatten)]
    pub question: Question,
    pub tags: Vec<Tag>,
}

/// Input for creating a question
#[derive(Debug, Clone)]
pub struct CreateQuestionInput {
    pub title: String,
    pub content: String,
    pub author_id: i64,
    /// Requested tag ids; duplicates are collapsed before use
    pub tag_ids: Vec<i64>,
}

impl CreateQuestionInput {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        author_id: i64,
        tag_ids: Vec<i64>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            author_id,
            tag_ids,
        }
    }
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    /// Create a new paginated result
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 || self.total <= 0 {
            return 0;
        }
        let per_page = i64::from(self.per_page);
        u32::try_from((self.total + per_page - 1) / per_page).unwrap_or(u32::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}
