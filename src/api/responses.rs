//! Shared API response types
//!
//! Response structures used by more than one endpoint, so that a question
//! renders the same way whether it comes from create, list or search.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{PagedResult, QuestionWithTags, Tag};
use crate::services::SearchOutcome;

// ============================================================================
// Tag Response Types
// ============================================================================

/// Tag with its category
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TagResponse {
    pub id: i64,
    pub name: String,
    pub category: String,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            category: tag.category,
        }
    }
}

/// Tag inside a category group; the category is the group key
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TagSummary {
    pub id: i64,
    pub name: String,
}

impl From<Tag> for TagSummary {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
        }
    }
}

// ============================================================================
// Question Response Types
// ============================================================================

/// Question with its tags sorted by name
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QuestionResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub created_at: String,
    pub tags: Vec<TagResponse>,
}

impl From<QuestionWithTags> for QuestionResponse {
    fn from(item: QuestionWithTags) -> Self {
        let QuestionWithTags { question, tags } = item;
        Self {
            id: question.id,
            title: question.title,
            content: question.content,
            author_id: question.author_id,
            created_at: question.created_at.to_rfc3339(),
            tags: tags.into_iter().map(TagResponse::from).collect(),
        }
    }
}

// ============================================================================
// Pagination Response Types
// ============================================================================

/// Paginated question list response
#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionListResponse {
    pub questions: Vec<QuestionResponse>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl From<PagedResult<QuestionWithTags>> for QuestionListResponse {
    fn from(result: PagedResult<QuestionWithTags>) -> Self {
        let total_pages = result.total_pages();
        Self {
            questions: result.items.into_iter().map(Into::into).collect(),
            total: result.total,
            page: result.page,
            limit: result.per_page,
            total_pages,
        }
    }
}

/// Tag search response
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub questions: Vec<QuestionResponse>,
    /// Matching questions across all pages
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub search_tags: Vec<i64>,
    pub tag_categories: BTreeMap<i64, String>,
}

impl From<SearchOutcome> for SearchResponse {
    fn from(outcome: SearchOutcome) -> Self {
        let SearchOutcome {
            page,
            search_tags,
            tag_categories,
        } = outcome;
        Self {
            questions: page.items.into_iter().map(Into::into).collect(),
            total: page.total,
            page: page.page,
            limit: page.per_page,
            search_tags,
            tag_categories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ListParams, Question};
    use chrono::{TimeZone, Utc};

    fn sample() -> QuestionWithTags {
        QuestionWithTags {
            question: Question {
                id: 9,
                title: "Title".to_string(),
                content: "Body".to_string(),
                author_id: 3,
                created_at: Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap(),
            },
            tags: vec![Tag::new(1, "Algebra", "subject")],
        }
    }

    #[test]
    fn test_question_response_from_model() {
        let response = QuestionResponse::from(sample());

        assert_eq!(response.id, 9);
        assert_eq!(response.author_id, 3);
        assert_eq!(response.created_at, "2024-05-01T08:30:00+00:00");
        assert_eq!(response.tags[0].category, "subject");
    }

    #[test]
    fn test_search_response_serialization() {
        let outcome = SearchOutcome {
            page: PagedResult::new(vec![sample()], 41, &ListParams::new(2, 20)),
            search_tags: vec![1],
            tag_categories: BTreeMap::from([(1, "subject".to_string())]),
        };

        let json = serde_json::to_value(SearchResponse::from(outcome)).unwrap();

        assert_eq!(json["total"], 41);
        assert_eq!(json["page"], 2);
        assert_eq!(json["limit"], 20);
        assert_eq!(json["search_tags"], serde_json::json!([1]));
        assert_eq!(json["tag_categories"]["1"], "subject");
        assert_eq!(json["questions"][0]["tags"][0]["name"], "Algebra");
    }

    #[test]
    fn test_list_response_total_pages() {
        let result = PagedResult::new(vec![sample()], 41, &ListParams::new(1, 20));
        let response = QuestionListResponse::from(result);

        assert_eq!(response.total_pages, 3);
        assert_eq!(response.limit, 20);
    }
}
