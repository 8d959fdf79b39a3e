//! Tag API endpoints
//!
//! Handles HTTP requests for the tag catalog:
//! - GET /api/v1/tags - All tags ordered by name
//! - GET /api/v1/tags/grouped - Tags grouped by category
//! - GET /api/v1/tags/{id}/questions - Questions carrying one tag

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::{QuestionListResponse, TagResponse, TagSummary};

/// Response for tag list
#[derive(Debug, Serialize)]
pub struct TagListResponse {
    pub tags: Vec<TagResponse>,
}

/// Build the tags router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tags))
        .route("/grouped", get(list_grouped_tags))
        .route("/{id}/questions", get(list_tag_questions))
}

/// GET /api/v1/tags
async fn list_tags(State(state): State<AppState>) -> Result<Json<TagListResponse>, ApiError> {
    let tags = state.tag_service.list_all().await?;

    Ok(Json(TagListResponse {
        tags: tags.into_iter().map(TagResponse::from).collect(),
    }))
}

/// GET /api/v1/tags/grouped
async fn list_grouped_tags(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, Vec<TagSummary>>>, ApiError> {
    let grouped = state
        .tag_service
        .list_by_category()
        .await?
        .into_iter()
        .map(|(category, tags)| (category, tags.into_iter().map(TagSummary::from).collect()))
        .collect();

    Ok(Json(grouped))
}

/// GET /api/v1/tags/{id}/questions
async fn list_tag_questions(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<PaginationQuery>, QueryRejection>,
) -> Result<Json<QuestionListResponse>, ApiError> {
    let Path(id) = path?;
    let Query(query) = query?;
    let result = state
        .question_service
        .list_by_tag(id, &query.params())
        .await?;

    Ok(Json(result.into()))
}
