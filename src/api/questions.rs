//! Question API endpoints
//!
//! Handles HTTP requests for questions:
//! - POST /api/v1/questions - Create a question (authenticated)
//! - GET /api/v1/questions - List questions, optionally for one tag
//! - GET|POST /api/v1/questions/search - Questions carrying all requested tags
//! - GET /api/v1/questions/mine - The caller's questions (authenticated)
//! - GET /api/v1/questions/user/{user_id} - One author's questions
//! - GET /api/v1/questions/{id} - One question
//! - DELETE /api/v1/questions/{id} - Delete own question (authenticated)

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::api::common::{default_limit, default_page, parse_tag_ids, PaginationQuery};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{QuestionListResponse, QuestionResponse, SearchResponse};
use crate::models::{CreateQuestionInput, ListParams};

/// Request body for creating a question
#[derive(Debug, Deserialize)]
pub struct CreateQuestionRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

/// Query parameters for the question list
#[derive(Debug, Deserialize)]
pub struct ListQuestionsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Restrict to questions carrying this tag
    pub tag_id: Option<i64>,
}

/// Query parameters for tag search
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Comma-separated tag ids
    pub tags: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

/// Request body for tag search
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

/// POST /api/v1/questions
pub async fn create_question_handler(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    payload: Result<Json<CreateQuestionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<QuestionResponse>), ApiError> {
    let Json(body) = payload?;

    let input = CreateQuestionInput::new(body.title, body.content, user_id, body.tag_ids);
    let created = state
        .question_service
        .create(input, &state.rules.create)
        .await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// GET /api/v1/questions
pub async fn list_questions_handler(
    State(state): State<AppState>,
    query: Result<Query<ListQuestionsQuery>, QueryRejection>,
) -> Result<Json<QuestionListResponse>, ApiError> {
    let Query(query) = query?;
    let params = ListParams::new(query.page, query.limit);

    let result = match query.tag_id {
        Some(tag_id) => state.question_service.list_by_tag(tag_id, &params).await?,
        None => state.question_service.list(&params).await?,
    };

    Ok(Json(result.into()))
}

/// GET /api/v1/questions/search?tags=1,2,3
pub async fn search_questions_handler(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Query(query) = query?;
    let tag_ids = match query.tags.as_deref() {
        Some(raw) => parse_tag_ids(raw)?,
        None => Vec::new(),
    };

    search(&state, &tag_ids, ListParams::new(query.page, query.limit)).await
}

/// POST /api/v1/questions/search
///
/// Tag ids come from `?tags=` when present, otherwise from the JSON body.
pub async fn search_questions_body_handler(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Query(query) = query?;
    let tag_ids = match (query.tags.as_deref(), payload) {
        (Some(raw), _) => parse_tag_ids(raw)?,
        (None, Ok(Json(body))) => body.tag_ids,
        (None, Err(JsonRejection::MissingJsonContentType(_))) => Vec::new(),
        (None, Err(e)) => return Err(e.into()),
    };

    search(&state, &tag_ids, ListParams::new(query.page, query.limit)).await
}

async fn search(
    state: &AppState,
    tag_ids: &[i64],
    params: ListParams,
) -> Result<Json<SearchResponse>, ApiError> {
    let outcome = state
        .question_service
        .search_all_tags(tag_ids, &state.rules.search, &params)
        .await?;

    Ok(Json(outcome.into()))
}

/// GET /api/v1/questions/mine
pub async fn list_my_questions_handler(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    query: Result<Query<PaginationQuery>, QueryRejection>,
) -> Result<Json<QuestionListResponse>, ApiError> {
    let Query(query) = query?;
    let result = state
        .question_service
        .list_by_author(user_id, &query.params())
        .await?;

    Ok(Json(result.into()))
}

/// GET /api/v1/questions/user/{user_id}
pub async fn list_user_questions_handler(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<PaginationQuery>, QueryRejection>,
) -> Result<Json<QuestionListResponse>, ApiError> {
    let Path(user_id) = path?;
    let Query(query) = query?;
    let result = state
        .question_service
        .list_by_author(user_id, &query.params())
        .await?;

    Ok(Json(result.into()))
}

/// GET /api/v1/questions/{id}
pub async fn get_question_handler(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let Path(id) = path?;
    let question = state.question_service.get(id).await?;
    Ok(Json(question.into()))
}

/// DELETE /api/v1/questions/{id}
pub async fn delete_question_handler(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    state.question_service.delete(id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
