//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The JSON error envelope and its mapping from service errors
//! - Authentication (session token resolution)

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequestParts, Request, State,
    },
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::RulesConfig;
use crate::db::repositories::{
    SessionRepository, SqlxQuestionRepository, SqlxSessionRepository, SqlxTagRepository,
};
use crate::db::DynDatabasePool;
use crate::rules::Violation;
use crate::services::{QuestionService, QuestionServiceError, TagService, TagServiceError};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub tag_service: Arc<TagService>,
    pub question_service: Arc<QuestionService>,
    pub session_repo: Arc<dyn SessionRepository>,
    /// Creation and search rule sets, fixed for the lifetime of the process
    pub rules: Arc<RulesConfig>,
}

impl AppState {
    /// Wire repositories and services on top of `pool`
    pub fn new(pool: DynDatabasePool, rules: RulesConfig) -> Self {
        let tag_service = Arc::new(TagService::new(SqlxTagRepository::boxed(pool.clone())));
        let question_service = Arc::new(
            QuestionService::new(
                SqlxQuestionRepository::boxed(pool.clone()),
                tag_service.clone(),
            )
            .with_max_tag_ids(rules.max_tag_ids),
        );

        Self {
            tag_service,
            question_service,
            session_repo: SqlxSessionRepository::boxed(pool),
            rules: Arc::new(rules),
        }
    }
}

/// Authenticated user id extracted from request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub i64);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .copied()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Machine-readable error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    UnknownTag,
    BelowMinimum,
    AboveMaximum,
    MissingRequiredCategory,
    Unauthorized,
    Forbidden,
    NotFound,
    InternalError,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            Self::ValidationError
            | Self::UnknownTag
            | Self::BelowMinimum
            | Self::AboveMaximum
            | Self::MissingRequiredCategory => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<&Violation> for ErrorCode {
    fn from(violation: &Violation) -> Self {
        match violation {
            Violation::BelowMinimum { .. } => Self::BelowMinimum,
            Violation::AboveMaximum { .. } => Self::AboveMaximum,
            Violation::MissingRequiredCategory { .. } => Self::MissingRequiredCategory,
        }
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code,
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: ErrorCode,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code,
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    pub fn unknown_tags(ids: Vec<i64>) -> Self {
        Self::with_details(
            ErrorCode::UnknownTag,
            format!("Unknown tag ids: {:?}", ids),
            serde_json::json!({ "unknown_ids": ids }),
        )
    }

    /// Log the cause and answer with a generic message
    pub fn internal(err: anyhow::Error) -> Self {
        tracing::error!(error = ?err, "Request failed");
        Self::new(ErrorCode::InternalError, "Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        self.error.code.status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<QuestionServiceError> for ApiError {
    fn from(err: QuestionServiceError) -> Self {
        match err {
            QuestionServiceError::Validation(msg) => Self::validation_error(msg),
            QuestionServiceError::UnknownTags(ids) => Self::unknown_tags(ids),
            QuestionServiceError::Violation { violation, counts } => {
                let mut details = serde_json::to_value(&violation).unwrap_or_default();
                if let (Some(counts), Some(fields)) = (counts, details.as_object_mut()) {
                    fields.insert("counts".to_string(), serde_json::json!(counts));
                }
                Self::with_details(ErrorCode::from(&violation), violation.to_string(), details)
            }
            QuestionServiceError::NotFound => Self::not_found("Question not found"),
            QuestionServiceError::Forbidden => {
                Self::forbidden("Only the author may delete this question")
            }
            QuestionServiceError::Internal(e) => Self::internal(e),
        }
    }
}

// Extractor failures keep the JSON envelope instead of axum's plain text

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation_error(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation_error(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::validation_error(rejection.body_text())
    }
}

impl From<TagServiceError> for ApiError {
    fn from(err: TagServiceError) -> Self {
        match err {
            TagServiceError::UnknownTags(ids) => Self::unknown_tags(ids),
            TagServiceError::Internal(e) => Self::internal(e),
        }
    }
}

/// Extract session token from request
fn extract_session_token(request: &Request) -> Option<String> {
    if let Some(auth_header) = request.headers().get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    if let Some(cookie_header) = request.headers().get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                let cookie = cookie.trim();
                if let Some(token) = cookie.strip_prefix("session=") {
                    return Some(token.to_string());
                }
            }
        }
    }

    None
}

/// Authentication middleware
///
/// Resolves the session token to a user id and stores it as
/// [`AuthenticatedUser`] in the request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let session = state
        .session_repo
        .get_by_id(&token)
        .await
        .map_err(ApiError::internal)?
        .filter(|session| !session.is_expired())
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser(session.user_id));
    Ok(next.run(request).await)
}
