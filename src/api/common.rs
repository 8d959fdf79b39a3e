//! Common API utilities and shared types
//!
//! This module contains shared utilities used across multiple API endpoints.

use serde::Deserialize;

use crate::api::middleware::ApiError;
use crate::models::ListParams;

// ============================================================================
// Pagination Defaults
// ============================================================================

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

/// Default page size
pub fn default_limit() -> u32 {
    20
}

// ============================================================================
// Pagination Query Types
// ============================================================================

/// Basic pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl PaginationQuery {
    pub fn params(&self) -> ListParams {
        ListParams::new(self.page, self.limit)
    }
}

// ============================================================================
// Tag id lists
// ============================================================================

/// Parse a comma-separated tag id list such as `1, 2,3`.
///
/// Blank segments are skipped. Anything that is not a positive integer is
/// rejected rather than silently dropped.
pub fn parse_tag_ids(raw: &str) -> Result<Vec<i64>, ApiError> {
    raw.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.parse::<i64>() {
            Ok(id) if id > 0 => Ok(id),
            _ => Err(ApiError::validation_error(format!(
                "Invalid tag id: {}",
                segment
            ))),
        })
        .collect()
}
