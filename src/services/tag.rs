//! Tag service
//!
//! Read-only access to the tag catalog:
//! - All tags ordered by name
//! - Tags grouped by taxonomy category
//! - Resolution of requested tag ids, reporting the ones that do not exist

use crate::db::repositories::tag::unresolved_ids;
use crate::db::repositories::TagRepository;
use crate::models::Tag;
use anyhow::Context;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    /// Some requested ids have no tag
    #[error("Unknown tag ids: {0:?}")]
    UnknownTags(Vec<i64>),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Tag catalog service
pub struct TagService {
    repo: Arc<dyn TagRepository>,
}

impl TagService {
    /// Create a new tag service
    ///
    /// # Arguments
    /// * `repo` - Tag repository for database operations
    pub fn new(repo: Arc<dyn TagRepository>) -> Self {
        Self { repo }
    }

    /// The underlying repository, shared with the result assembler
    pub fn repository(&self) -> Arc<dyn TagRepository> {
        self.repo.clone()
    }

    /// List every tag ordered by name
    pub async fn list_all(&self) -> Result<Vec<Tag>, TagServiceError> {
        Ok(self.repo.list().await.context("Failed to list tags")?)
    }

    /// Group every tag by category. Categories are ordered by name, as are
    /// the tags inside each group.
    pub async fn list_by_category(&self) -> Result<BTreeMap<String, Vec<Tag>>, TagServiceError> {
        let mut grouped: BTreeMap<String, Vec<Tag>> = BTreeMap::new();
        for tag in self.list_all().await? {
            grouped.entry(tag.category.clone()).or_default().push(tag);
        }
        Ok(grouped)
    }

    /// Get tag by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Tag>, TagServiceError> {
        Ok(self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get tag by ID")?)
    }

    /// Resolve `ids` to tags.
    ///
    /// Duplicates are ignored. Fails with `UnknownTags` listing every id
    /// (ascending) that has no tag.
    ///
    /// # Returns
    /// The resolved tags ordered by name
    pub async fn resolve(&self, ids: &[i64]) -> Result<Vec<Tag>, TagServiceError> {
        let requested: BTreeSet<i64> = ids.iter().copied().collect();
        let requested: Vec<i64> = requested.into_iter().collect();

        let tags = self
            .repo
            .get_by_ids(&requested)
            .await
            .context("Failed to resolve tags")?;

        let missing = unresolved_ids(&requested, &tags);
        if !missing.is_empty() {
            return Err(TagServiceError::UnknownTags(missing));
        }
        Ok(tags)
    }
}
