//! Question service
//!
//! Implements business logic for questions:
//! - Transactional creation under the creation rule set
//! - Multi-tag search ("has all of these tags") under the search rule set
//! - Listing newest first, by author or by a single tag
//! - Deletion by the author
//!
//! Every returned question carries its tags, loaded by [`ResultAssembler`].

use crate::db::repositories::{CreateOutcome, QuestionRepository, SelectionRejection};
use crate::models::{CreateQuestionInput, ListParams, PagedResult, QuestionWithTags};
use crate::rules::{self, RuleSet, SelectionSummary, Violation};
use crate::services::assembler::ResultAssembler;
use crate::services::tag::{TagService, TagServiceError};
use anyhow::Context;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Error types for question service operations
#[derive(Debug, thiserror::Error)]
pub enum QuestionServiceError {
    /// Malformed input (empty title, non-positive id, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Some requested tag ids do not exist
    #[error("Unknown tag ids: {0:?}")]
    UnknownTags(Vec<i64>),

    /// The tag selection broke a category rule. Search rejections carry the
    /// per-category counts of the request.
    #[error("{violation}")]
    Violation {
        violation: Violation,
        counts: Option<SelectionSummary>,
    },

    /// Question not found
    #[error("Question not found")]
    NotFound,

    /// Caller is not allowed to touch the question
    #[error("Only the author may delete this question")]
    Forbidden,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<TagServiceError> for QuestionServiceError {
    fn from(err: TagServiceError) -> Self {
        match err {
            TagServiceError::UnknownTags(ids) => Self::UnknownTags(ids),
            TagServiceError::Internal(e) => Self::Internal(e),
        }
    }
}

impl From<SelectionRejection> for QuestionServiceError {
    fn from(rejection: SelectionRejection) -> Self {
        match rejection {
            SelectionRejection::UnknownTags(ids) => Self::UnknownTags(ids),
            SelectionRejection::Violation(violation) => Self::Violation {
                violation,
                counts: None,
            },
        }
    }
}

/// A page of search results with the request echoed back
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub page: PagedResult<QuestionWithTags>,
    /// Distinct requested tag ids, in request order
    pub search_tags: Vec<i64>,
    /// Category of each requested tag
    pub tag_categories: BTreeMap<i64, String>,
}

/// Default for [`QuestionService::with_max_tag_ids`]
pub const DEFAULT_MAX_TAG_IDS: usize = 64;

/// Question service
pub struct QuestionService {
    repo: Arc<dyn QuestionRepository>,
    tags: Arc<TagService>,
    assembler: ResultAssembler,
    max_tag_ids: usize,
}

impl QuestionService {
    /// Create a new question service
    ///
    /// # Arguments
    /// * `repo` - Question repository for database operations
    /// * `tags` - Tag catalog used to resolve search requests
    pub fn new(repo: Arc<dyn QuestionRepository>, tags: Arc<TagService>) -> Self {
        let assembler = ResultAssembler::new(tags.repository());
        Self {
            repo,
            tags,
            assembler,
            max_tag_ids: DEFAULT_MAX_TAG_IDS,
        }
    }

    /// Cap the number of tag ids a create or search request may carry
    pub fn with_max_tag_ids(mut self, max_tag_ids: usize) -> Self {
        self.max_tag_ids = max_tag_ids;
        self
    }

    /// Create a question with its tags.
    ///
    /// The question row and its tag links are written in one transaction and
    /// checked against `rules` before commit. On any rejection nothing is
    /// persisted.
    ///
    /// # Errors
    /// - `Validation` if the title or content is blank, an id is not positive,
    ///   or more than the configured number of tag ids is given
    /// - `UnknownTags` if any tag id does not exist
    /// - `Violation` if the selection breaks `rules`
    pub async fn create(
        &self,
        input: CreateQuestionInput,
        rules: &RuleSet,
    ) -> Result<QuestionWithTags, QuestionServiceError> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(QuestionServiceError::Validation(
                "Title cannot be empty".to_string(),
            ));
        }
        if input.content.trim().is_empty() {
            return Err(QuestionServiceError::Validation(
                "Content cannot be empty".to_string(),
            ));
        }
        self.check_tag_ids(&input.tag_ids)?;

        let input = CreateQuestionInput {
            title: title.to_string(),
            ..input
        };

        let outcome = self
            .repo
            .create_with_tags(&input, rules)
            .await
            .context("Failed to create question")?;

        let id = match outcome {
            CreateOutcome::Created(id) => id,
            CreateOutcome::Rejected(rejection) => {
                tracing::warn!(
                    author_id = input.author_id,
                    ?rejection,
                    "Question creation rejected"
                );
                return Err(rejection.into());
            }
        };

        tracing::info!(question_id = id, author_id = input.author_id, "Question created");

        // The question is committed at this point; a failed re-read only
        // affects the response.
        self.get(id).await.map_err(|err| {
            tracing::warn!(question_id = id, error = %err, "Failed to reload created question");
            err
        })
    }

    /// Get one question with its tags
    pub async fn get(&self, id: i64) -> Result<QuestionWithTags, QuestionServiceError> {
        let question = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get question")?
            .ok_or(QuestionServiceError::NotFound)?;

        Ok(self.assembler.attach_one(question).await?)
    }

    /// List all questions, newest first
    pub async fn list(
        &self,
        params: &ListParams,
    ) -> Result<PagedResult<QuestionWithTags>, QuestionServiceError> {
        let questions = self
            .repo
            .list(params.offset(), params.limit())
            .await
            .context("Failed to list questions")?;
        let total = self.repo.count().await.context("Failed to count questions")?;

        let items = self.assembler.attach_tags(questions).await?;
        Ok(PagedResult::new(items, total, params))
    }

    /// List one author's questions, newest first
    pub async fn list_by_author(
        &self,
        author_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<QuestionWithTags>, QuestionServiceError> {
        let questions = self
            .repo
            .list_by_author(author_id, params.offset(), params.limit())
            .await
            .context("Failed to list questions by author")?;
        let total = self
            .repo
            .count_by_author(author_id)
            .await
            .context("Failed to count questions by author")?;

        let items = self.assembler.attach_tags(questions).await?;
        Ok(PagedResult::new(items, total, params))
    }

    /// List questions carrying one tag, newest first
    ///
    /// # Errors
    /// - `Validation` if `tag_id` is not positive
    /// - `UnknownTags` if the tag does not exist
    pub async fn list_by_tag(
        &self,
        tag_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<QuestionWithTags>, QuestionServiceError> {
        ensure_positive_ids(&[tag_id])?;
        if self.tags.get_by_id(tag_id).await?.is_none() {
            return Err(QuestionServiceError::UnknownTags(vec![tag_id]));
        }

        self.page_all_tags(&[tag_id], params).await
    }

    /// Find questions tagged with every one of `tag_ids`.
    ///
    /// Questions may carry additional tags. The distinct requested ids must
    /// all exist and satisfy the search `rules`. An empty request falls back
    /// to the newest-first listing. `total` counts every matching question,
    /// not just the page.
    pub async fn search_all_tags(
        &self,
        tag_ids: &[i64],
        rules: &RuleSet,
        params: &ListParams,
    ) -> Result<SearchOutcome, QuestionServiceError> {
        self.check_tag_ids(tag_ids)?;
        let search_tags = distinct_in_order(tag_ids);

        if search_tags.is_empty() {
            return Ok(SearchOutcome {
                page: self.list(params).await?,
                search_tags,
                tag_categories: BTreeMap::new(),
            });
        }

        let resolved = self.tags.resolve(&search_tags).await?;
        if let Err(violation) = rules::validate(&resolved, rules) {
            return Err(QuestionServiceError::Violation {
                violation,
                counts: Some(SelectionSummary::from_tags(&resolved)),
            });
        }

        let tag_categories = resolved
            .iter()
            .map(|tag| (tag.id, tag.category.clone()))
            .collect();
        let page = self.page_all_tags(&search_tags, params).await?;

        Ok(SearchOutcome {
            page,
            search_tags,
            tag_categories,
        })
    }

    /// Delete a question. Only its author may do so.
    ///
    /// # Errors
    /// - `NotFound` if the question does not exist
    /// - `Forbidden` if `user_id` is not the author
    pub async fn delete(&self, id: i64, user_id: i64) -> Result<(), QuestionServiceError> {
        let question = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get question")?
            .ok_or(QuestionServiceError::NotFound)?;

        if !question.is_owned_by(user_id) {
            return Err(QuestionServiceError::Forbidden);
        }

        let deleted = self
            .repo
            .delete(id)
            .await
            .context("Failed to delete question")?;
        if !deleted {
            return Err(QuestionServiceError::NotFound);
        }

        tracing::info!(question_id = id, user_id, "Question deleted");
        Ok(())
    }

    fn check_tag_ids(&self, ids: &[i64]) -> Result<(), QuestionServiceError> {
        if ids.len() > self.max_tag_ids {
            return Err(QuestionServiceError::Validation(format!(
                "At most {} tag ids are allowed, got {}",
                self.max_tag_ids,
                ids.len()
            )));
        }
        ensure_positive_ids(ids)
    }

    async fn page_all_tags(
        &self,
        tag_ids: &[i64],
        params: &ListParams,
    ) -> Result<PagedResult<QuestionWithTags>, QuestionServiceError> {
        let questions = self
            .repo
            .search_all_tags(tag_ids, params.offset(), params.limit())
            .await
            .context("Failed to search questions")?;
        let total = self
            .repo
            .count_all_tags(tag_ids)
            .await
            .context("Failed to count matching questions")?;

        let items = self.assembler.attach_tags(questions).await?;
        Ok(PagedResult::new(items, total, params))
    }
}

fn ensure_positive_ids(ids: &[i64]) -> Result<(), QuestionServiceError> {
    match ids.iter().find(|id| **id <= 0) {
        Some(id) => Err(QuestionServiceError::Validation(format!(
            "Tag id must be a positive integer, got {}",
            id
        ))),
        None => Ok(()),
    }
}

/// Drop repeated ids, keeping the first occurrence
fn distinct_in_order(ids: &[i64]) -> Vec<i64> {
    let mut seen = BTreeSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
