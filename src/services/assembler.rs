//! Result assembler
//!
//! Attaches each question's tags in one batched query, whatever the number
//! of questions on the page.

use crate::db::repositories::TagRepository;
use crate::models::{Question, QuestionWithTags, Tag};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Enriches questions with their tags
pub struct ResultAssembler {
    tags: Arc<dyn TagRepository>,
}

impl ResultAssembler {
    pub fn new(tags: Arc<dyn TagRepository>) -> Self {
        Self { tags }
    }

    /// Attach tags to every question, preserving the input order.
    ///
    /// Tags are sorted by name. A failed lookup fails the whole batch.
    pub async fn attach_tags(&self, questions: Vec<Question>) -> Result<Vec<QuestionWithTags>> {
        if questions.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = questions.iter().map(|q| q.id).collect();
        let links = self
            .tags
            .get_for_questions(&ids)
            .await
            .context("Failed to load question tags")?;

        let mut by_question: HashMap<i64, Vec<Tag>> = HashMap::with_capacity(ids.len());
        for link in links {
            by_question.entry(link.question_id).or_default().push(link.tag);
        }

        Ok(questions
            .into_iter()
            .map(|question| {
                let mut tags = by_question.remove(&question.id).unwrap_or_default();
                tags.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
                QuestionWithTags { question, tags }
            })
            .collect())
    }

    /// Attach tags to a single question
    pub async fn attach_one(&self, question: Question) -> Result<QuestionWithTags> {
        let mut assembled = self.attach_tags(vec![question]).await?;
        assembled
            .pop()
            .context("Assembled result is missing its question")
    }
}
