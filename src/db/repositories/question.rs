//! Question repository
//!
//! Database operations for questions and their tag links.
//!
//! This module provides:
//! - `QuestionRepository` trait defining the interface for question data access
//! - `SqlxQuestionRepository` implementing the trait for SQLite and MySQL
//!
//! Creation runs in a single transaction: the question row, tag resolution,
//! rule validation and link rows either all commit or leave nothing behind.
//! Link rows are never written anywhere else.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{CreateQuestionInput, Question, Tag};
use crate::rules::{self, RuleSet, Violation};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::collections::BTreeSet;
use std::sync::Arc;

use super::in_placeholders;
use super::tag::{row_to_tag_mysql, row_to_tag_sqlite, tags_by_ids_sql, unresolved_ids};

const INSERT_QUESTION: &str = r#"
    INSERT INTO questions (title, content, author_id, created_at)
    VALUES (?, ?, ?, ?)
"#;

const INSERT_QUESTION_TAG: &str = "INSERT INTO question_tags (question_id, tag_id) VALUES (?, ?)";

const SELECT_QUESTION_BY_ID: &str = r#"
    SELECT id, title, content, author_id, created_at
    FROM questions
    WHERE id = ?
"#;

const LIST_QUESTIONS: &str = r#"
    SELECT id, title, content, author_id, created_at
    FROM questions
    ORDER BY created_at DESC, id DESC
    LIMIT ? OFFSET ?
"#;

const COUNT_QUESTIONS: &str = "SELECT COUNT(*) AS total FROM questions";

const LIST_QUESTIONS_BY_AUTHOR: &str = r#"
    SELECT id, title, content, author_id, created_at
    FROM questions
    WHERE author_id = ?
    ORDER BY created_at DESC, id DESC
    LIMIT ? OFFSET ?
"#;

const COUNT_QUESTIONS_BY_AUTHOR: &str =
    "SELECT COUNT(*) AS total FROM questions WHERE author_id = ?";

const DELETE_QUESTION_TAGS: &str = "DELETE FROM question_tags WHERE question_id = ?";

const DELETE_QUESTION: &str = "DELETE FROM questions WHERE id = ?";

/// Why a tag selection was refused inside the creation transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionRejection {
    /// Requested ids with no matching tag, ascending
    UnknownTags(Vec<i64>),
    /// The resolved tags broke a category rule
    Violation(Violation),
}

/// Result of a creation attempt that reached the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// Committed; carries the new question id
    Created(i64),
    /// Rolled back; nothing was persisted
    Rejected(SelectionRejection),
}

/// Question repository trait
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Insert a question and link it to its tags in one transaction.
    ///
    /// Tag ids are deduplicated, resolved and checked against `rules` inside
    /// the transaction. A rejection rolls the question row back.
    async fn create_with_tags(
        &self,
        input: &CreateQuestionInput,
        rules: &RuleSet,
    ) -> Result<CreateOutcome>;

    /// Get question by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Question>>;

    /// List questions, newest first
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Question>>;

    /// Count all questions
    async fn count(&self) -> Result<i64>;

    /// List one author's questions, newest first
    async fn list_by_author(&self, author_id: i64, offset: i64, limit: i64)
        -> Result<Vec<Question>>;

    /// Count one author's questions
    async fn count_by_author(&self, author_id: i64) -> Result<i64>;

    /// List questions linked to every one of `tag_ids` (they may carry more),
    /// newest first. `tag_ids` must be non-empty and distinct.
    async fn search_all_tags(&self, tag_ids: &[i64], offset: i64, limit: i64)
        -> Result<Vec<Question>>;

    /// Count the questions `search_all_tags` would match, ignoring pagination
    async fn count_all_tags(&self, tag_ids: &[i64]) -> Result<i64>;

    /// Delete a question and its links. Returns false when no row matched.
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based question repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxQuestionRepository {
    pool: DynDatabasePool,
}

impl SqlxQuestionRepository {
    /// Create a new SQLx question repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn QuestionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl QuestionRepository for SqlxQuestionRepository {
    async fn create_with_tags(
        &self,
        input: &CreateQuestionInput,
        rules: &RuleSet,
    ) -> Result<CreateOutcome> {
        let tag_ids: Vec<i64> = input
            .tag_ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_question_sqlite(self.pool.sqlite()?, input, &tag_ids, rules).await
            }
            DatabaseDriver::Mysql => {
                create_question_mysql(self.pool.mysql()?, input, &tag_ids, rules).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Question>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_question_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_question_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Question>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_questions_sqlite(self.pool.sqlite()?, offset, limit).await
            }
            DatabaseDriver::Mysql => list_questions_mysql(self.pool.mysql()?, offset, limit).await,
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_questions_sqlite(self.pool.sqlite()?).await,
            DatabaseDriver::Mysql => count_questions_mysql(self.pool.mysql()?).await,
        }
    }

    async fn list_by_author(
        &self,
        author_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Question>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_questions_by_author_sqlite(self.pool.sqlite()?, author_id, offset, limit)
                    .await
            }
            DatabaseDriver::Mysql => {
                list_questions_by_author_mysql(self.pool.mysql()?, author_id, offset, limit).await
            }
        }
    }

    async fn count_by_author(&self, author_id: i64) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_questions_by_author_sqlite(self.pool.sqlite()?, author_id).await
            }
            DatabaseDriver::Mysql => {
                count_questions_by_author_mysql(self.pool.mysql()?, author_id).await
            }
        }
    }

    async fn search_all_tags(
        &self,
        tag_ids: &[i64],
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Question>> {
        if tag_ids.is_empty() {
            return Ok(Vec::new());
        }
        tracing::debug!(tags = tag_ids.len(), offset, limit, "Searching questions by tags");
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                search_all_tags_sqlite(self.pool.sqlite()?, tag_ids, offset, limit).await
            }
            DatabaseDriver::Mysql => {
                search_all_tags_mysql(self.pool.mysql()?, tag_ids, offset, limit).await
            }
        }
    }

    async fn count_all_tags(&self, tag_ids: &[i64]) -> Result<i64> {
        if tag_ids.is_empty() {
            return Ok(0);
        }
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_all_tags_sqlite(self.pool.sqlite()?, tag_ids).await,
            DatabaseDriver::Mysql => count_all_tags_mysql(self.pool.mysql()?, tag_ids).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_question_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => delete_question_mysql(self.pool.mysql()?, id).await,
        }
    }
}

/// Questions carrying every requested tag. The threshold is bound as the
/// number of distinct requested ids.
fn search_all_tags_sql(count: usize) -> String {
    format!(
        r#"
        SELECT q.id, q.title, q.content, q.author_id, q.created_at
        FROM questions q
        JOIN question_tags qt ON qt.question_id = q.id
        WHERE qt.tag_id IN ({})
        GROUP BY q.id, q.title, q.content, q.author_id, q.created_at
        HAVING COUNT(DISTINCT qt.tag_id) = ?
        ORDER BY q.created_at DESC, q.id DESC
        LIMIT ? OFFSET ?
        "#,
        in_placeholders(count)
    )
}

fn count_all_tags_sql(count: usize) -> String {
    format!(
        r#"
        SELECT COUNT(*) AS total FROM (
            SELECT qt.question_id
            FROM question_tags qt
            WHERE qt.tag_id IN ({})
            GROUP BY qt.question_id
            HAVING COUNT(DISTINCT qt.tag_id) = ?
        ) matched
        "#,
        in_placeholders(count)
    )
}

/// Decide whether a resolved selection may be linked
fn check_selection(
    requested: &[i64],
    resolved: &[Tag],
    rules: &RuleSet,
) -> Option<SelectionRejection> {
    let missing = unresolved_ids(requested, resolved);
    if !missing.is_empty() {
        return Some(SelectionRejection::UnknownTags(missing));
    }
    rules::validate(resolved, rules)
        .err()
        .map(SelectionRejection::Violation)
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_question_sqlite(
    pool: &SqlitePool,
    input: &CreateQuestionInput,
    tag_ids: &[i64],
    rules: &RuleSet,
) -> Result<CreateOutcome> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let question_id = sqlx::query(INSERT_QUESTION)
        .bind(&input.title)
        .bind(&input.content)
        .bind(input.author_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .context("Failed to create question")?
        .last_insert_rowid();

    let resolved = if tag_ids.is_empty() {
        Vec::new()
    } else {
        let sql = tags_by_ids_sql(tag_ids.len());
        let mut query = sqlx::query(&sql);
        for id in tag_ids {
            query = query.bind(*id);
        }
        let rows = query
            .fetch_all(&mut *tx)
            .await
            .context("Failed to resolve tags")?;
        rows.iter().map(row_to_tag_sqlite).collect::<Vec<_>>()
    };

    if let Some(rejection) = check_selection(tag_ids, &resolved, rules) {
        tx.rollback().await.context("Failed to roll back question")?;
        return Ok(CreateOutcome::Rejected(rejection));
    }

    for tag in &resolved {
        sqlx::query(INSERT_QUESTION_TAG)
            .bind(question_id)
            .bind(tag.id)
            .execute(&mut *tx)
            .await
            .context("Failed to link tag to question")?;
    }

    tx.commit().await.context("Failed to commit question")?;

    Ok(CreateOutcome::Created(question_id))
}

async fn get_question_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Question>> {
    let row = sqlx::query(SELECT_QUESTION_BY_ID)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get question by ID")?;

    Ok(row.as_ref().map(row_to_question_sqlite))
}

async fn list_questions_sqlite(pool: &SqlitePool, offset: i64, limit: i64) -> Result<Vec<Question>> {
    let rows = sqlx::query(LIST_QUESTIONS)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list questions")?;

    Ok(rows.iter().map(row_to_question_sqlite).collect())
}

async fn count_questions_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query(COUNT_QUESTIONS)
        .fetch_one(pool)
        .await
        .context("Failed to count questions")?;

    Ok(row.get("total"))
}

async fn list_questions_by_author_sqlite(
    pool: &SqlitePool,
    author_id: i64,
    offset: i64,
    limit: i64,
) -> Result<Vec<Question>> {
    let rows = sqlx::query(LIST_QUESTIONS_BY_AUTHOR)
        .bind(author_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list questions by author")?;

    Ok(rows.iter().map(row_to_question_sqlite).collect())
}

async fn count_questions_by_author_sqlite(pool: &SqlitePool, author_id: i64) -> Result<i64> {
    let row = sqlx::query(COUNT_QUESTIONS_BY_AUTHOR)
        .bind(author_id)
        .fetch_one(pool)
        .await
        .context("Failed to count questions by author")?;

    Ok(row.get("total"))
}

async fn search_all_tags_sqlite(
    pool: &SqlitePool,
    tag_ids: &[i64],
    offset: i64,
    limit: i64,
) -> Result<Vec<Question>> {
    let sql = search_all_tags_sql(tag_ids.len());
    let mut query = sqlx::query(&sql);
    for id in tag_ids {
        query = query.bind(*id);
    }

    let rows = query
        .bind(tag_ids.len() as i64)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to search questions by tags")?;

    Ok(rows.iter().map(row_to_question_sqlite).collect())
}

async fn count_all_tags_sqlite(pool: &SqlitePool, tag_ids: &[i64]) -> Result<i64> {
    let sql = count_all_tags_sql(tag_ids.len());
    let mut query = sqlx::query(&sql);
    for id in tag_ids {
        query = query.bind(*id);
    }

    let row = query
        .bind(tag_ids.len() as i64)
        .fetch_one(pool)
        .await
        .context("Failed to count questions by tags")?;

    Ok(row.get("total"))
}

async fn delete_question_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(DELETE_QUESTION_TAGS)
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete question tags")?;

    let deleted = sqlx::query(DELETE_QUESTION)
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete question")?
        .rows_affected();

    tx.commit().await.context("Failed to commit question delete")?;

    Ok(deleted > 0)
}

fn row_to_question_sqlite(row: &sqlx::sqlite::SqliteRow) -> Question {
    Question {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        author_id: row.get("author_id"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_question_mysql(
    pool: &MySqlPool,
    input: &CreateQuestionInput,
    tag_ids: &[i64],
    rules: &RuleSet,
) -> Result<CreateOutcome> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let question_id = sqlx::query(INSERT_QUESTION)
        .bind(&input.title)
        .bind(&input.content)
        .bind(input.author_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .context("Failed to create question")?
        .last_insert_id() as i64;

    let resolved = if tag_ids.is_empty() {
        Vec::new()
    } else {
        let sql = tags_by_ids_sql(tag_ids.len());
        let mut query = sqlx::query(&sql);
        for id in tag_ids {
            query = query.bind(*id);
        }
        let rows = query
            .fetch_all(&mut *tx)
            .await
            .context("Failed to resolve tags")?;
        rows.iter().map(row_to_tag_mysql).collect::<Vec<_>>()
    };

    if let Some(rejection) = check_selection(tag_ids, &resolved, rules) {
        tx.rollback().await.context("Failed to roll back question")?;
        return Ok(CreateOutcome::Rejected(rejection));
    }

    for tag in &resolved {
        sqlx::query(INSERT_QUESTION_TAG)
            .bind(question_id)
            .bind(tag.id)
            .execute(&mut *tx)
            .await
            .context("Failed to link tag to question")?;
    }

    tx.commit().await.context("Failed to commit question")?;

    Ok(CreateOutcome::Created(question_id))
}

async fn get_question_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Question>> {
    let row = sqlx::query(SELECT_QUESTION_BY_ID)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get question by ID")?;

    Ok(row.as_ref().map(row_to_question_mysql))
}

async fn list_questions_mysql(pool: &MySqlPool, offset: i64, limit: i64) -> Result<Vec<Question>> {
    let rows = sqlx::query(LIST_QUESTIONS)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list questions")?;

    Ok(rows.iter().map(row_to_question_mysql).collect())
}

async fn count_questions_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query(COUNT_QUESTIONS)
        .fetch_one(pool)
        .await
        .context("Failed to count questions")?;

    Ok(row.get("total"))
}

async fn list_questions_by_author_mysql(
    pool: &MySqlPool,
    author_id: i64,
    offset: i64,
    limit: i64,
) -> Result<Vec<Question>> {
    let rows = sqlx::query(LIST_QUESTIONS_BY_AUTHOR)
        .bind(author_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list questions by author")?;

    Ok(rows.iter().map(row_to_question_mysql).collect())
}

async fn count_questions_by_author_mysql(pool: &MySqlPool, author_id: i64) -> Result<i64> {
    let row = sqlx::query(COUNT_QUESTIONS_BY_AUTHOR)
        .bind(author_id)
        .fetch_one(pool)
        .await
        .context("Failed to count questions by author")?;

    Ok(row.get("total"))
}

async fn search_all_tags_mysql(
    pool: &MySqlPool,
    tag_ids: &[i64],
    offset: i64,
    limit: i64,
) -> Result<Vec<Question>> {
    let sql = search_all_tags_sql(tag_ids.len());
    let mut query = sqlx::query(&sql);
    for id in tag_ids {
        query = query.bind(*id);
    }

    let rows = query
        .bind(tag_ids.len() as i64)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to search questions by tags")?;

    Ok(rows.iter().map(row_to_question_mysql).collect())
}

async fn count_all_tags_mysql(pool: &MySqlPool, tag_ids: &[i64]) -> Result<i64> {
    let sql = count_all_tags_sql(tag_ids.len());
    let mut query = sqlx::query(&sql);
    for id in tag_ids {
        query = query.bind(*id);
    }

    let row = query
        .bind(tag_ids.len() as i64)
        .fetch_one(pool)
        .await
        .context("Failed to count questions by tags")?;

    Ok(row.get("total"))
}

async fn delete_question_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(DELETE_QUESTION_TAGS)
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete question tags")?;

    let deleted = sqlx::query(DELETE_QUESTION)
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete question")?
        .rows_affected();

    tx.commit().await.context("Failed to commit question delete")?;

    Ok(deleted > 0)
}

fn row_to_question_mysql(row: &sqlx::mysql::MySqlRow) -> Question {
    Question {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        author_id: row.get("author_id"),
        created_at: row.get("created_at"),
    }
}
