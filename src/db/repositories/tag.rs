//! Tag repository
//!
//! Database operations for tags.
//!
//! This module provides:
//! - `TagRepository` trait defining the interface for tag data access
//! - `SqlxTagRepository` implementing the trait for SQLite and MySQL
//!
//! Tags are administered outside this service. Apart from `create`, which
//! seeds the catalog, everything here is a read.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{QuestionTag, Tag};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::collections::BTreeSet;
use std::sync::Arc;

use super::in_placeholders;

const SELECT_TAG_COLUMNS: &str = "SELECT id, name, category FROM tags";

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Create a new tag
    async fn create(&self, name: &str, category: &str) -> Result<Tag>;

    /// Get tag by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    /// List all tags ordered by name
    async fn list(&self) -> Result<Vec<Tag>>;

    /// Get the tags matching `ids`. Unknown ids are simply absent from the result.
    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Tag>>;

    /// Get the tags linked to each of `question_ids` in a single query,
    /// ordered by question then tag name
    async fn get_for_questions(&self, question_ids: &[i64]) -> Result<Vec<QuestionTag>>;
}

/// SQLx-based tag repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    /// Create a new SQLx tag repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, name: &str, category: &str) -> Result<Tag> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_tag_sqlite(self.pool.sqlite()?, name, category).await,
            DatabaseDriver::Mysql => create_tag_mysql(self.pool.mysql()?, name, category).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_tag_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_tag_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_tags_sqlite(self.pool.sqlite()?).await,
            DatabaseDriver::Mysql => list_tags_mysql(self.pool.mysql()?).await,
        }
    }

    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Tag>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_tags_by_ids_sqlite(self.pool.sqlite()?, ids).await,
            DatabaseDriver::Mysql => get_tags_by_ids_mysql(self.pool.mysql()?, ids).await,
        }
    }

    async fn get_for_questions(&self, question_ids: &[i64]) -> Result<Vec<QuestionTag>> {
        if question_ids.is_empty() {
            return Ok(Vec::new());
        }
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_tags_for_questions_sqlite(self.pool.sqlite()?, question_ids).await
            }
            DatabaseDriver::Mysql => {
                get_tags_for_questions_mysql(self.pool.mysql()?, question_ids).await
            }
        }
    }
}

/// Tags whose id is in a list of `count` bound ids, ordered by name
pub(crate) fn tags_by_ids_sql(count: usize) -> String {
    format!(
        "{} WHERE id IN ({}) ORDER BY name, id",
        SELECT_TAG_COLUMNS,
        in_placeholders(count)
    )
}

/// Ids in `requested` that have no tag in `resolved`, in request order
pub(crate) fn unresolved_ids(requested: &[i64], resolved: &[Tag]) -> Vec<i64> {
    let found: BTreeSet<i64> = resolved.iter().map(|tag| tag.id).collect();
    requested
        .iter()
        .copied()
        .filter(|id| !found.contains(id))
        .collect()
}

fn tags_for_questions_sql(count: usize) -> String {
    format!(
        r#"
        SELECT qt.question_id, t.id, t.name, t.category
        FROM question_tags qt
        JOIN tags t ON t.id = qt.tag_id
        WHERE qt.question_id IN ({})
        ORDER BY qt.question_id, t.name, t.id
        "#,
        in_placeholders(count)
    )
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_tag_sqlite(pool: &SqlitePool, name: &str, category: &str) -> Result<Tag> {
    let result = sqlx::query("INSERT INTO tags (name, category, created_at) VALUES (?, ?, ?)")
        .bind(name)
        .bind(category)
        .bind(Utc::now())
        .execute(pool)
        .await
        .context("Failed to create tag")?;

    Ok(Tag::new(result.last_insert_rowid(), name, category))
}

async fn get_tag_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Tag>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_TAG_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by ID")?;

    Ok(row.as_ref().map(row_to_tag_sqlite))
}

async fn list_tags_sqlite(pool: &SqlitePool) -> Result<Vec<Tag>> {
    let rows = sqlx::query(&format!("{} ORDER BY name, id", SELECT_TAG_COLUMNS))
        .fetch_all(pool)
        .await
        .context("Failed to list tags")?;

    Ok(rows.iter().map(row_to_tag_sqlite).collect())
}

async fn get_tags_by_ids_sqlite(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<Tag>> {
    let sql = tags_by_ids_sql(ids.len());
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(*id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to get tags by IDs")?;

    Ok(rows.iter().map(row_to_tag_sqlite).collect())
}

async fn get_tags_for_questions_sqlite(
    pool: &SqlitePool,
    question_ids: &[i64],
) -> Result<Vec<QuestionTag>> {
    let sql = tags_for_questions_sql(question_ids.len());
    let mut query = sqlx::query(&sql);
    for id in question_ids {
        query = query.bind(*id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to get tags for questions")?;

    Ok(rows
        .iter()
        .map(|row| QuestionTag {
            question_id: row.get("question_id"),
            tag: row_to_tag_sqlite(row),
        })
        .collect())
}

pub(crate) fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        category: row.get("category"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_tag_mysql(pool: &MySqlPool, name: &str, category: &str) -> Result<Tag> {
    let result = sqlx::query("INSERT INTO tags (name, category, created_at) VALUES (?, ?, ?)")
        .bind(name)
        .bind(category)
        .bind(Utc::now())
        .execute(pool)
        .await
        .context("Failed to create tag")?;

    Ok(Tag::new(result.last_insert_id() as i64, name, category))
}

async fn get_tag_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Tag>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_TAG_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by ID")?;

    Ok(row.as_ref().map(row_to_tag_mysql))
}

async fn list_tags_mysql(pool: &MySqlPool) -> Result<Vec<Tag>> {
    let rows = sqlx::query(&format!("{} ORDER BY name, id", SELECT_TAG_COLUMNS))
        .fetch_all(pool)
        .await
        .context("Failed to list tags")?;

    Ok(rows.iter().map(row_to_tag_mysql).collect())
}

async fn get_tags_by_ids_mysql(pool: &MySqlPool, ids: &[i64]) -> Result<Vec<Tag>> {
    let sql = tags_by_ids_sql(ids.len());
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(*id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to get tags by IDs")?;

    Ok(rows.iter().map(row_to_tag_mysql).collect())
}

async fn get_tags_for_questions_mysql(
    pool: &MySqlPool,
    question_ids: &[i64],
) -> Result<Vec<QuestionTag>> {
    let sql = tags_for_questions_sql(question_ids.len());
    let mut query = sqlx::query(&sql);
    for id in question_ids {
        query = query.bind(*id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to get tags for questions")?;

    Ok(rows
        .iter()
        .map(|row| QuestionTag {
            question_id: row.get("question_id"),
            tag: row_to_tag_mysql(row),
        })
        .collect())
}

pub(crate) fn row_to_tag_mysql(row: &sqlx::mysql::MySqlRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        category: row.get("category"),
    }
}
