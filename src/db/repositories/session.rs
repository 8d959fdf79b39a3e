//! Session repository
//!
//! Database operations for user sessions.
//!
//! This module provides:
//! - `SessionRepository` trait defining the interface for session data access
//! - `SqlxSessionRepository` implementing the trait for SQLite and MySQL
//!
//! Sessions are written by the login flow of the surrounding system. The
//! question board only needs to look a token up.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const INSERT_SESSION: &str = r#"
    INSERT INTO sessions (id, user_id, expires_at, created_at)
    VALUES (?, ?, ?, ?)
"#;

const SELECT_SESSION_BY_ID: &str = r#"
    SELECT id, user_id, expires_at, created_at
    FROM sessions
    WHERE id = ?
"#;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create a new session
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Get session by ID (token)
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>>;
}

/// SQLx-based session repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    /// Create a new SQLx session repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_session_sqlite(self.pool.sqlite()?, session).await,
            DatabaseDriver::Mysql => create_session_mysql(self.pool.mysql()?, session).await,
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_session_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_session_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_session_sqlite(pool: &SqlitePool, session: &Session) -> Result<Session> {
    sqlx::query(INSERT_SESSION)
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(pool)
        .await
        .context("Failed to create session")?;

    Ok(session.clone())
}

async fn get_session_by_id_sqlite(pool: &SqlitePool, id: &str) -> Result<Option<Session>> {
    let row = sqlx::query(SELECT_SESSION_BY_ID)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get session by ID")?;

    Ok(row.map(|row| Session {
        id: row.get("id"),
        user_id: row.get("user_id"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }))
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_session_mysql(pool: &MySqlPool, session: &Session) -> Result<Session> {
    sqlx::query(INSERT_SESSION)
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(pool)
        .await
        .context("Failed to create session")?;

    Ok(session.clone())
}

async fn get_session_by_id_mysql(pool: &MySqlPool, id: &str) -> Result<Option<Session>> {
    let row = sqlx::query(SELECT_SESSION_BY_ID)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get session by ID")?;

    Ok(row.map(|row| Session {
        id: row.get("id"),
        user_id: row.get("user_id"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;

    async fn setup_test_repo() -> SqlxSessionRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        sqlx::query("INSERT INTO users (username) VALUES ('member')")
            .execute(pool.as_sqlite().unwrap())
            .await
            .expect("Failed to create test user");
        SqlxSessionRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_get_session() {
        let repo = setup_test_repo().await;
        let session = Session::new("token-abc", 1, Duration::hours(1));

        repo.create(&session).await.expect("Failed to create session");

        let found = repo
            .get_by_id("token-abc")
            .await
            .expect("Failed to get session")
            .expect("Session should exist");
        assert_eq!(found.user_id, 1);
        assert!(!found.is_expired());
    }

    #[tokio::test]
    async fn test_get_unknown_session() {
        let repo = setup_test_repo().await;
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_round_trips_as_expired() {
        let repo = setup_test_repo().await;
        let session = Session::new("old", 1, Duration::minutes(-10));
        repo.create(&session).await.unwrap();

        let found = repo.get_by_id("old").await.unwrap().unwrap();
        assert!(found.is_expired());
    }

    #[tokio::test]
    async fn test_session_requires_existing_user() {
        let repo = setup_test_repo().await;
        let session = Session::new("orphan", 42, Duration::hours(1));

        assert!(repo.create(&session).await.is_err());
    }
}
