//! Database layer
//!
//! Storage for tags, questions, their tag links and the session lookup table.
//! SQLite is the default backend; MySQL is selected through
//! `database.driver` in the configuration.
//!
//! Everything above this module talks to a [`DynDatabasePool`]. Repositories
//! pick the backend-specific query function via [`DatabasePool::sqlite`] or
//! [`DatabasePool::mysql`], so a wrong backend is an error rather than a panic.
//!
//! ```ignore
//! let pool = tutome::db::create_pool(&config.database).await?;
//! tutome::db::migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
