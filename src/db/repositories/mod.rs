//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the queries for a specific entity.

pub mod question;
pub mod session;
pub mod tag;

pub use question::{CreateOutcome, QuestionRepository, SelectionRejection, SqlxQuestionRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use tag::{SqlxTagRepository, TagRepository};

/// Build a `?, ?, ?` placeholder list for an `IN (...)` clause.
///
/// Callers must skip the query when `count` is zero; `IN ()` is invalid SQL.
pub(crate) fn in_placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_placeholders() {
        assert_eq!(in_placeholders(1), "?");
        assert_eq!(in_placeholders(3), "?, ?, ?");
        assert_eq!(in_placeholders(0), "");
    }
}
