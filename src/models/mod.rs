//! Data models
//!
//! This module contains the data structures shared by the repositories,
//! services and API layer:
//! - Database entities (Tag, Question, Session)
//! - Creation input and pagination types

mod question;
mod session;
mod tag;

pub use question::{CreateQuestionInput, ListParams, PagedResult, Question, QuestionWithTags};
pub use session::Session;
pub use tag::{QuestionTag, Tag};
