//! Services layer - Business logic
//!
//! This module contains the business logic of the question board.
//! Services are responsible for:
//! - Enforcing the tag category rules on create and search
//! - Coordinating between repositories
//! - Handling validation and error cases

pub mod assembler;
pub mod question;
pub mod tag;

pub use assembler::ResultAssembler;
pub use question::{QuestionService, QuestionServiceError, SearchOutcome};
pub use tag::{TagService, TagServiceError};
