//! Learner progress for Lectern.
//!
//! - [`tracker`]: lesson views and completions, module and course status,
//!   navigation overlay, dashboard
//! - [`knowledge`]: knowledge check grading and module advancement
//!
//! Lesson state moves `not_started → in_progress → completed` and never
//! back, except through an explicit course reset. Module and course state
//! are derived from lesson rows against the current content.

pub mod error;
pub mod knowledge;
pub mod tracker;

pub use error::{Error, Result};
pub use knowledge::{Answers, KnowledgeCheckResult, KnowledgeEngine, QuestionResult};
pub use tracker::{CompletionOutcome, DashboardEntry, LessonState, ProgressTracker};
