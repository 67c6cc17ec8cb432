//! Course content resolution for Lectern.
//!
//! Reads course and module configuration (YAML) and lessons (MDX) from a
//! content directory, compiles lessons to HTML, caches the results, and
//! assembles navigation trees.
//!
//! # Modules
//!
//! - [`markdown`]: Frontmatter extraction and MDX compilation
//! - [`model`]: Course, module, lesson, and knowledge check types
//! - [`loader`]: Reading a course directory from disk
//! - [`freshness`]: Path + mtime fingerprints used to invalidate the cache
//! - [`resolver`]: [`ContentResolver`], the cached entry point
//! - [`navigation`]: [`NavigationTree`] and status enums
//! - [`validate`]: Whole-tree content checks
//!
//! # Layout
//!
//! ```text
//! content/
//!   rust-101/
//!     course.yaml
//!     01-ownership/
//!       module.yaml
//!       01-what-is-ownership.mdx
//!       02-moves.mdx
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use lectern_content::ContentResolver;
//!
//! # async fn run() -> lectern_content::Result<()> {
//! let resolver = ContentResolver::new("content");
//! let nav = resolver.navigation("rust-101").await?;
//! println!("{} lessons", nav.total_lessons);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod freshness;
pub mod loader;
pub mod markdown;
pub mod model;
pub mod navigation;
pub mod resolver;
pub mod validate;

pub use error::{Error, Result};
pub use markdown::{
    CompiledLesson, FrontmatterResult, Heading, compile_mdx, extract_frontmatter,
    strip_frontmatter,
};
pub use model::{
    Course, CourseSummary, KnowledgeCheck, Lesson, LessonSummary, Module, PublicKnowledgeCheck,
    PublicQuestion, Question,
};
pub use navigation::{
    LearnerState, LessonRef, LessonStatus, ModuleStatus, NavLesson, NavModule, NavigationTree,
};
pub use resolver::ContentResolver;
pub use validate::{ContentIssue, Severity};
