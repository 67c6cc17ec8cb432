//! Course, module, lesson, and knowledge check types.
//!
//! `*Config` types mirror the YAML files on disk. The resolved types
//! ([`Course`], [`Module`], [`LessonSummary`], [`Lesson`]) carry slugs,
//! final ordering, and file locations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::markdown::Heading;

/// Default passing score for knowledge checks, in percent.
pub const DEFAULT_PASSING_SCORE: u8 = 70;

fn default_true() -> bool {
    true
}

fn default_passing_score() -> u8 {
    DEFAULT_PASSING_SCORE
}

/// `course.yaml`
#[derive(Debug, Clone, Deserialize)]
pub struct CourseConfig {
    /// Display title.
    pub title: String,
    /// Short description for listings.
    #[serde(default)]
    pub description: Option<String>,
    /// Unpublished courses are hidden from listings.
    #[serde(default = "default_true")]
    pub published: bool,
    /// Module directory names in order. Discovered when absent.
    #[serde(default)]
    pub modules: Option<Vec<String>>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// `module.yaml`
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleConfig {
    /// Display title.
    pub title: String,
    /// Short description.
    #[serde(default)]
    pub description: Option<String>,
    /// Lesson file stems in order. Discovered when absent.
    #[serde(default)]
    pub lessons: Option<Vec<String>>,
    /// Quiz gating progression to the next module.
    #[serde(default)]
    pub knowledge_check: Option<KnowledgeCheck>,
}

/// Lesson frontmatter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LessonFrontmatter {
    /// Display title. Falls back to the first heading, then the slug.
    pub title: Option<String>,
    /// Short description.
    pub description: Option<String>,
    /// Author's estimate of time needed.
    pub duration_minutes: Option<u32>,
    /// Sort key used when the module does not list lessons explicitly.
    pub order: Option<i64>,
    /// Drafts are hidden unless drafts are enabled.
    #[serde(default)]
    pub draft: bool,
}

/// A knowledge check as configured, including answer keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeCheck {
    /// Minimum score (0-100) that passes.
    #[serde(default = "default_passing_score")]
    pub passing_score: u8,
    /// Questions in display order.
    pub questions: Vec<Question>,
}

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Identifier unique within the check.
    pub id: String,
    /// Question text (Markdown).
    pub prompt: String,
    /// Answer options in display order.
    pub choices: Vec<String>,
    /// Index into `choices` of the correct option.
    pub answer: usize,
    /// Shown after submission.
    #[serde(default)]
    pub explanation: Option<String>,
}

impl KnowledgeCheck {
    /// The check with answer keys and explanations removed.
    pub fn to_public(&self) -> PublicKnowledgeCheck {
        PublicKnowledgeCheck {
            passing_score: self.passing_score,
            questions: self
                .questions
                .iter()
                .map(|q| PublicQuestion {
                    id: q.id.clone(),
                    prompt: q.prompt.clone(),
                    choices: q.choices.clone(),
                })
                .collect(),
        }
    }

    /// Look up a question by id.
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

/// A knowledge check as shown to learners.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicKnowledgeCheck {
    /// Minimum score (0-100) that passes.
    pub passing_score: u8,
    /// Questions without answers.
    pub questions: Vec<PublicQuestion>,
}

/// A question without its answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicQuestion {
    /// Identifier unique within the check.
    pub id: String,
    /// Question text.
    pub prompt: String,
    /// Answer options.
    pub choices: Vec<String>,
}

/// A resolved course.
#[derive(Debug, Clone, Serialize)]
pub struct Course {
    /// URL slug.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// Short description.
    pub description: Option<String>,
    /// Listed in the catalogue.
    pub published: bool,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Modules in order.
    pub modules: Vec<Module>,
    /// Course directory.
    #[serde(skip)]
    pub dir: PathBuf,
}

/// A resolved module.
#[derive(Debug, Clone, Serialize)]
pub struct Module {
    /// URL slug, unique within the course.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// Short description.
    pub description: Option<String>,
    /// Lessons in order (drafts removed unless enabled).
    pub lessons: Vec<LessonSummary>,
    /// Optional quiz gating the next module.
    #[serde(skip)]
    pub knowledge_check: Option<KnowledgeCheck>,
    /// Module directory.
    #[serde(skip)]
    pub dir: PathBuf,
}

/// Lesson metadata without the compiled body.
#[derive(Debug, Clone, Serialize)]
pub struct LessonSummary {
    /// URL slug, unique within the module.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// Short description.
    pub description: Option<String>,
    /// Author's time estimate.
    pub duration_minutes: Option<u32>,
    /// Marked as draft in frontmatter.
    pub draft: bool,
    /// Source file.
    #[serde(skip)]
    pub path: PathBuf,
}

/// A lesson with its compiled body.
#[derive(Debug, Clone, Serialize)]
pub struct Lesson {
    /// Course slug.
    pub course: String,
    /// Module slug.
    pub module: String,
    /// Lesson slug.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// Short description.
    pub description: Option<String>,
    /// Author's estimate, or the computed reading time.
    pub duration_minutes: u32,
    /// Rendered body.
    pub html: String,
    /// Heading outline for a table of contents.
    pub headings: Vec<Heading>,
    /// Components the frontend must provide.
    pub components: Vec<String>,
    /// Prose word count.
    pub word_count: usize,
}

/// Course listing entry.
#[derive(Debug, Clone, Serialize)]
pub struct CourseSummary {
    /// URL slug.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// Short description.
    pub description: Option<String>,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Number of modules.
    pub module_count: usize,
    /// Number of lessons across modules.
    pub lesson_count: usize,
}

impl Course {
    /// Find a module by slug.
    pub fn module(&self, slug: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.slug == slug)
    }

    /// Position of a module in course order.
    pub fn module_index(&self, slug: &str) -> Option<usize> {
        self.modules.iter().position(|m| m.slug == slug)
    }

    /// The module after `slug`, if there is one.
    pub fn next_module(&self, slug: &str) -> Option<&Module> {
        self.module_index(slug)
            .and_then(|index| self.modules.get(index + 1))
    }

    /// Find a lesson by module and lesson slug.
    pub fn lesson(&self, module: &str, lesson: &str) -> Option<&LessonSummary> {
        self.module(module)?.lesson(lesson)
    }

    /// Total lessons across all modules.
    pub fn total_lessons(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }

    /// Modules that have a knowledge check.
    pub fn gated_modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter().filter(|m| m.knowledge_check.is_some())
    }

    /// Listing entry for this course.
    pub fn summary(&self) -> CourseSummary {
        CourseSummary {
            slug: self.slug.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            module_count: self.modules.len(),
            lesson_count: self.total_lessons(),
        }
    }
}

impl Module {
    /// Find a lesson by slug.
    pub fn lesson(&self, slug: &str) -> Option<&LessonSummary> {
        self.lessons.iter().find(|l| l.slug == slug)
    }
}
