//! Navigation trees.
//!
//! A [`NavigationTree`] is the ordered course outline with per-lesson and
//! per-module status, prev/next links that cross module boundaries, and
//! a resume pointer. [`NavigationTree::from_course`] builds the bare tree
//! (everything not started); the progress tracker overlays learner state
//! with [`NavigationTree::apply`].

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::Course;

/// Per-learner lesson state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    /// Never opened.
    #[default]
    NotStarted,
    /// Opened at least once.
    InProgress,
    /// Marked complete.
    Completed,
}

impl LessonStatus {
    /// Stable string form, as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for LessonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LessonStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown lesson status '{other}'")),
        }
    }
}

/// Per-learner module state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    /// No lesson opened.
    #[default]
    NotStarted,
    /// Some lesson opened, not all completed.
    InProgress,
    /// All lessons completed, knowledge check still open.
    LessonsCompleted,
    /// All lessons completed and the knowledge check (if any) passed.
    Completed,
}

impl ModuleStatus {
    /// Stable string form, as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::LessonsCompleted => "lessons_completed",
            Self::Completed => "completed",
        }
    }

    /// Derive module state from lesson counts and knowledge check state.
    pub fn derive(
        total: usize,
        completed: usize,
        started: bool,
        has_check: bool,
        check_passed: bool,
    ) -> Self {
        if total > 0 && completed >= total {
            if !has_check || check_passed {
                Self::Completed
            } else {
                Self::LessonsCompleted
            }
        } else if total == 0 && (!has_check || check_passed) {
            Self::Completed
        } else if started || completed > 0 {
            Self::InProgress
        } else {
            Self::NotStarted
        }
    }
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Module and lesson slug pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LessonRef {
    /// Module slug.
    pub module: String,
    /// Lesson slug.
    pub lesson: String,
}

impl LessonRef {
    /// Create a reference.
    pub fn new(module: impl Into<String>, lesson: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            lesson: lesson.into(),
        }
    }
}

/// A lesson entry in the tree.
#[derive(Debug, Clone, Serialize)]
pub struct NavLesson {
    /// Lesson slug.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// Author's time estimate.
    pub duration_minutes: Option<u32>,
    /// Learner state.
    pub status: LessonStatus,
    /// Previous lesson in course order.
    pub prev: Option<LessonRef>,
    /// Next lesson in course order.
    pub next: Option<LessonRef>,
}

/// A module entry in the tree.
#[derive(Debug, Clone, Serialize)]
pub struct NavModule {
    /// Module slug.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// Zero-based position in the course.
    pub index: usize,
    /// Lessons in the module.
    pub total_lessons: usize,
    /// Lessons completed by the learner.
    pub completed_lessons: usize,
    /// Learner state.
    pub status: ModuleStatus,
    /// Whether the module ends with a knowledge check.
    pub has_knowledge_check: bool,
    /// Whether the learner has passed it.
    pub knowledge_check_passed: bool,
    /// Lessons in order.
    pub lessons: Vec<NavLesson>,
}

/// The course outline with learner state.
#[derive(Debug, Clone, Serialize)]
pub struct NavigationTree {
    /// Course slug.
    pub course: String,
    /// Course title.
    pub title: String,
    /// Course description.
    pub description: Option<String>,
    /// Lessons across all modules.
    pub total_lessons: usize,
    /// Lessons the learner has completed.
    pub completed_lessons: usize,
    /// `floor(completed / total * 100)`, 0 for an empty course.
    pub percent: u8,
    /// Whether the course is complete.
    pub completed: bool,
    /// Module the learner is working through.
    pub current_module: Option<String>,
    /// First lesson not yet completed in course order, else the last lesson.
    pub resume: Option<LessonRef>,
    /// Modules in order.
    pub modules: Vec<NavModule>,
}

/// Learner state to overlay onto a bare tree.
#[derive(Debug, Clone, Default)]
pub struct LearnerState {
    /// Lesson status keyed by reference. Missing means not started.
    pub lessons: HashMap<LessonRef, LessonStatus>,
    /// Modules whose knowledge check has been passed.
    pub passed_checks: HashSet<String>,
    /// Stored current module, if any.
    pub current_module: Option<String>,
    /// Stored course completion flag.
    pub completed: bool,
}

/// Percentage as `floor(completed / total * 100)`, clamped to 100.
pub fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let value = completed.min(total) * 100 / total;
    value as u8
}

impl NavigationTree {
    /// Build the bare tree for a course.
    pub fn from_course(course: &Course) -> Self {
        let order: Vec<LessonRef> = course
            .modules
            .iter()
            .flat_map(|m| m.lessons.iter().map(|l| LessonRef::new(&m.slug, &l.slug)))
            .collect();

        let mut position = 0usize;
        let modules = course
            .modules
            .iter()
            .enumerate()
            .map(|(index, module)| {
                let lessons = module
                    .lessons
                    .iter()
                    .map(|lesson| {
                        let prev = position.checked_sub(1).and_then(|p| order.get(p)).cloned();
                        let next = order.get(position + 1).cloned();
                        position += 1;
                        NavLesson {
                            slug: lesson.slug.clone(),
                            title: lesson.title.clone(),
                            duration_minutes: lesson.duration_minutes,
                            status: LessonStatus::NotStarted,
                            prev,
                            next,
                        }
                    })
                    .collect::<Vec<_>>();
                NavModule {
                    slug: module.slug.clone(),
                    title: module.title.clone(),
                    index,
                    total_lessons: lessons.len(),
                    completed_lessons: 0,
                    status: ModuleStatus::NotStarted,
                    has_knowledge_check: module.knowledge_check.is_some(),
                    knowledge_check_passed: false,
                    lessons,
                }
            })
            .collect();

        Self {
            course: course.slug.clone(),
            title: course.title.clone(),
            description: course.description.clone(),
            total_lessons: order.len(),
            completed_lessons: 0,
            percent: 0,
            completed: false,
            current_module: course.modules.first().map(|m| m.slug.clone()),
            resume: order.first().cloned(),
            modules,
        }
    }

    /// Overlay learner state, recomputing counts, statuses, and the resume
    /// pointer. Lesson entries for slugs not in the tree are ignored.
    pub fn apply(&mut self, state: &LearnerState) {
        let mut completed_total = 0;
        let mut resume = None;

        for module in &mut self.modules {
            let mut completed = 0;
            let mut started = false;
            for lesson in &mut module.lessons {
                let key = LessonRef::new(&module.slug, &lesson.slug);
                lesson.status = state.lessons.get(&key).copied().unwrap_or_default();
                match lesson.status {
                    LessonStatus::Completed => completed += 1,
                    LessonStatus::InProgress => started = true,
                    LessonStatus::NotStarted => {}
                }
                if resume.is_none() && lesson.status != LessonStatus::Completed {
                    resume = Some(key);
                }
            }
            module.completed_lessons = completed;
            module.knowledge_check_passed =
                module.has_knowledge_check && state.passed_checks.contains(&module.slug);
            module.status = ModuleStatus::derive(
                module.total_lessons,
                completed,
                started,
                module.has_knowledge_check,
                module.knowledge_check_passed,
            );
            completed_total += completed;
        }

        self.completed_lessons = completed_total;
        self.percent = percent(completed_total, self.total_lessons);
        self.completed = state.completed;
        self.resume = resume.or_else(|| self.last_lesson());
        self.current_module = state
            .current_module
            .clone()
            .filter(|slug| self.modules.iter().any(|m| &m.slug == slug))
            .or_else(|| self.first_open_module())
            .or_else(|| self.modules.last().map(|m| m.slug.clone()));
    }

    /// The final lesson in course order.
    pub fn last_lesson(&self) -> Option<LessonRef> {
        self.modules.iter().rev().find_map(|m| {
            m.lessons
                .last()
                .map(|l| LessonRef::new(&m.slug, &l.slug))
        })
    }

    /// First module that is not completed.
    pub fn first_open_module(&self) -> Option<String> {
        self.modules
            .iter()
            .find(|m| m.status != ModuleStatus::Completed)
            .map(|m| m.slug.clone())
    }

    /// Whether every lesson is completed and every check passed.
    pub fn all_requirements_met(&self) -> bool {
        self.completed_lessons == self.total_lessons
            && self
                .modules
                .iter()
                .all(|m| !m.has_knowledge_check || m.knowledge_check_passed)
    }

    /// Find a module entry.
    pub fn module(&self, slug: &str) -> Option<&NavModule> {
        self.modules.iter().find(|m| m.slug == slug)
    }

    /// Find a lesson entry.
    pub fn lesson(&self, module: &str, lesson: &str) -> Option<&NavLesson> {
        self.module(module)?.lessons.iter().find(|l| l.slug == lesson)
    }
}
