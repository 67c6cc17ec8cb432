//! Per-learner lesson, module, and course state.
//!
//! Rows are written through the storage upserts; module and course status
//! are always re-derived from those rows against the current navigation
//! tree, so lessons added or removed on disk never leave stale counts.

use std::collections::HashSet;
use std::sync::Arc;

use lectern_content::{
    ContentResolver, LearnerState, LessonRef, LessonStatus, ModuleStatus, NavigationTree,
};
use lectern_storage::{CourseProgressRecord, Database, LessonProgressRecord};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// A learner's state for one lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonState {
    pub course: String,
    pub module: String,
    pub lesson: String,
    pub status: LessonStatus,
    pub view_count: i64,
    pub first_viewed_at: i64,
    pub last_viewed_at: i64,
    pub completed_at: Option<i64>,
}

impl From<LessonProgressRecord> for LessonState {
    fn from(record: LessonProgressRecord) -> Self {
        Self {
            status: record.status.parse().unwrap_or(LessonStatus::InProgress),
            course: record.course,
            module: record.module,
            lesson: record.lesson,
            view_count: record.view_count,
            first_viewed_at: record.first_viewed_at,
            last_viewed_at: record.last_viewed_at,
            completed_at: record.completed_at,
        }
    }
}

/// What changed when a lesson was completed.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionOutcome {
    pub lesson: LessonState,
    pub module_status: ModuleStatus,
    pub module_completed: bool,
    pub course_completed: bool,
    pub course_percent: u8,
}

/// One row of the learner dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardEntry {
    pub course: String,
    pub title: String,
    pub percent: u8,
    pub completed_lessons: usize,
    pub total_lessons: usize,
    pub completed: bool,
    pub current_module: Option<String>,
    pub resume: Option<LessonRef>,
    pub started_at: i64,
    pub last_activity_at: i64,
    pub completed_at: Option<i64>,
}

/// Result of re-deriving state after a write.
#[derive(Debug, Clone)]
pub(crate) struct Derived {
    pub tree: NavigationTree,
    pub module_status: ModuleStatus,
}

/// Records lesson activity and derives module and course completion.
#[derive(Clone)]
pub struct ProgressTracker {
    content: Arc<ContentResolver>,
    db: Database,
}

impl ProgressTracker {
    /// Create a tracker over a content resolver and database.
    pub fn new(content: Arc<ContentResolver>, db: Database) -> Self {
        Self { content, db }
    }

    pub(crate) fn content(&self) -> &ContentResolver {
        &self.content
    }

    pub(crate) fn db(&self) -> &Database {
        &self.db
    }

    /// Record that a learner opened a lesson.
    pub async fn view_lesson(
        &self,
        user_id: &str,
        course: &str,
        module: &str,
        lesson: &str,
    ) -> Result<LessonState> {
        let tree = self.content.navigation(course).await?;
        require_lesson(&tree, module, lesson)?;

        let record = self
            .db
            .record_lesson_view(user_id, course, module, lesson)
            .await?;
        self.touch_course(user_id, course, module).await?;
        self.derive(user_id, course, module).await?;

        debug!(user_id, course, module, lesson, "Lesson viewed");
        Ok(record.into())
    }

    /// Mark a lesson completed and re-derive module and course state.
    pub async fn complete_lesson(
        &self,
        user_id: &str,
        course: &str,
        module: &str,
        lesson: &str,
    ) -> Result<CompletionOutcome> {
        let tree = self.content.navigation(course).await?;
        require_lesson(&tree, module, lesson)?;

        let record = self
            .db
            .mark_lesson_completed(user_id, course, module, lesson)
            .await?;
        self.touch_course(user_id, course, module).await?;
        let derived = self.derive(user_id, course, module).await?;

        Ok(CompletionOutcome {
            lesson: record.into(),
            module_status: derived.module_status,
            module_completed: derived.module_status == ModuleStatus::Completed,
            course_completed: derived.tree.completed,
            course_percent: derived.tree.percent,
        })
    }

    /// Navigation tree with the learner's progress overlaid.
    pub async fn navigation_for(&self, user_id: &str, course: &str) -> Result<NavigationTree> {
        let mut tree = self.content.navigation(course).await?;
        let state = self.learner_state(user_id, course).await?;
        tree.apply(&state);
        Ok(tree)
    }

    /// Every published course the learner has touched, most recent first.
    pub async fn dashboard(&self, user_id: &str) -> Result<Vec<DashboardEntry>> {
        let mut entries = Vec::new();
        for row in self.db.course_progress_for_user(user_id).await? {
            let published = match self.content.course(&row.course).await {
                Ok(course) => course.published,
                Err(e) => {
                    if !e.is_not_found() {
                        warn!(course = %row.course, error = %e, "Skipping course on dashboard");
                    }
                    false
                }
            };
            if !published {
                continue;
            }
            let tree = self.navigation_for(user_id, &row.course).await?;
            entries.push(dashboard_entry(row, tree));
        }
        Ok(entries)
    }

    /// Remove all of a learner's progress in a course.
    pub async fn reset_course(&self, user_id: &str, course: &str) -> Result<u64> {
        self.content.course(course).await?;
        let removed = self.db.reset_course_progress(user_id, course).await?;
        info!(user_id, course, removed, "Course progress reset");
        Ok(removed)
    }

    /// Ensure the course row exists, pointing it at `module` if the learner
    /// has no current module yet.
    async fn touch_course(&self, user_id: &str, course: &str, module: &str) -> Result<()> {
        let has_current = self
            .db
            .course_progress(user_id, course)
            .await?
            .is_some_and(|row| row.current_module.is_some());
        let current = (!has_current).then_some(module);
        self.db.touch_course(user_id, course, current).await?;
        Ok(())
    }

    /// Load stored rows into the shape the navigation overlay expects.
    async fn learner_state(&self, user_id: &str, course: &str) -> Result<LearnerState> {
        let mut state = LearnerState::default();
        for row in self.db.lesson_progress_for_course(user_id, course).await? {
            let status = row.status.parse().unwrap_or(LessonStatus::InProgress);
            state
                .lessons
                .insert(LessonRef::new(row.module, row.lesson), status);
        }
        for row in self.db.module_progress_for_course(user_id, course).await? {
            if row.kc_passed {
                state.passed_checks.insert(row.module);
            }
        }
        if let Some(row) = self.db.course_progress(user_id, course).await? {
            state.completed = row.is_completed();
            state.current_module = row.current_module;
        }
        Ok(state)
    }

    /// Re-derive the module's status and the course's completion, storing
    /// both. Course completion is set once and never cleared here.
    pub(crate) async fn derive(
        &self,
        user_id: &str,
        course: &str,
        module: &str,
    ) -> Result<Derived> {
        let mut tree = self.navigation_for(user_id, course).await?;

        let module_status = tree
            .module(module)
            .map(|m| m.status)
            .ok_or_else(|| Error::not_found(format!("module {course}/{module}")))?;
        self.db
            .upsert_module_progress(user_id, course, module, module_status.as_str())
            .await?;

        if !tree.completed && self.requirements_met(user_id, &tree).await? {
            if self.db.mark_course_completed(user_id, course).await? {
                info!(user_id, course, "Course completed");
            }
            tree.completed = true;
        }

        Ok(Derived {
            tree,
            module_status,
        })
    }

    /// Completed lessons (counted only among lessons still in the course)
    /// equal the total, and every gated module's check is passed.
    async fn requirements_met(&self, user_id: &str, tree: &NavigationTree) -> Result<bool> {
        let lessons: HashSet<(String, String)> = tree
            .modules
            .iter()
            .flat_map(|m| {
                m.lessons
                    .iter()
                    .map(|l| (m.slug.clone(), l.slug.clone()))
            })
            .collect();
        let completed = self
            .db
            .count_completed_lessons(user_id, &tree.course, &lessons)
            .await?;
        let checks_passed = tree
            .modules
            .iter()
            .all(|m| !m.has_knowledge_check || m.knowledge_check_passed);
        Ok(completed == tree.total_lessons && checks_passed)
    }
}

fn require_lesson(tree: &NavigationTree, module: &str, lesson: &str) -> Result<()> {
    if tree.module(module).is_none() {
        return Err(Error::not_found(format!("module {}/{module}", tree.course)));
    }
    if tree.lesson(module, lesson).is_none() {
        return Err(Error::not_found(format!(
            "lesson {}/{module}/{lesson}",
            tree.course
        )));
    }
    Ok(())
}

fn dashboard_entry(row: CourseProgressRecord, tree: NavigationTree) -> DashboardEntry {
    DashboardEntry {
        course: row.course,
        title: tree.title,
        percent: tree.percent,
        completed_lessons: tree.completed_lessons,
        total_lessons: tree.total_lessons,
        completed: tree.completed,
        current_module: tree.current_module,
        resume: tree.resume,
        started_at: row.started_at,
        last_activity_at: row.last_activity_at,
        completed_at: row.completed_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Fixture, fixture};

    #[tokio::test]
    async fn test_view_unknown_lesson_is_not_found() {
        let Fixture { root: _root, tracker, user, .. } = fixture().await;
        let err = tracker
            .view_lesson(&user, "rust-101", "ownership", "nope")
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = tracker
            .view_lesson(&user, "rust-101", "nope", "moves")
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = tracker
            .view_lesson(&user, "go-101", "basics", "hello")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_first_view_sets_current_module() {
        let Fixture { root: _root, tracker, user, .. } = fixture().await;

        let state = tracker
            .view_lesson(&user, "rust-101", "borrowing", "references")
            .await
            .unwrap();
        assert_eq!(state.status, LessonStatus::InProgress);
        assert_eq!(state.view_count, 1);

        tracker
            .view_lesson(&user, "rust-101", "ownership", "moves")
            .await
            .unwrap();

        let tree = tracker.navigation_for(&user, "rust-101").await.unwrap();
        assert_eq!(tree.current_module.as_deref(), Some("borrowing"));
        assert_eq!(
            tree.lesson("ownership", "moves").unwrap().status,
            LessonStatus::InProgress
        );
        assert_eq!(tree.module("ownership").unwrap().status, ModuleStatus::InProgress);
        assert_eq!(
            tree.resume,
            Some(LessonRef::new("ownership", "what-is-ownership"))
        );
    }

    #[tokio::test]
    async fn test_course_needs_lessons_and_checks() {
        let Fixture {
            root: _root,
            tracker,
            engine,
            user,
        } = fixture().await;

        let mut last = None;
        for (module, lesson) in [
            ("ownership", "what-is-ownership"),
            ("ownership", "moves"),
            ("borrowing", "references"),
        ] {
            last = Some(
                tracker
                    .complete_lesson(&user, "rust-101", module, lesson)
                    .await
                    .unwrap(),
            );
        }
        let outcome = last.unwrap();
        assert_eq!(outcome.course_percent, 100);
        assert!(outcome.module_completed);
        assert!(!outcome.course_completed);

        let tree = tracker.navigation_for(&user, "rust-101").await.unwrap();
        assert_eq!(
            tree.module("ownership").unwrap().status,
            ModuleStatus::LessonsCompleted
        );
        assert_eq!(tree.resume, Some(LessonRef::new("borrowing", "references")));

        let answers = [("q1".to_string(), 1), ("q2".to_string(), 0)]
            .into_iter()
            .collect();
        let result = engine
            .submit(&user, "rust-101", "ownership", &answers)
            .await
            .unwrap();
        assert!(result.passed);
        assert!(result.course_completed);

        let tree = tracker.navigation_for(&user, "rust-101").await.unwrap();
        assert!(tree.completed);
        assert_eq!(tree.module("ownership").unwrap().status, ModuleStatus::Completed);
    }

    #[tokio::test]
    async fn test_completion_is_sticky_when_content_grows() {
        let Fixture {
            root,
            tracker,
            engine,
            user,
        } = fixture().await;

        let answers = [("q1".to_string(), 1), ("q2".to_string(), 0)]
            .into_iter()
            .collect();
        engine
            .submit(&user, "rust-101", "ownership", &answers)
            .await
            .unwrap();
        for (module, lesson) in [
            ("ownership", "what-is-ownership"),
            ("ownership", "moves"),
            ("borrowing", "references"),
        ] {
            tracker
                .complete_lesson(&user, "rust-101", module, lesson)
                .await
                .unwrap();
        }
        assert!(tracker.navigation_for(&user, "rust-101").await.unwrap().completed);

        std::fs::write(
            root.path().join("rust-101/02-borrowing/02-lifetimes.mdx"),
            "# Lifetimes\n\nEvery reference has a lifetime.\n",
        )
        .unwrap();

        let tree = tracker.navigation_for(&user, "rust-101").await.unwrap();
        assert_eq!(tree.total_lessons, 4);
        assert_eq!(tree.percent, 75);
        assert!(tree.completed);
        assert_eq!(tree.resume, Some(LessonRef::new("borrowing", "lifetimes")));
    }

    #[tokio::test]
    async fn test_dashboard_and_reset() {
        let Fixture { root: _root, tracker, user, .. } = fixture().await;
        assert!(tracker.dashboard(&user).await.unwrap().is_empty());

        tracker
            .complete_lesson(&user, "rust-101", "ownership", "moves")
            .await
            .unwrap();

        let dashboard = tracker.dashboard(&user).await.unwrap();
        assert_eq!(dashboard.len(), 1);
        assert_eq!(dashboard[0].course, "rust-101");
        assert_eq!(dashboard[0].title, "Rust 101");
        assert_eq!(dashboard[0].completed_lessons, 1);
        assert_eq!(dashboard[0].percent, 33);
        assert_eq!(dashboard[0].current_module.as_deref(), Some("ownership"));

        let removed = tracker.reset_course(&user, "rust-101").await.unwrap();
        assert!(removed >= 2);
        assert!(tracker.dashboard(&user).await.unwrap().is_empty());

        let err = tracker.reset_course(&user, "go-101").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
