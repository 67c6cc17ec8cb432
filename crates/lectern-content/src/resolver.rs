//! The cached content entry point.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::freshness::{fingerprint_dir, fingerprint_file};
use crate::loader::{discover_courses, load_course, load_lesson};
use crate::model::{Course, CourseSummary, KnowledgeCheck, Lesson, Module};
use crate::navigation::NavigationTree;
use crate::{Error, Result};

/// Minimum Jaro-Winkler similarity for a "did you mean" suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.8;

type LessonKey = (String, String, String);

struct Cached<T> {
    value: Arc<T>,
    fingerprint: u64,
}

/// Resolves courses, lessons, and navigation trees from a content root.
///
/// Results are cached and served while the on-disk fingerprint of the
/// course directory (or lesson file) is unchanged, so edits show up on
/// the next request without a restart.
pub struct ContentResolver {
    root: PathBuf,
    cache_enabled: bool,
    include_drafts: bool,
    courses: RwLock<HashMap<String, Cached<Course>>>,
    lessons: RwLock<HashMap<LessonKey, Cached<Lesson>>>,
}

impl ContentResolver {
    /// Create a resolver for `root` with caching on and drafts hidden.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache_enabled: true,
            include_drafts: false,
            courses: RwLock::new(HashMap::new()),
            lessons: RwLock::new(HashMap::new()),
        }
    }

    /// Enable or disable caching.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// Show draft lessons.
    pub fn include_drafts(mut self, include: bool) -> Self {
        self.include_drafts = include;
        self
    }

    /// Content root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Slugs of every course directory, published or not.
    pub async fn course_slugs(&self) -> Result<Vec<String>> {
        Ok(discover_courses(&self.root)
            .await?
            .into_iter()
            .map(|(slug, _)| slug)
            .collect())
    }

    /// Published courses sorted by slug. Courses that fail to load are
    /// logged and skipped.
    pub async fn list_courses(&self) -> Result<Vec<CourseSummary>> {
        let mut summaries = Vec::new();
        for (slug, _) in discover_courses(&self.root).await? {
            match self.course(&slug).await {
                Ok(course) if course.published => summaries.push(course.summary()),
                Ok(_) => {}
                Err(e) => log::warn!("Skipping course '{slug}': {e}"),
            }
        }
        Ok(summaries)
    }

    /// Load a course (metadata only).
    pub async fn course(&self, slug: &str) -> Result<Arc<Course>> {
        let discovered = discover_courses(&self.root).await?;
        let Some((_, dir)) = discovered.iter().find(|(s, _)| s == slug) else {
            let candidates = discovered.iter().map(|(s, _)| s.as_str());
            return Err(Error::NotFound {
                kind: "course",
                slug: slug.to_string(),
                suggestion: suggest(slug, candidates),
            });
        };

        let fingerprint = fingerprint_dir(dir).await;
        if self.cache_enabled {
            let cache = self.courses.read().await;
            if let Some(entry) = cache.get(slug)
                && entry.fingerprint == fingerprint
            {
                return Ok(Arc::clone(&entry.value));
            }
        }

        let course = Arc::new(load_course(dir, self.include_drafts).await?);
        if self.cache_enabled {
            log::debug!("Caching course '{slug}'");
            self.courses.write().await.insert(
                slug.to_string(),
                Cached {
                    value: Arc::clone(&course),
                    fingerprint,
                },
            );
        }
        Ok(course)
    }

    /// Load and compile a lesson.
    pub async fn lesson(&self, course: &str, module: &str, lesson: &str) -> Result<Arc<Lesson>> {
        let loaded = self.course(course).await?;
        let found = find_module(&loaded, module)?;
        let Some(summary) = found.lesson(lesson) else {
            return Err(Error::NotFound {
                kind: "lesson",
                slug: lesson.to_string(),
                suggestion: suggest(lesson, found.lessons.iter().map(|l| l.slug.as_str())),
            });
        };

        let key = (course.to_string(), module.to_string(), lesson.to_string());
        let fingerprint = fingerprint_file(&summary.path).await;
        if self.cache_enabled {
            let cache = self.lessons.read().await;
            if let Some(entry) = cache.get(&key)
                && entry.fingerprint == fingerprint
            {
                return Ok(Arc::clone(&entry.value));
            }
        }

        let compiled = Arc::new(load_lesson(&loaded, found, summary).await?);
        if self.cache_enabled {
            self.lessons.write().await.insert(
                key,
                Cached {
                    value: Arc::clone(&compiled),
                    fingerprint,
                },
            );
        }
        Ok(compiled)
    }

    /// Bare navigation tree (no learner state).
    pub async fn navigation(&self, course: &str) -> Result<NavigationTree> {
        let loaded = self.course(course).await?;
        Ok(NavigationTree::from_course(&loaded))
    }

    /// The module's knowledge check, if it has one.
    pub async fn knowledge_check(
        &self,
        course: &str,
        module: &str,
    ) -> Result<Option<KnowledgeCheck>> {
        let loaded = self.course(course).await?;
        Ok(find_module(&loaded, module)?.knowledge_check.clone())
    }

    /// Drop cached entries for one course.
    pub async fn invalidate(&self, course: &str) {
        self.courses.write().await.remove(course);
        self.lessons
            .write()
            .await
            .retain(|(c, _, _), _| c != course);
        log::debug!("Invalidated cache for course '{course}'");
    }

    /// Drop every cached entry.
    pub async fn clear_cache(&self) {
        self.courses.write().await.clear();
        self.lessons.write().await.clear();
        log::info!("Content cache cleared");
    }

    /// Number of cached courses and lessons.
    pub async fn cache_len(&self) -> (usize, usize) {
        (
            self.courses.read().await.len(),
            self.lessons.read().await.len(),
        )
    }
}

fn find_module<'a>(course: &'a Course, slug: &str) -> Result<&'a Module> {
    course.module(slug).ok_or_else(|| Error::NotFound {
        kind: "module",
        slug: slug.to_string(),
        suggestion: suggest(slug, course.modules.iter().map(|m| m.slug.as_str())),
    })
}

/// Closest candidate by Jaro-Winkler similarity, if similar enough.
fn suggest<'a>(wanted: &str, candidates: impl Iterator<Item = &'a str>) -> Option<String> {
    candidates
        .map(|c| (strsim::jaro_winkler(wanted, c), c))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, c)| c.to_string())
}
