//! Whole-tree content checks.
//!
//! [`ContentResolver::validate_all`] loads every course and lesson and
//! reports problems instead of stopping at the first one.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::loader::discover_courses;
use crate::markdown::extract_frontmatter;
use crate::model::{KnowledgeCheck, LessonFrontmatter};
use crate::{ContentResolver, Result};

/// Issue severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Content cannot be served correctly.
    Error,
    /// Content is served but probably not as intended.
    Warning,
}

/// A problem found during validation.
#[derive(Debug, Clone, Serialize)]
pub struct ContentIssue {
    /// How bad it is.
    pub severity: Severity,
    /// Course slug.
    pub course: String,
    /// Module, lesson, or question the issue concerns.
    pub location: Option<String>,
    /// Description.
    pub message: String,
}

impl ContentIssue {
    fn error(course: &str, location: Option<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            course: course.to_string(),
            location,
            message: message.into(),
        }
    }

    fn warning(course: &str, location: Option<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            course: course.to_string(),
            location,
            message: message.into(),
        }
    }
}

impl fmt::Display for ContentIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match &self.location {
            Some(location) => write!(f, "{level}: {}/{location}: {}", self.course, self.message),
            None => write!(f, "{level}: {}: {}", self.course, self.message),
        }
    }
}

/// Check a knowledge check's structure.
pub fn check_knowledge_check(check: &KnowledgeCheck) -> Vec<String> {
    let mut problems = Vec::new();
    if check.passing_score > 100 {
        problems.push(format!(
            "passing_score {} is greater than 100",
            check.passing_score
        ));
    }
    if check.questions.is_empty() {
        problems.push("knowledge check has no questions".to_string());
    }
    let mut ids = HashSet::new();
    for question in &check.questions {
        if !ids.insert(question.id.as_str()) {
            problems.push(format!("duplicate question id '{}'", question.id));
        }
        if question.choices.len() < 2 {
            problems.push(format!(
                "question '{}' needs at least two choices",
                question.id
            ));
        }
        if question.answer >= question.choices.len() {
            problems.push(format!(
                "question '{}' answer index {} is out of range",
                question.id, question.answer
            ));
        }
    }
    problems
}

impl ContentResolver {
    /// Load everything and report every problem found.
    pub async fn validate_all(&self) -> Result<Vec<ContentIssue>> {
        let mut issues = Vec::new();

        for (slug, _) in discover_courses(self.root()).await? {
            let course = match self.course(&slug).await {
                Ok(course) => course,
                Err(e) => {
                    issues.push(ContentIssue::error(&slug, None, e.to_string()));
                    continue;
                }
            };

            if course.modules.is_empty() {
                issues.push(ContentIssue::warning(&slug, None, "course has no modules"));
            }

            for module in &course.modules {
                if module.lessons.is_empty() {
                    issues.push(ContentIssue::warning(
                        &slug,
                        Some(module.slug.clone()),
                        "module has no lessons",
                    ));
                }
                if let Some(check) = &module.knowledge_check {
                    for problem in check_knowledge_check(check) {
                        issues.push(ContentIssue::error(
                            &slug,
                            Some(format!("{}/knowledge_check", module.slug)),
                            problem,
                        ));
                    }
                }

                for lesson in &module.lessons {
                    let location = Some(format!("{}/{}", module.slug, lesson.slug));
                    let source = match tokio::fs::read_to_string(&lesson.path).await {
                        Ok(source) => source,
                        Err(e) => {
                            issues.push(ContentIssue::error(&slug, location, e.to_string()));
                            continue;
                        }
                    };
                    let fm = extract_frontmatter(&source)?;
                    if let Some(message) = fm.parse_error() {
                        issues.push(ContentIssue::warning(
                            &slug,
                            location,
                            format!("invalid frontmatter: {message}"),
                        ));
                    } else if let Err(e) = fm.deserialize::<LessonFrontmatter>() {
                        issues.push(ContentIssue::warning(&slug, location, e.to_string()));
                    }
                }
            }
        }

        log::info!("Content validation found {} issues", issues.len());
        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::fixtures::write_course;
    use crate::model::Question;
    use tempfile::TempDir;

    #[test]
    fn test_check_knowledge_check_reports_all_problems() {
        let check = KnowledgeCheck {
            passing_score: 120,
            questions: vec![
                Question {
                    id: "q1".into(),
                    prompt: "?".into(),
                    choices: vec!["only".into()],
                    answer: 3,
                    explanation: None,
                },
                Question {
                    id: "q1".into(),
                    prompt: "?".into(),
                    choices: vec!["a".into(), "b".into()],
                    answer: 0,
                    explanation: None,
                },
            ],
        };
        let problems = check_knowledge_check(&check);
        assert_eq!(problems.len(), 4);
        assert!(problems.iter().any(|p| p.contains("greater than 100")));
        assert!(problems.iter().any(|p| p.contains("duplicate question id")));
        assert!(problems.iter().any(|p| p.contains("at least two choices")));
        assert!(problems.iter().any(|p| p.contains("out of range")));
    }

    #[tokio::test]
    async fn test_valid_tree_has_no_errors() {
        let root = TempDir::new().unwrap();
        write_course(root.path());
        let issues = ContentResolver::new(root.path()).validate_all().await.unwrap();
        assert!(issues.iter().all(|i| i.severity != Severity::Error), "{issues:?}");
    }

    #[tokio::test]
    async fn test_reports_broken_course_and_bad_lesson() {
        let root = TempDir::new().unwrap();
        write_course(root.path());
        std::fs::write(
            root.path().join("rust-101/02-borrowing/01-references.mdx"),
            "---\ntitle: [broken\n---\n\nBody\n",
        )
        .unwrap();
        let broken = root.path().join("broken");
        std::fs::create_dir(&broken).unwrap();
        std::fs::write(broken.join("course.yaml"), "title: Broken\nmodules: [missing]\n").unwrap();

        let issues = ContentResolver::new(root.path()).validate_all().await.unwrap();

        let course_error = issues
            .iter()
            .find(|i| i.course == "broken")
            .expect("broken course reported");
        assert_eq!(course_error.severity, Severity::Error);
        assert!(course_error.message.contains("missing"));

        let lesson_warning = issues
            .iter()
            .find(|i| i.location.as_deref() == Some("borrowing/references"))
            .expect("bad frontmatter reported");
        assert_eq!(lesson_warning.severity, Severity::Warning);
        assert!(lesson_warning.to_string().starts_with("warning: rust-101/"));
    }
}
