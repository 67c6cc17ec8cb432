//! Knowledge check grading.
//!
//! A check is graded as a whole: every question counts equally, an
//! unanswered question counts as wrong, and the score is the rounded
//! percentage of correct answers.

use std::collections::BTreeMap;

use lectern_content::{KnowledgeCheck, PublicKnowledgeCheck};
use lectern_storage::KcSubmission;
use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::tracker::ProgressTracker;

/// Question id to selected choice index.
pub type Answers = BTreeMap<String, usize>;

/// Per-question feedback returned after grading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionResult {
    pub question_id: String,
    pub correct: bool,
    /// `None` when the question was left unanswered.
    pub selected: Option<usize>,
    pub correct_answer: usize,
    pub explanation: Option<String>,
}

/// Outcome of one submission.
#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeCheckResult {
    pub score: u8,
    pub passed: bool,
    pub passing_score: u8,
    pub attempt: i64,
    pub results: Vec<QuestionResult>,
    /// Module the learner moves on to, when passed and one follows.
    pub next_module: Option<String>,
    pub course_completed: bool,
}

/// Rounded percentage, half up. Zero questions score zero.
pub fn score(correct: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let correct = correct.min(total);
    ((correct * 200 + total) / (total * 2)) as u8
}

/// Check that every answer names a real question and an existing choice.
pub fn validate_answers(check: &KnowledgeCheck, answers: &Answers) -> Result<()> {
    for (id, &choice) in answers {
        let question = check
            .question(id)
            .ok_or_else(|| Error::validation(format!("unknown question '{id}'")))?;
        if choice >= question.choices.len() {
            return Err(Error::validation(format!(
                "choice {choice} is out of range for question '{id}' ({} choices)",
                question.choices.len()
            )));
        }
    }
    Ok(())
}

/// Grade validated answers. Returns the score and per-question results.
pub fn grade(check: &KnowledgeCheck, answers: &Answers) -> (u8, Vec<QuestionResult>) {
    let results: Vec<QuestionResult> = check
        .questions
        .iter()
        .map(|q| {
            let selected = answers.get(&q.id).copied();
            QuestionResult {
                question_id: q.id.clone(),
                correct: selected == Some(q.answer),
                selected,
                correct_answer: q.answer,
                explanation: q.explanation.clone(),
            }
        })
        .collect();
    let correct = results.iter().filter(|r| r.correct).count();
    (score(correct, results.len()), results)
}

/// Serves, grades, and records knowledge checks.
#[derive(Clone)]
pub struct KnowledgeEngine {
    tracker: ProgressTracker,
}

impl KnowledgeEngine {
    /// Create an engine that records results through `tracker`.
    pub fn new(tracker: ProgressTracker) -> Self {
        Self { tracker }
    }

    async fn check(&self, course: &str, module: &str) -> Result<KnowledgeCheck> {
        self.tracker
            .content()
            .knowledge_check(course, module)
            .await?
            .ok_or_else(|| Error::not_found(format!("knowledge check for {course}/{module}")))
    }

    /// The check without answer keys or explanations.
    pub async fn questions(&self, course: &str, module: &str) -> Result<PublicKnowledgeCheck> {
        Ok(self.check(course, module).await?.to_public())
    }

    /// Grade and record a submission.
    ///
    /// On a pass the learner's current module moves forward to the next
    /// module (or stays on the last one) and completion is re-derived.
    /// Re-taking an earlier check never moves it back.
    pub async fn submit(
        &self,
        user_id: &str,
        course: &str,
        module: &str,
        answers: &Answers,
    ) -> Result<KnowledgeCheckResult> {
        let check = self.check(course, module).await?;
        validate_answers(&check, answers)?;

        let (score, results) = grade(&check, answers);
        let passed = score >= check.passing_score;

        let db = self.tracker.db();
        let submission = db
            .insert_kc_submission(
                user_id,
                course,
                module,
                &serde_json::to_value(answers)?,
                i64::from(score),
                passed,
            )
            .await?;
        db.record_kc_result(user_id, course, module, i64::from(score), passed)
            .await?;

        let next_module = if passed {
            let loaded = self.tracker.content().course(course).await?;
            let next = loaded.next_module(module).map(|m| m.slug.clone());
            let target = next.as_deref().unwrap_or(module);

            // The pointer only moves forward, and never after completion.
            let stored = db.course_progress(user_id, course).await?;
            let advances = match &stored {
                Some(row) if row.is_completed() => false,
                Some(row) => match row.current_module.as_deref() {
                    Some(current) => {
                        loaded.module_index(target) > loaded.module_index(current)
                    }
                    None => true,
                },
                None => true,
            };
            if advances {
                db.set_current_module(user_id, course, target).await?;
            } else {
                db.touch_course(user_id, course, None).await?;
            }
            next
        } else {
            db.touch_course(user_id, course, None).await?;
            None
        };

        let derived = self.tracker.derive(user_id, course, module).await?;

        info!(
            user_id,
            course,
            module,
            score,
            passed,
            attempt = submission.attempt,
            "Knowledge check graded"
        );
        Ok(KnowledgeCheckResult {
            score,
            passed,
            passing_score: check.passing_score,
            attempt: submission.attempt,
            results,
            next_module,
            course_completed: derived.tree.completed,
        })
    }

    /// Previous submissions, newest first.
    pub async fn attempts(
        &self,
        user_id: &str,
        course: &str,
        module: &str,
    ) -> Result<Vec<KcSubmission>> {
        self.check(course, module).await?;
        Ok(self
            .tracker
            .db()
            .kc_submissions(user_id, course, module)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use lectern_content::Question;
    use proptest::prelude::*;

    use super::*;
    use crate::test_support::{Fixture, fixture};

    fn answers(pairs: &[(&str, usize)]) -> Answers {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn check_with(n: usize) -> KnowledgeCheck {
        KnowledgeCheck {
            passing_score: 70,
            questions: (0..n)
                .map(|i| Question {
                    id: format!("q{i}"),
                    prompt: String::new(),
                    choices: vec!["a".into(), "b".into()],
                    answer: 0,
                    explanation: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_score_rounding() {
        assert_eq!(score(0, 0), 0);
        assert_eq!(score(1, 3), 33);
        assert_eq!(score(2, 3), 67);
        assert_eq!(score(1, 2), 50);
        assert_eq!(score(3, 3), 100);
    }

    #[test]
    fn test_grade_unanswered_is_wrong() {
        let check = check_with(4);
        let (score, results) = grade(&check, &answers(&[("q0", 0), ("q1", 1)]));
        assert_eq!(score, 25);
        assert_eq!(results[1].selected, Some(1));
        assert!(!results[1].correct);
        assert_eq!(results[3].selected, None);
        assert!(!results[3].correct);
    }

    #[test]
    fn test_validate_answers() {
        let check = check_with(2);
        assert!(validate_answers(&check, &answers(&[("q0", 1)])).is_ok());
        assert!(matches!(
            validate_answers(&check, &answers(&[("q9", 0)])),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            validate_answers(&check, &answers(&[("q0", 2)])),
            Err(Error::Validation(_))
        ));
    }

    proptest! {
        #[test]
        fn score_is_bounded_and_monotonic(total in 1usize..200, correct in 0usize..200) {
            let correct = correct.min(total);
            let s = score(correct, total);
            prop_assert!(s <= 100);
            if correct < total {
                prop_assert!(score(correct + 1, total) >= s);
            }
            let exact = correct as f64 * 100.0 / total as f64;
            prop_assert!((f64::from(s) - exact).abs() <= 0.5);
        }

        #[test]
        fn all_correct_scores_full(total in 1usize..200) {
            prop_assert_eq!(score(total, total), 100);
            prop_assert_eq!(score(0, total), 0);
        }
    }

    #[tokio::test]
    async fn test_questions_hide_answers() {
        let Fixture { root: _root, engine, .. } = fixture().await;
        let public = engine.questions("rust-101", "ownership").await.unwrap();
        assert_eq!(public.questions.len(), 2);
        let json = serde_json::to_string(&public).unwrap();
        assert!(!json.contains("answer"));

        let err = engine.questions("rust-101", "borrowing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_pass_advances_module() {
        let Fixture {
            root: _root,
            tracker,
            engine,
            user,
        } = fixture().await;

        let result = engine
            .submit(&user, "rust-101", "ownership", &answers(&[("q1", 1), ("q2", 0)]))
            .await
            .unwrap();
        assert_eq!(result.score, 100);
        assert!(result.passed);
        assert_eq!(result.attempt, 1);
        assert_eq!(result.next_module.as_deref(), Some("borrowing"));
        assert!(!result.course_completed);
        assert_eq!(result.results[0].explanation.as_deref(), Some("Integers are Copy."));

        let tree = tracker.navigation_for(&user, "rust-101").await.unwrap();
        assert_eq!(tree.current_module.as_deref(), Some("borrowing"));
        assert!(tree.module("ownership").unwrap().knowledge_check_passed);
    }

    #[tokio::test]
    async fn test_fail_then_pass() {
        let Fixture {
            root: _root,
            tracker,
            engine,
            user,
        } = fixture().await;

        let failed = engine
            .submit(&user, "rust-101", "ownership", &answers(&[("q2", 0)]))
            .await
            .unwrap();
        assert_eq!(failed.score, 50);
        assert_eq!(failed.passing_score, 60);
        assert!(!failed.passed);
        assert!(failed.next_module.is_none());

        let tree = tracker.navigation_for(&user, "rust-101").await.unwrap();
        assert!(!tree.module("ownership").unwrap().knowledge_check_passed);

        let passed = engine
            .submit(&user, "rust-101", "ownership", &answers(&[("q1", 1), ("q2", 0)]))
            .await
            .unwrap();
        assert_eq!(passed.attempt, 2);

        // A later failure does not take the pass away.
        engine
            .submit(&user, "rust-101", "ownership", &answers(&[]))
            .await
            .unwrap();
        let tree = tracker.navigation_for(&user, "rust-101").await.unwrap();
        assert!(tree.module("ownership").unwrap().knowledge_check_passed);

        let attempts = engine.attempts(&user, "rust-101", "ownership").await.unwrap();
        assert_eq!(
            attempts.iter().map(|a| a.attempt).collect::<Vec<_>>(),
            vec![3, 2, 1]
        );
    }

    #[tokio::test]
    async fn test_invalid_submission_is_not_stored() {
        let Fixture {
            root: _root,
            engine,
            user,
            ..
        } = fixture().await;

        let err = engine
            .submit(&user, "rust-101", "ownership", &answers(&[("q7", 0)]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = engine
            .submit(&user, "rust-101", "ownership", &answers(&[("q2", 5)]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        assert!(
            engine
                .attempts(&user, "rust-101", "ownership")
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_passing_last_module_stays_there() {
        let Fixture {
            root: _root,
            tracker,
            engine,
            user,
        } = fixture().await;

        let result = engine
            .submit(&user, "intro-101", "basics", &answers(&[("c1", 0)]))
            .await
            .unwrap();
        assert!(result.passed);
        assert!(result.next_module.is_none());

        let tree = tracker.navigation_for(&user, "intro-101").await.unwrap();
        assert_eq!(tree.current_module.as_deref(), Some("basics"));
        assert!(!tree.completed);
    }

    #[tokio::test]
    async fn test_retaking_earlier_check_keeps_pointer() {
        let Fixture {
            root,
            tracker,
            engine,
            user,
        } = fixture().await;

        let course = root.path().join("tri-101");
        std::fs::create_dir_all(course.join("01-a")).unwrap();
        std::fs::create_dir_all(course.join("02-b")).unwrap();
        std::fs::create_dir_all(course.join("03-c")).unwrap();
        std::fs::write(course.join("course.yaml"), "title: Three\n").unwrap();
        let check = concat!(
            "knowledge_check:\n",
            "  questions:\n",
            "    - id: k1\n",
            "      prompt: Ready?\n",
            "      choices: [yes, no]\n",
            "      answer: 0\n",
        );
        std::fs::write(course.join("01-a/module.yaml"), format!("title: A\n{check}")).unwrap();
        std::fs::write(course.join("02-b/module.yaml"), format!("title: B\n{check}")).unwrap();
        std::fs::write(course.join("03-c/module.yaml"), "title: C\n").unwrap();
        for module in ["01-a", "02-b", "03-c"] {
            std::fs::write(course.join(module).join("01-intro.mdx"), "# Intro\n").unwrap();
        }

        let right = answers(&[("k1", 0)]);
        engine.submit(&user, "tri-101", "a", &right).await.unwrap();
        engine.submit(&user, "tri-101", "b", &right).await.unwrap();
        let tree = tracker.navigation_for(&user, "tri-101").await.unwrap();
        assert_eq!(tree.current_module.as_deref(), Some("c"));

        let again = engine.submit(&user, "tri-101", "a", &right).await.unwrap();
        assert!(again.passed);
        assert_eq!(again.attempt, 2);
        let tree = tracker.navigation_for(&user, "tri-101").await.unwrap();
        assert_eq!(tree.current_module.as_deref(), Some("c"));
    }
}
