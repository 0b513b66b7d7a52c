use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{AttemptId, CourseId, LessonId, QuestionId, UserId};

//
// ─── ANSWERS ───────────────────────────────────────────────────────────────────
//

/// Raw answer payload as submitted, keyed by question ID in an attempt.
///
/// Kept adjacently tagged so the stored JSON stays readable in the database
/// and stable across releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Answer {
    /// One selected choice text (single-choice questions).
    Choice(String),
    /// Selected choice texts (multiple-choice questions).
    Choices(Vec<String>),
    /// Free text (fill-in-blank and essay questions).
    Text(String),
}

/// Map of question ID to the submitted answer.
pub type AnswerMap = HashMap<QuestionId, Answer>;

//
// ─── QUIZ ATTEMPT ──────────────────────────────────────────────────────────────
//

/// Immutable record of one quiz submission and its computed outcome.
///
/// Attempts are never edited after creation; retakes create new attempts.
/// The most recent attempt per lesson determines displayed progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAttempt {
    id: AttemptId,
    user_id: UserId,
    course_id: CourseId,
    lesson_id: LessonId,
    answers: AnswerMap,
    score: u8,
    passed: bool,
    submitted_at: DateTime<Utc>,
}

impl QuizAttempt {
    /// Reconstructs an attempt; used by storage and by the quiz service
    /// right after grading. There is no mutating API.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: AttemptId,
        user_id: UserId,
        course_id: CourseId,
        lesson_id: LessonId,
        answers: AnswerMap,
        score: u8,
        passed: bool,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            course_id,
            lesson_id,
            answers,
            score,
            passed,
            submitted_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> AttemptId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    /// Computed score in [0, 100].
    #[must_use]
    pub fn score(&self) -> u8 {
        self.score
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }

    #[must_use]
    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn answers_round_trip_as_json() {
        let mut answers = AnswerMap::new();
        answers.insert(QuestionId::new(1), Answer::Choice("22".into()));
        answers.insert(
            QuestionId::new(2),
            Answer::Choices(vec!["a".into(), "b".into()]),
        );
        answers.insert(QuestionId::new(3), Answer::Text("96".into()));

        let json = serde_json::to_string(&answers).expect("serialize");
        let back: AnswerMap = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, answers);
    }

    #[test]
    fn attempt_exposes_its_outcome() {
        let attempt = QuizAttempt::from_persisted(
            AttemptId::new(1),
            UserId::new("user_1"),
            CourseId::new(2),
            LessonId::new(3),
            AnswerMap::new(),
            85,
            true,
            fixed_now(),
        );
        assert_eq!(attempt.score(), 85);
        assert!(attempt.passed());
        assert_eq!(attempt.lesson_id(), LessonId::new(3));
    }
}
