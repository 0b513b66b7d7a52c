use std::sync::Arc;

use havamath_core::model::{AnswerMap, AttemptId, CourseId, LessonId, QuizAttempt, UserId};
use havamath_core::scoring::{self, QuizOutcome};
use storage::repository::{AttemptRepository, CourseRepository, NewAttemptRecord};

use crate::Clock;
use crate::error::QuizServiceError;

/// Result of one submission: the graded outcome plus the attempt ID when a
/// signed-in user's attempt was recorded.
#[derive(Debug, Clone)]
pub struct QuizSubmission {
    pub outcome: QuizOutcome,
    pub attempt_id: Option<AttemptId>,
}

/// Grades submissions against stored lessons and records attempts.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl QuizService {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        Self {
            clock,
            courses,
            attempts,
        }
    }

    /// Grade a submission against the stored lesson.
    ///
    /// Grading always happens; the attempt is persisted only when a user
    /// identity is present. Anonymous submissions still get their result
    /// back, unrecorded.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError` when the course or lesson is missing, the
    /// lesson is not a quiz, or persistence fails.
    pub async fn submit(
        &self,
        user: Option<&UserId>,
        course_id: CourseId,
        lesson_id: LessonId,
        answers: AnswerMap,
    ) -> Result<QuizSubmission, QuizServiceError> {
        let course = self
            .courses
            .get_course(course_id)
            .await?
            .ok_or(QuizServiceError::CourseNotFound)?;
        let lesson = course
            .find_lesson(lesson_id)
            .ok_or(QuizServiceError::LessonNotFound)?;
        let quiz = lesson.quiz().ok_or(QuizServiceError::NotAQuiz)?;

        let outcome = scoring::grade(&quiz.questions, &answers, quiz.passing_score);

        let attempt_id = match user {
            Some(user) => {
                let id = self
                    .attempts
                    .insert_attempt(NewAttemptRecord {
                        user_id: user.clone(),
                        course_id,
                        lesson_id,
                        answers,
                        score: outcome.score,
                        passed: outcome.passed,
                        submitted_at: self.clock.now(),
                    })
                    .await?;
                Some(id)
            }
            None => None,
        };

        Ok(QuizSubmission {
            outcome,
            attempt_id,
        })
    }

    /// A user's attempt history for one lesson, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if repository access fails.
    pub async fn history(
        &self,
        user: &UserId,
        lesson_id: LessonId,
    ) -> Result<Vec<QuizAttempt>, QuizServiceError> {
        let attempts = self.attempts.attempts_for_lesson(user, lesson_id).await?;
        Ok(attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use havamath_core::model::{
        Answer, CourseDraft, LessonDraft, LessonDraftKind, ModuleDraft, QuestionDraft,
        QuestionKind, QuizDraft,
    };
    use havamath_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    async fn seeded() -> (QuizService, CourseId, LessonId) {
        let repo = Arc::new(InMemoryRepository::new());
        let validated = CourseDraft {
            title: "Toán 12".into(),
            description: None,
            category: "Toán".into(),
            author: "Thầy Hà".into(),
            price_vnd: 599_000,
            modules: vec![ModuleDraft {
                title: "Chương 1".into(),
                lessons: vec![LessonDraft {
                    title: "Kiểm tra".into(),
                    kind: LessonDraftKind::Quiz(QuizDraft {
                        questions: vec![
                            QuestionDraft {
                                points: 1,
                                kind: QuestionKind::SingleChoice {
                                    choices: vec!["21".into(), "22".into()],
                                    correct: "22".into(),
                                },
                            },
                            QuestionDraft {
                                points: 1,
                                kind: QuestionKind::FillInBlank { answer: "96".into() },
                            },
                        ],
                        passing_score: 70,
                        time_limit_secs: None,
                    }),
                }],
            }],
        }
        .validate(fixed_now())
        .unwrap();

        let course_id = repo.insert_course(&validated).await.unwrap();
        let service = QuizService::new(Clock::fixed(fixed_now()), repo.clone(), repo.clone());
        let course = service.courses.get_course(course_id).await.unwrap().unwrap();
        let lesson_id = course.lessons().next().unwrap().id;
        (service, course_id, lesson_id)
    }

    fn full_marks(lesson_questions: (u64, u64)) -> AnswerMap {
        let mut answers = AnswerMap::new();
        answers.insert(
            havamath_core::model::QuestionId::new(lesson_questions.0),
            Answer::Choice("22".into()),
        );
        answers.insert(
            havamath_core::model::QuestionId::new(lesson_questions.1),
            Answer::Text(" 96 ".into()),
        );
        answers
    }

    #[tokio::test]
    async fn signed_in_submission_is_recorded() {
        let (service, course_id, lesson_id) = seeded().await;
        let course = service.courses.get_course(course_id).await.unwrap().unwrap();
        let quiz = course.find_lesson(lesson_id).unwrap().quiz().unwrap();
        let (q1, q2) = (quiz.questions[0].id.value(), quiz.questions[1].id.value());

        let user = UserId::new("user_1");
        let submission = service
            .submit(Some(&user), course_id, lesson_id, full_marks((q1, q2)))
            .await
            .unwrap();

        assert_eq!(submission.outcome.score, 100);
        assert!(submission.outcome.passed);
        assert!(submission.attempt_id.is_some());

        let history = service.history(&user, lesson_id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].score(), 100);
    }

    #[tokio::test]
    async fn anonymous_submission_scores_but_records_nothing() {
        let (service, course_id, lesson_id) = seeded().await;
        let submission = service
            .submit(None, course_id, lesson_id, AnswerMap::new())
            .await
            .unwrap();

        assert_eq!(submission.outcome.score, 0);
        assert!(submission.attempt_id.is_none());

        let history = service
            .history(&UserId::new("user_1"), lesson_id)
            .await
            .unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn submitting_to_a_missing_lesson_fails() {
        let (service, course_id, _) = seeded().await;
        let err = service
            .submit(None, course_id, LessonId::new(404), AnswerMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, QuizServiceError::LessonNotFound));
    }

    #[tokio::test]
    async fn retakes_append_new_attempts() {
        let (service, course_id, lesson_id) = seeded().await;
        let user = UserId::new("user_1");
        for _ in 0..2 {
            service
                .submit(Some(&user), course_id, lesson_id, AnswerMap::new())
                .await
                .unwrap();
        }
        let history = service.history(&user, lesson_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_ne!(history[0].id(), history[1].id());
    }
}
