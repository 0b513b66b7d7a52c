use std::sync::Arc;

use havamath_core::model::{CourseId, UserId};
use havamath_core::progress::{self, CourseProgress};
use storage::repository::{AttemptRepository, CourseRepository};

use crate::error::ProgressServiceError;

/// Derives per-course learning progress for the dashboard.
#[derive(Clone)]
pub struct ProgressService {
    courses: Arc<dyn CourseRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(courses: Arc<dyn CourseRepository>, attempts: Arc<dyn AttemptRepository>) -> Self {
        Self { courses, attempts }
    }

    /// Per-lesson status plus the completion percentage for one course.
    ///
    /// Attempts are fetched with one query per course and grouped here,
    /// keeping the most recent per lesson.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::CourseNotFound` when the course is
    /// missing, or `Storage` if repository access fails.
    pub async fn course_progress(
        &self,
        user: &UserId,
        course_id: CourseId,
    ) -> Result<CourseProgress, ProgressServiceError> {
        let course = self
            .courses
            .get_course(course_id)
            .await?
            .ok_or(ProgressServiceError::CourseNotFound)?;

        let attempts = self.attempts.attempts_for_course(user, course_id).await?;
        let latest = progress::latest_per_lesson(&attempts);
        Ok(progress::aggregate(&course, &latest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use havamath_core::model::{
        AnswerMap, CourseDraft, LessonDraft, LessonDraftKind, ModuleDraft, QuestionDraft,
        QuestionKind, QuizDraft, VideoDraft,
    };
    use havamath_core::time::fixed_now;
    use chrono::Duration;
    use storage::repository::{InMemoryRepository, NewAttemptRecord};

    async fn seeded() -> (ProgressService, Arc<InMemoryRepository>, CourseId) {
        let repo = Arc::new(InMemoryRepository::new());
        let validated = CourseDraft {
            title: "Toán 12".into(),
            description: None,
            category: "Toán".into(),
            author: "Thầy Hà".into(),
            price_vnd: 599_000,
            modules: vec![ModuleDraft {
                title: "Chương 1".into(),
                lessons: vec![
                    LessonDraft {
                        title: "Bài giảng".into(),
                        kind: LessonDraftKind::Video(VideoDraft {
                            url: "https://videos.example.com/1.mp4".into(),
                            notes: None,
                            attachments: vec![],
                        }),
                    },
                    LessonDraft {
                        title: "Kiểm tra".into(),
                        kind: LessonDraftKind::Quiz(QuizDraft {
                            questions: vec![QuestionDraft {
                                points: 1,
                                kind: QuestionKind::FillInBlank { answer: "96".into() },
                            }],
                            passing_score: 70,
                            time_limit_secs: None,
                        }),
                    },
                ],
            }],
        }
        .validate(fixed_now())
        .unwrap();
        let course_id = repo.insert_course(&validated).await.unwrap();
        let service = ProgressService::new(repo.clone(), repo.clone());
        (service, repo, course_id)
    }

    #[tokio::test]
    async fn progress_tracks_the_latest_attempt_only() {
        let (service, repo, course_id) = seeded().await;
        let user = UserId::new("user_1");
        let course = repo.get_course(course_id).await.unwrap().unwrap();
        let quiz_lesson = course.lessons().find(|l| l.is_quiz()).unwrap().id;

        // Older passing attempt, newer failing retake.
        for (minutes_ago, score, passed) in [(60_i64, 90_u8, true), (5, 40, false)] {
            repo.insert_attempt(NewAttemptRecord {
                user_id: user.clone(),
                course_id,
                lesson_id: quiz_lesson,
                answers: AnswerMap::new(),
                score,
                passed,
                submitted_at: fixed_now() - Duration::minutes(minutes_ago),
            })
            .await
            .unwrap();
        }

        let progress = service.course_progress(&user, course_id).await.unwrap();
        assert_eq!(progress.total_lessons, 2);
        assert_eq!(progress.completed_lessons, 0);
        assert_eq!(progress.percent, 0);

        // Video lesson stays incomplete regardless.
        assert!(!progress.lessons[0].completed);
        assert_eq!(progress.lessons[1].latest_score, Some(40));
    }

    #[tokio::test]
    async fn missing_course_is_reported() {
        let (service, _repo, _course_id) = seeded().await;
        let err = service
            .course_progress(&UserId::new("user_1"), CourseId::new(404))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressServiceError::CourseNotFound));
    }

    #[tokio::test]
    async fn user_with_no_attempts_sees_zero_progress() {
        let (service, _repo, course_id) = seeded().await;
        let progress = service
            .course_progress(&UserId::new("user_fresh"), course_id)
            .await
            .unwrap();
        assert_eq!(progress.percent, 0);
        assert!(progress.lessons.iter().all(|l| !l.completed));
    }
}
