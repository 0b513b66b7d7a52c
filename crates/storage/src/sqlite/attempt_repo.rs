use havamath_core::model::{AttemptId, CourseId, LessonId, QuizAttempt, UserId};

use super::SqliteRepository;
use super::mapping::{answers_to_json, attempt_id_from_i64, conn, map_attempt_row, to_i64};
use crate::repository::{AttemptRepository, NewAttemptRecord, StorageError};

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn insert_attempt(&self, attempt: NewAttemptRecord) -> Result<AttemptId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO quiz_attempts
                (user_id, course_id, lesson_id, answers, score, passed, submitted_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(attempt.user_id.as_str())
        .bind(to_i64("course_id", attempt.course_id.value())?)
        .bind(to_i64("lesson_id", attempt.lesson_id.value())?)
        .bind(answers_to_json(&attempt.answers)?)
        .bind(i64::from(attempt.score))
        .bind(i64::from(attempt.passed))
        .bind(attempt.submitted_at)
        .execute(self.pool())
        .await
        .map_err(conn)?;

        attempt_id_from_i64(res.last_insert_rowid())
    }

    async fn attempts_for_course(
        &self,
        user: &UserId,
        course: CourseId,
    ) -> Result<Vec<QuizAttempt>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, course_id, lesson_id, answers, score, passed, submitted_at
            FROM quiz_attempts
            WHERE user_id = ?1 AND course_id = ?2
            ORDER BY submitted_at DESC, id DESC
            ",
        )
        .bind(user.as_str())
        .bind(to_i64("course_id", course.value())?)
        .fetch_all(self.pool())
        .await
        .map_err(conn)?;

        rows.iter().map(map_attempt_row).collect()
    }

    async fn attempts_for_lesson(
        &self,
        user: &UserId,
        lesson: LessonId,
    ) -> Result<Vec<QuizAttempt>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, course_id, lesson_id, answers, score, passed, submitted_at
            FROM quiz_attempts
            WHERE user_id = ?1 AND lesson_id = ?2
            ORDER BY submitted_at DESC, id DESC
            ",
        )
        .bind(user.as_str())
        .bind(to_i64("lesson_id", lesson.value())?)
        .fetch_all(self.pool())
        .await
        .map_err(conn)?;

        rows.iter().map(map_attempt_row).collect()
    }
}
