use chrono::{DateTime, Utc};
use havamath_core::model::{CourseId, Enrollment, UserId};

use super::SqliteRepository;
use super::mapping::{conn, map_enrollment_row, to_i64};
use crate::repository::{EnrollmentRepository, StorageError};

#[async_trait::async_trait]
impl EnrollmentRepository for SqliteRepository {
    async fn ensure_enrollment(
        &self,
        user: &UserId,
        course: CourseId,
        now: DateTime<Utc>,
    ) -> Result<Enrollment, StorageError> {
        // Lazy creation is idempotent: the primary key makes a second visit
        // a no-op and the stored row keeps its original timestamp.
        sqlx::query(
            r"
            INSERT OR IGNORE INTO enrollments (user_id, course_id, enrolled_at)
            VALUES (?1, ?2, ?3)
            ",
        )
        .bind(user.as_str())
        .bind(to_i64("course_id", course.value())?)
        .bind(now)
        .execute(self.pool())
        .await
        .map_err(conn)?;

        let row = sqlx::query(
            r"
            SELECT user_id, course_id, enrolled_at
            FROM enrollments
            WHERE user_id = ?1 AND course_id = ?2
            ",
        )
        .bind(user.as_str())
        .bind(to_i64("course_id", course.value())?)
        .fetch_one(self.pool())
        .await
        .map_err(conn)?;

        map_enrollment_row(&row)
    }

    async fn is_enrolled(&self, user: &UserId, course: CourseId) -> Result<bool, StorageError> {
        let row = sqlx::query(
            "SELECT 1 FROM enrollments WHERE user_id = ?1 AND course_id = ?2",
        )
        .bind(user.as_str())
        .bind(to_i64("course_id", course.value())?)
        .fetch_optional(self.pool())
        .await
        .map_err(conn)?;
        Ok(row.is_some())
    }

    async fn enrollments_for_user(&self, user: &UserId) -> Result<Vec<Enrollment>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, course_id, enrolled_at
            FROM enrollments
            WHERE user_id = ?1
            ORDER BY enrolled_at DESC
            ",
        )
        .bind(user.as_str())
        .fetch_all(self.pool())
        .await
        .map_err(conn)?;

        rows.iter().map(map_enrollment_row).collect()
    }
}
