use chrono::{DateTime, Utc};

use crate::model::ids::{CourseId, UserId};

/// Links a user to a course they have confirmed access to.
///
/// Created lazily on the first course visit after a completed payment
/// exists, never proactively for the whole catalog. Unique per user×course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub enrolled_at: DateTime<Utc>,
}
