use std::sync::Arc;

use havamath_core::model::{CourseId, Enrollment, UserId};
use storage::repository::{CourseRepository, EnrollmentRepository, PaymentRepository};

use crate::Clock;
use crate::error::EnrollmentServiceError;

/// Derives enrollments lazily from confirmed access.
///
/// Nothing is created at purchase time; the first visit to a course page
/// after a completed payment exists materializes the enrollment row.
#[derive(Clone)]
pub struct EnrollmentService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    payments: Arc<dyn PaymentRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
}

impl EnrollmentService {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        payments: Arc<dyn PaymentRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
    ) -> Self {
        Self {
            clock,
            courses,
            payments,
            enrollments,
        }
    }

    /// Record a course visit. Returns the enrollment when the visitor has
    /// confirmed access (creating it on first visit), `None` otherwise.
    ///
    /// # Errors
    ///
    /// Returns `CourseNotFound` for unknown courses or `Storage` if
    /// repository access fails.
    pub async fn visit_course(
        &self,
        user: &UserId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, EnrollmentServiceError> {
        if self.courses.get_course(course_id).await?.is_none() {
            return Err(EnrollmentServiceError::CourseNotFound);
        }
        if !self.payments.has_completed_payment(user).await? {
            return Ok(None);
        }
        let enrollment = self
            .enrollments
            .ensure_enrollment(user, course_id, self.clock.now())
            .await?;
        Ok(Some(enrollment))
    }

    /// A user's enrollments, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if repository access fails.
    pub async fn enrollments(&self, user: &UserId) -> Result<Vec<Enrollment>, EnrollmentServiceError> {
        let enrollments = self.enrollments.enrollments_for_user(user).await?;
        Ok(enrollments)
    }

    /// Whether the user is enrolled in the course.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if repository access fails.
    pub async fn is_enrolled(
        &self,
        user: &UserId,
        course_id: CourseId,
    ) -> Result<bool, EnrollmentServiceError> {
        let enrolled = self.enrollments.is_enrolled(user, course_id).await?;
        Ok(enrolled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use havamath_core::model::{CourseDraft, PaymentMethod, PaymentStatus};
    use havamath_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, NewPaymentRecord};
    use uuid::Uuid;

    async fn seeded() -> (EnrollmentService, Arc<InMemoryRepository>, CourseId) {
        let repo = Arc::new(InMemoryRepository::new());
        let validated = CourseDraft {
            title: "Toán 12".into(),
            description: None,
            category: "Toán".into(),
            author: "Thầy Hà".into(),
            price_vnd: 599_000,
            modules: vec![],
        }
        .validate(fixed_now())
        .unwrap();
        let course_id = repo.insert_course(&validated).await.unwrap();
        let service = EnrollmentService::new(
            Clock::fixed(fixed_now()),
            repo.clone(),
            repo.clone(),
            repo.clone(),
        );
        (service, repo, course_id)
    }

    async fn grant_access(repo: &InMemoryRepository, user: &UserId) {
        repo.insert_payment(NewPaymentRecord {
            user_id: user.clone(),
            amount_vnd: 0,
            method: PaymentMethod::RedemptionCode,
            status: PaymentStatus::Completed,
            reference: Uuid::new_v4(),
            created_at: fixed_now(),
            settled_at: Some(fixed_now()),
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn visit_without_access_creates_nothing() {
        let (service, _repo, course_id) = seeded().await;
        let user = UserId::new("user_1");
        let visit = service.visit_course(&user, course_id).await.unwrap();
        assert!(visit.is_none());
        assert!(!service.is_enrolled(&user, course_id).await.unwrap());
    }

    #[tokio::test]
    async fn first_visit_with_access_enrolls_once() {
        let (service, repo, course_id) = seeded().await;
        let user = UserId::new("user_1");
        grant_access(&repo, &user).await;

        let first = service.visit_course(&user, course_id).await.unwrap();
        assert!(first.is_some());
        let second = service.visit_course(&user, course_id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(service.enrollments(&user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_course_is_reported() {
        let (service, repo, _course_id) = seeded().await;
        let user = UserId::new("user_1");
        grant_access(&repo, &user).await;
        let err = service
            .visit_course(&user, CourseId::new(404))
            .await
            .unwrap_err();
        assert!(matches!(err, EnrollmentServiceError::CourseNotFound));
    }
}
