use std::sync::Arc;

use havamath_core::model::{Course, CourseDraft, CourseId};
use storage::repository::CourseRepository;

use crate::Clock;
use crate::error::CatalogServiceError;

/// Orchestrates course authoring and catalog reads.
///
/// Course content is admin-authored; validation happens here so storage
/// only ever sees well-formed trees.
#[derive(Clone)]
pub struct CatalogService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(clock: Clock, courses: Arc<dyn CourseRepository>) -> Self {
        Self { clock, courses }
    }

    /// Validate and persist a new course.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Course` for validation failures.
    /// Returns `CatalogServiceError::Storage` if persistence fails.
    pub async fn create_course(&self, draft: CourseDraft) -> Result<CourseId, CatalogServiceError> {
        let validated = draft.validate(self.clock.now())?;
        let id = self.courses.insert_course(&validated).await?;
        Ok(id)
    }

    /// Validate a draft and replace the stored tree of an existing course.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Course` for validation failures.
    /// Returns `CatalogServiceError::Storage` (not found) if the course does
    /// not exist.
    pub async fn update_course(
        &self,
        id: CourseId,
        draft: CourseDraft,
    ) -> Result<(), CatalogServiceError> {
        let validated = draft.validate(self.clock.now())?;
        self.courses.replace_course(id, &validated).await?;
        Ok(())
    }

    /// Fetch a course with its full tree. Returns `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn get_course(&self, id: CourseId) -> Result<Option<Course>, CatalogServiceError> {
        let course = self.courses.get_course(id).await?;
        Ok(course)
    }

    /// List courses ordered by ID, up to the given limit.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn list_courses(&self, limit: u32) -> Result<Vec<Course>, CatalogServiceError> {
        let courses = self.courses.list_courses(limit).await?;
        Ok(courses)
    }

    /// Delete a course and its tree.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` (not found) if the course does
    /// not exist.
    pub async fn delete_course(&self, id: CourseId) -> Result<(), CatalogServiceError> {
        self.courses.delete_course(id).await?;
        Ok(())
    }
}
