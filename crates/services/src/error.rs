//! Shared error types for the services crate.

use thiserror::Error;

use havamath_core::model::{ChatError, CourseError, RedeemError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogServiceError {
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuizService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error("course not found")]
    CourseNotFound,
    #[error("lesson not found in course")]
    LessonNotFound,
    #[error("lesson is not a quiz")]
    NotAQuiz,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("course not found")]
    CourseNotFound,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `RedemptionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RedemptionServiceError {
    #[error("batch size must be between 1 and {max}", max = crate::redemption_service::MAX_BATCH_SIZE)]
    InvalidBatchSize,
    #[error("could not generate a unique code within the retry budget")]
    KeyspaceExhausted,
    #[error(transparent)]
    Redeem(#[from] RedeemError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `PaymentService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PaymentServiceError {
    #[error("payment not found")]
    NotFound,
    #[error("payment has already been settled")]
    AlreadySettled,
    #[error("order amount must be greater than zero")]
    ZeroAmount,
    #[error("orders can only be paid by bank transfer or mobile wallet")]
    UnsupportedMethod,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `EnrollmentService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EnrollmentServiceError {
    #[error("course not found")]
    CourseNotFound,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ChatService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChatServiceError {
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ImportService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ImportServiceError {
    #[error("no CMS endpoint is configured")]
    Disabled,
    #[error("CMS request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Decode(#[from] serde_json::Error),
    #[error("bundle refers to course {0} which does not exist")]
    UnknownCourse(u64),
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
