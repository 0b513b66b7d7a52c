#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_service;
pub mod chat_service;
pub mod enrollment_service;
pub mod error;
pub mod import;
pub mod payment_service;
pub mod progress_service;
pub mod quiz_service;
pub mod redemption_service;

pub use havamath_core::Clock;

pub use app_services::AppServices;
pub use catalog_service::CatalogService;
pub use chat_service::ChatService;
pub use enrollment_service::EnrollmentService;
pub use error::{
    AppServicesError, CatalogServiceError, ChatServiceError, EnrollmentServiceError,
    ImportServiceError, PaymentServiceError, ProgressServiceError, QuizServiceError,
    RedemptionServiceError,
};
pub use import::{CmsConfig, CourseBundle, CourseEntry, ImportReport, ImportService};
pub use payment_service::PaymentService;
pub use progress_service::ProgressService;
pub use quiz_service::{QuizService, QuizSubmission};
pub use redemption_service::{Redemption, RedemptionService, MAX_BATCH_SIZE};
