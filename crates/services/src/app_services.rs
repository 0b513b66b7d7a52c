use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::catalog_service::CatalogService;
use crate::chat_service::ChatService;
use crate::enrollment_service::EnrollmentService;
use crate::error::AppServicesError;
use crate::import::ImportService;
use crate::payment_service::PaymentService;
use crate::progress_service::ProgressService;
use crate::quiz_service::QuizService;
use crate::redemption_service::RedemptionService;

/// Assembles the application services over one `Storage`.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<CatalogService>,
    quizzes: Arc<QuizService>,
    progress: Arc<ProgressService>,
    redemption: Arc<RedemptionService>,
    payments: Arc<PaymentService>,
    enrollments: Arc<EnrollmentService>,
    chat: Arc<ChatService>,
    import: Arc<ImportService>,
}

impl AppServices {
    /// Build services over an already-open storage backend.
    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let catalog = Arc::new(CatalogService::new(clock, Arc::clone(&storage.courses)));
        let quizzes = Arc::new(QuizService::new(
            clock,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.attempts),
        ));
        let progress = Arc::new(ProgressService::new(
            Arc::clone(&storage.courses),
            Arc::clone(&storage.attempts),
        ));
        let redemption = Arc::new(RedemptionService::new(clock, Arc::clone(&storage.codes)));
        let payments = Arc::new(PaymentService::new(clock, Arc::clone(&storage.payments)));
        let enrollments = Arc::new(EnrollmentService::new(
            clock,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.payments),
            Arc::clone(&storage.enrollments),
        ));
        let chat = Arc::new(ChatService::new(clock, Arc::clone(&storage.chat)));
        let import = Arc::new(ImportService::from_env(clock, Arc::clone(&storage.courses)));

        Self {
            catalog,
            quizzes,
            progress,
            redemption,
            payments,
            enrollments,
            chat,
            import,
        }
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services over in-memory storage (tests, prototyping).
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn quizzes(&self) -> Arc<QuizService> {
        Arc::clone(&self.quizzes)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn redemption(&self) -> Arc<RedemptionService> {
        Arc::clone(&self.redemption)
    }

    #[must_use]
    pub fn payments(&self) -> Arc<PaymentService> {
        Arc::clone(&self.payments)
    }

    #[must_use]
    pub fn enrollments(&self) -> Arc<EnrollmentService> {
        Arc::clone(&self.enrollments)
    }

    #[must_use]
    pub fn chat(&self) -> Arc<ChatService> {
        Arc::clone(&self.chat)
    }

    #[must_use]
    pub fn import(&self) -> Arc<ImportService> {
        Arc::clone(&self.import)
    }
}
