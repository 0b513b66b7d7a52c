#![forbid(unsafe_code)]

pub mod auth;
pub mod error;
pub mod protocol;
pub mod routes;

use std::collections::HashSet;

use havamath_core::model::UserId;
use services::AppServices;

pub use error::{ApiError, ApiResult};
pub use routes::build_router;

/// Shared state behind every handler: the service layer plus the admin
/// allow-list.
pub struct ApiContext {
    services: AppServices,
    admins: HashSet<String>,
}

impl ApiContext {
    #[must_use]
    pub fn new(services: AppServices, admins: impl IntoIterator<Item = String>) -> Self {
        Self {
            services,
            admins: admins
                .into_iter()
                .map(|subject| subject.trim().to_string())
                .filter(|subject| !subject.is_empty())
                .collect(),
        }
    }

    #[must_use]
    pub fn services(&self) -> &AppServices {
        &self.services
    }

    #[must_use]
    pub fn is_admin(&self, user: &UserId) -> bool {
        self.admins.contains(user.as_str())
    }
}
