//! Request identity.
//!
//! Authentication itself is an external boundary: the fronting identity
//! provider verifies the session and injects the opaque subject as the
//! `x-user-id` header. These extractors only read that header; admin rights
//! come from the allow-list in [`ApiContext`].

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use havamath_core::model::UserId;

use crate::ApiContext;
use crate::error::ApiError;

/// Header carrying the verified subject of the caller.
pub const USER_HEADER: &str = "x-user-id";

fn subject_from_parts(parts: &Parts) -> Option<UserId> {
    parts
        .headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|subject| !subject.is_empty())
        .map(UserId::new)
}

/// Optional identity: quiz submissions work anonymously.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<UserId>);

/// Required identity; rejects with 401 when the subject header is absent.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserId);

/// Required identity that must also be on the admin allow-list.
#[derive(Debug, Clone)]
pub struct AdminUser(pub UserId);

#[axum::async_trait]
impl FromRequestParts<Arc<ApiContext>> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _ctx: &Arc<ApiContext>,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(subject_from_parts(parts)))
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<ApiContext>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _ctx: &Arc<ApiContext>,
    ) -> Result<Self, Self::Rejection> {
        subject_from_parts(parts)
            .map(CurrentUser)
            .ok_or(ApiError::Unauthorized)
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<ApiContext>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &Arc<ApiContext>,
    ) -> Result<Self, Self::Rejection> {
        let user = subject_from_parts(parts).ok_or(ApiError::Unauthorized)?;
        if !ctx.is_admin(&user) {
            return Err(ApiError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}
