//! Router assembly: JSON API, CORS, and per-request HTTP tracing.

use std::sync::Arc;

use axum::{
    Json, Router,
    routing::{get, post, put},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::ApiContext;
use crate::protocol::HealthOut;

pub mod admin;
pub mod billing;
pub mod catalog;
pub mod chat;
pub mod quiz;

async fn health() -> Json<HealthOut> {
    Json(HealthOut { ok: true })
}

/// Build the application router:
/// - learner API under `/api/v1/...`
/// - back office under `/api/v1/admin/...` (allow-listed subjects only)
/// - CORS open for the web client; tighten per deployment
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(ctx: Arc<ApiContext>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        // Catalog + learning
        .route("/api/v1/courses", get(catalog::list_courses))
        .route("/api/v1/courses/:id", get(catalog::get_course))
        .route("/api/v1/courses/:id/visit", post(catalog::visit_course))
        .route("/api/v1/courses/:id/progress", get(catalog::course_progress))
        .route(
            "/api/v1/lessons/:id/attempts",
            post(quiz::submit_attempt).get(quiz::attempt_history),
        )
        // Checkout
        .route(
            "/api/v1/orders",
            post(billing::submit_order).get(billing::order_history),
        )
        .route("/api/v1/redeem", post(billing::redeem))
        .route("/api/v1/enrollments", get(billing::enrollments))
        // Support chat (polled)
        .route("/api/v1/chat", get(chat::poll).post(chat::send))
        // Back office
        .route("/api/v1/admin/courses", post(admin::create_course))
        .route(
            "/api/v1/admin/courses/:id",
            put(admin::update_course).delete(admin::delete_course),
        )
        .route("/api/v1/admin/import", post(admin::import_bundle))
        .route("/api/v1/admin/import/pull", post(admin::pull_import))
        .route("/api/v1/admin/payments", get(admin::list_payments))
        .route("/api/v1/admin/payments/:id/approve", post(admin::approve_payment))
        .route("/api/v1/admin/payments/:id/reject", post(admin::reject_payment))
        .route(
            "/api/v1/admin/codes",
            post(admin::issue_codes).get(admin::list_codes),
        )
        .route(
            "/api/v1/admin/codes/:code/deactivate",
            post(admin::deactivate_code),
        )
        .route("/api/v1/admin/chat", get(admin::conversations))
        .route(
            "/api/v1/admin/chat/:user",
            get(admin::poll_conversation).post(admin::reply),
        )
        .with_state(ctx)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}
