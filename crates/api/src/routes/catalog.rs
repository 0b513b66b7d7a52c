//! Catalog, course visits, and dashboard progress.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use tracing::instrument;

use havamath_core::model::CourseId;

use crate::ApiContext;
use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::protocol::{
    CourseDetailOut, CourseSummaryOut, EnrollmentOut, ProgressOut, VisitOut,
};

const LIST_LIMIT: u32 = 100;

#[instrument(level = "info", skip(ctx))]
pub async fn list_courses(
    State(ctx): State<Arc<ApiContext>>,
) -> ApiResult<Json<Vec<CourseSummaryOut>>> {
    let courses = ctx.services().catalog().list_courses(LIST_LIMIT).await?;
    Ok(Json(
        courses.iter().map(CourseSummaryOut::from_course).collect(),
    ))
}

#[instrument(level = "info", skip(ctx))]
pub async fn get_course(
    State(ctx): State<Arc<ApiContext>>,
    Path(id): Path<u64>,
) -> ApiResult<Json<CourseDetailOut>> {
    let course = ctx
        .services()
        .catalog()
        .get_course(CourseId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Không tìm thấy khoá học".into()))?;
    Ok(Json(CourseDetailOut::from_course(&course)))
}

/// Lazy-enrollment touchpoint: visiting a course with confirmed access
/// materializes the enrollment.
#[instrument(level = "info", skip(ctx, user), fields(user = %user.0))]
pub async fn visit_course(
    State(ctx): State<Arc<ApiContext>>,
    user: CurrentUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<VisitOut>> {
    let enrollment = ctx
        .services()
        .enrollments()
        .visit_course(&user.0, CourseId::new(id))
        .await?;
    Ok(Json(VisitOut {
        enrolled: enrollment.is_some(),
        enrollment: enrollment.as_ref().map(EnrollmentOut::from_enrollment),
    }))
}

#[instrument(level = "info", skip(ctx, user), fields(user = %user.0))]
pub async fn course_progress(
    State(ctx): State<Arc<ApiContext>>,
    user: CurrentUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<ProgressOut>> {
    let progress = ctx
        .services()
        .progress()
        .course_progress(&user.0, CourseId::new(id))
        .await?;
    Ok(Json(ProgressOut::from_progress(progress)))
}
