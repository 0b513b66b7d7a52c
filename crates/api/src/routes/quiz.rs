//! Quiz submission and attempt history.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use tracing::{info, instrument};

use havamath_core::model::{CourseId, LessonId};

use crate::ApiContext;
use crate::auth::{CurrentUser, MaybeUser};
use crate::error::ApiResult;
use crate::protocol::{AttemptOut, SubmitAttemptIn, SubmitAttemptOut};

/// Grade a submission. Works without a session; only signed-in submissions
/// are recorded as attempts.
#[instrument(level = "info", skip(ctx, user, body), fields(lesson = lesson_id))]
pub async fn submit_attempt(
    State(ctx): State<Arc<ApiContext>>,
    user: MaybeUser,
    Path(lesson_id): Path<u64>,
    Json(body): Json<SubmitAttemptIn>,
) -> ApiResult<Json<SubmitAttemptOut>> {
    let submission = ctx
        .services()
        .quizzes()
        .submit(
            user.0.as_ref(),
            CourseId::new(body.course_id),
            LessonId::new(lesson_id),
            body.answers,
        )
        .await?;

    info!(
        score = submission.outcome.score,
        passed = submission.outcome.passed,
        recorded = submission.attempt_id.is_some(),
        "quiz graded"
    );
    Ok(Json(SubmitAttemptOut::from_outcome(
        submission.outcome,
        submission.attempt_id.map(|id| id.value()),
    )))
}

#[instrument(level = "info", skip(ctx, user), fields(user = %user.0, lesson = lesson_id))]
pub async fn attempt_history(
    State(ctx): State<Arc<ApiContext>>,
    user: CurrentUser,
    Path(lesson_id): Path<u64>,
) -> ApiResult<Json<Vec<AttemptOut>>> {
    let attempts = ctx
        .services()
        .quizzes()
        .history(&user.0, LessonId::new(lesson_id))
        .await?;
    Ok(Json(attempts.iter().map(AttemptOut::from_attempt).collect()))
}
