//! Back office: course authoring, imports, payment approval, code
//! issuance, and support-chat replies. Every handler requires an
//! allow-listed subject.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use tracing::{info, instrument};

use havamath_core::model::{CourseId, MessageId, PaymentId, PaymentStatus, Sender, UserId};
use services::CourseBundle;

use crate::ApiContext;
use crate::auth::AdminUser;
use crate::error::ApiResult;
use crate::protocol::{
    ChatMessageOut, ChatSendIn, CodeOut, ConversationOut, CourseIn, CreatedOut, ImportOut,
    IssueCodesIn, PaymentOut, PollQuery, StatusQuery,
};

const LIST_LIMIT: u32 = 200;

//
// ─── COURSE AUTHORING ──────────────────────────────────────────────────────────
//

#[instrument(level = "info", skip(ctx, admin, body), fields(admin = %admin.0))]
pub async fn create_course(
    State(ctx): State<Arc<ApiContext>>,
    admin: AdminUser,
    Json(body): Json<CourseIn>,
) -> ApiResult<Json<CreatedOut>> {
    let id = ctx.services().catalog().create_course(body).await?;
    info!(course = %id, "course created");
    Ok(Json(CreatedOut { id: id.value() }))
}

#[instrument(level = "info", skip(ctx, admin, body), fields(admin = %admin.0, course = id))]
pub async fn update_course(
    State(ctx): State<Arc<ApiContext>>,
    admin: AdminUser,
    Path(id): Path<u64>,
    Json(body): Json<CourseIn>,
) -> ApiResult<Json<CreatedOut>> {
    ctx.services()
        .catalog()
        .update_course(CourseId::new(id), body)
        .await?;
    Ok(Json(CreatedOut { id }))
}

#[instrument(level = "info", skip(ctx, admin), fields(admin = %admin.0, course = id))]
pub async fn delete_course(
    State(ctx): State<Arc<ApiContext>>,
    admin: AdminUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<CreatedOut>> {
    ctx.services()
        .catalog()
        .delete_course(CourseId::new(id))
        .await?;
    Ok(Json(CreatedOut { id }))
}

#[instrument(level = "info", skip(ctx, admin, body), fields(admin = %admin.0))]
pub async fn import_bundle(
    State(ctx): State<Arc<ApiContext>>,
    admin: AdminUser,
    Json(body): Json<CourseBundle>,
) -> ApiResult<Json<ImportOut>> {
    let report = ctx.services().import().import_bundle(body).await?;
    Ok(Json(ImportOut {
        created: report.created.iter().map(|id| id.value()).collect(),
        updated: report.updated.iter().map(|id| id.value()).collect(),
    }))
}

/// Pull the course bundle from the configured CMS export. Rejected when no
/// CMS endpoint is configured.
#[instrument(level = "info", skip(ctx, admin), fields(admin = %admin.0))]
pub async fn pull_import(
    State(ctx): State<Arc<ApiContext>>,
    admin: AdminUser,
) -> ApiResult<Json<ImportOut>> {
    let report = ctx.services().import().pull_from_cms().await?;
    Ok(Json(ImportOut {
        created: report.created.iter().map(|id| id.value()).collect(),
        updated: report.updated.iter().map(|id| id.value()).collect(),
    }))
}

//
// ─── PAYMENT APPROVAL ──────────────────────────────────────────────────────────
//

#[instrument(level = "info", skip(ctx, admin), fields(admin = %admin.0))]
pub async fn list_payments(
    State(ctx): State<Arc<ApiContext>>,
    admin: AdminUser,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<Vec<PaymentOut>>> {
    let status = query.status.unwrap_or(PaymentStatus::Pending);
    let payments = ctx
        .services()
        .payments()
        .list_by_status(status, LIST_LIMIT)
        .await?;
    Ok(Json(payments.iter().map(PaymentOut::from_payment).collect()))
}

#[instrument(level = "info", skip(ctx, admin), fields(admin = %admin.0, payment = id))]
pub async fn approve_payment(
    State(ctx): State<Arc<ApiContext>>,
    admin: AdminUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<PaymentOut>> {
    let payment = ctx.services().payments().approve(PaymentId::new(id)).await?;
    info!(payment = id, "payment approved");
    Ok(Json(PaymentOut::from_payment(&payment)))
}

#[instrument(level = "info", skip(ctx, admin), fields(admin = %admin.0, payment = id))]
pub async fn reject_payment(
    State(ctx): State<Arc<ApiContext>>,
    admin: AdminUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<PaymentOut>> {
    let payment = ctx.services().payments().reject(PaymentId::new(id)).await?;
    Ok(Json(PaymentOut::from_payment(&payment)))
}

//
// ─── CODE ISSUANCE ─────────────────────────────────────────────────────────────
//

#[instrument(level = "info", skip(ctx, admin, body), fields(admin = %admin.0, count = body.count))]
pub async fn issue_codes(
    State(ctx): State<Arc<ApiContext>>,
    admin: AdminUser,
    Json(body): Json<IssueCodesIn>,
) -> ApiResult<Json<Vec<CodeOut>>> {
    let codes = ctx
        .services()
        .redemption()
        .generate_batch(&admin.0, body.count, body.expires_at)
        .await?;
    Ok(Json(codes.iter().map(CodeOut::from_code).collect()))
}

#[instrument(level = "info", skip(ctx, admin), fields(admin = %admin.0))]
pub async fn list_codes(
    State(ctx): State<Arc<ApiContext>>,
    admin: AdminUser,
) -> ApiResult<Json<Vec<CodeOut>>> {
    let codes = ctx.services().redemption().list(LIST_LIMIT).await?;
    Ok(Json(codes.iter().map(CodeOut::from_code).collect()))
}

#[instrument(level = "info", skip(ctx, admin), fields(admin = %admin.0, code = %code))]
pub async fn deactivate_code(
    State(ctx): State<Arc<ApiContext>>,
    admin: AdminUser,
    Path(code): Path<String>,
) -> ApiResult<Json<CodeOut>> {
    let code = ctx.services().redemption().deactivate(&code).await?;
    info!(code = %code.code(), "code deactivated");
    Ok(Json(CodeOut::from_code(&code)))
}

//
// ─── SUPPORT CHAT ──────────────────────────────────────────────────────────────
//

#[instrument(level = "info", skip(ctx, admin), fields(admin = %admin.0))]
pub async fn conversations(
    State(ctx): State<Arc<ApiContext>>,
    admin: AdminUser,
) -> ApiResult<Json<Vec<ConversationOut>>> {
    let conversations = ctx.services().chat().conversations(LIST_LIMIT).await?;
    Ok(Json(
        conversations
            .iter()
            .map(ConversationOut::from_summary)
            .collect(),
    ))
}

#[instrument(level = "debug", skip(ctx, admin), fields(admin = %admin.0, student = %user))]
pub async fn poll_conversation(
    State(ctx): State<Arc<ApiContext>>,
    admin: AdminUser,
    Path(user): Path<String>,
    Query(query): Query<PollQuery>,
) -> ApiResult<Json<Vec<ChatMessageOut>>> {
    let messages = ctx
        .services()
        .chat()
        .poll(
            &UserId::new(user),
            query.after.map(MessageId::new),
            query.limit.unwrap_or(50).min(200),
        )
        .await?;
    Ok(Json(
        messages.iter().map(ChatMessageOut::from_message).collect(),
    ))
}

#[instrument(level = "info", skip(ctx, admin, body), fields(admin = %admin.0, student = %user))]
pub async fn reply(
    State(ctx): State<Arc<ApiContext>>,
    admin: AdminUser,
    Path(user): Path<String>,
    Json(body): Json<ChatSendIn>,
) -> ApiResult<Json<ChatMessageOut>> {
    let message = ctx
        .services()
        .chat()
        .send(&UserId::new(user), Sender::Support, body.body)
        .await?;
    Ok(Json(ChatMessageOut::from_message(&message)))
}
