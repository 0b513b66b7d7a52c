//! Checkout: pending orders, code redemption, and enrollments.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use tracing::{info, instrument};

use crate::ApiContext;
use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::protocol::{EnrollmentOut, OrderIn, PaymentOut, RedeemIn, RedeemOut};

/// Open a pending order for manual back-office approval.
#[instrument(level = "info", skip(ctx, user, body), fields(user = %user.0))]
pub async fn submit_order(
    State(ctx): State<Arc<ApiContext>>,
    user: CurrentUser,
    Json(body): Json<OrderIn>,
) -> ApiResult<Json<PaymentOut>> {
    let payment = ctx
        .services()
        .payments()
        .submit_order(&user.0, body.amount_vnd, body.method)
        .await?;
    Ok(Json(PaymentOut::from_payment(&payment)))
}

#[instrument(level = "info", skip(ctx, user), fields(user = %user.0))]
pub async fn order_history(
    State(ctx): State<Arc<ApiContext>>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<PaymentOut>>> {
    let payments = ctx.services().payments().history(&user.0).await?;
    Ok(Json(payments.iter().map(PaymentOut::from_payment).collect()))
}

/// Consume a physical redemption code; on success the zero-amount grant
/// payment unlocks the catalog.
#[instrument(level = "info", skip(ctx, user, body), fields(user = %user.0))]
pub async fn redeem(
    State(ctx): State<Arc<ApiContext>>,
    user: CurrentUser,
    Json(body): Json<RedeemIn>,
) -> ApiResult<Json<RedeemOut>> {
    let redemption = ctx.services().redemption().redeem(&user.0, &body.code).await?;
    info!(code = %redemption.code.code(), "code redeemed");
    Ok(Json(RedeemOut {
        code: redemption.code.code().to_string(),
        redeemed_at: redemption.code.redeemed_at(),
        grant: PaymentOut::from_payment(&redemption.grant),
    }))
}

#[instrument(level = "info", skip(ctx, user), fields(user = %user.0))]
pub async fn enrollments(
    State(ctx): State<Arc<ApiContext>>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<EnrollmentOut>>> {
    let enrollments = ctx.services().enrollments().enrollments(&user.0).await?;
    Ok(Json(
        enrollments
            .iter()
            .map(EnrollmentOut::from_enrollment)
            .collect(),
    ))
}
