//! Student side of the polled support chat.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use tracing::instrument;

use havamath_core::model::{MessageId, Sender};

use crate::ApiContext;
use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::protocol::{ChatMessageOut, ChatSendIn, PollQuery};

const POLL_LIMIT: u32 = 50;

/// Poll for new messages. Clients pass their last-seen message ID and call
/// this on an interval; there is no push channel.
#[instrument(level = "debug", skip(ctx, user), fields(user = %user.0))]
pub async fn poll(
    State(ctx): State<Arc<ApiContext>>,
    user: CurrentUser,
    Query(query): Query<PollQuery>,
) -> ApiResult<Json<Vec<ChatMessageOut>>> {
    let messages = ctx
        .services()
        .chat()
        .poll(
            &user.0,
            query.after.map(MessageId::new),
            query.limit.unwrap_or(POLL_LIMIT).min(POLL_LIMIT),
        )
        .await?;
    Ok(Json(
        messages.iter().map(ChatMessageOut::from_message).collect(),
    ))
}

#[instrument(level = "info", skip(ctx, user, body), fields(user = %user.0))]
pub async fn send(
    State(ctx): State<Arc<ApiContext>>,
    user: CurrentUser,
    Json(body): Json<ChatSendIn>,
) -> ApiResult<Json<ChatMessageOut>> {
    let message = ctx
        .services()
        .chat()
        .send(&user.0, Sender::Student, body.body)
        .await?;
    Ok(Json(ChatMessageOut::from_message(&message)))
}
