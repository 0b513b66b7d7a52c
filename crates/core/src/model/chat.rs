use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{MessageId, UserId};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ChatError {
    #[error("message body cannot be empty")]
    EmptyBody,
}

/// Which side of a support conversation wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    Student,
    Support,
}

impl Sender {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Sender::Student => "student",
            Sender::Support => "support",
        }
    }
}

/// One support-chat message. Conversations are keyed by the student; the
/// back office answers into the same thread. Delivery is client polling,
/// ordered by insertion (ascending message ID).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub user_id: UserId,
    pub sender: Sender,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Builds a message, rejecting blank bodies.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::EmptyBody` when the body is empty after trimming.
    pub fn new(
        id: MessageId,
        user_id: UserId,
        sender: Sender,
        body: String,
        sent_at: DateTime<Utc>,
    ) -> Result<Self, ChatError> {
        if body.trim().is_empty() {
            return Err(ChatError::EmptyBody);
        }
        Ok(Self {
            id,
            user_id,
            sender,
            body,
            sent_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn blank_bodies_are_rejected() {
        let err = ChatMessage::new(
            MessageId::new(1),
            UserId::new("user_1"),
            Sender::Student,
            "  \n".into(),
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, ChatError::EmptyBody);
    }

    #[test]
    fn body_is_kept_verbatim() {
        let msg = ChatMessage::new(
            MessageId::new(1),
            UserId::new("user_1"),
            Sender::Support,
            "Em kiểm tra giúp anh mã đơn nhé".into(),
            fixed_now(),
        )
        .unwrap();
        assert_eq!(msg.body, "Em kiểm tra giúp anh mã đơn nhé");
        assert_eq!(msg.sender, Sender::Support);
    }
}
