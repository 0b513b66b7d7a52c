use std::sync::Arc;

use havamath_core::model::{ChatError, ChatMessage, MessageId, Sender, UserId};
use storage::repository::{ChatRepository, ConversationSummary, NewMessageRecord};

use crate::Clock;
use crate::error::ChatServiceError;

/// Support chat over polling.
///
/// One conversation per student; the back office answers into the same
/// thread. Clients poll with their last-seen message ID, there is no push
/// channel.
#[derive(Clone)]
pub struct ChatService {
    clock: Clock,
    chat: Arc<dyn ChatRepository>,
}

impl ChatService {
    #[must_use]
    pub fn new(clock: Clock, chat: Arc<dyn ChatRepository>) -> Self {
        Self { clock, chat }
    }

    /// Append a message to the student's conversation.
    ///
    /// # Errors
    ///
    /// Returns `Chat(EmptyBody)` for blank bodies or `Storage` if
    /// persistence fails.
    pub async fn send(
        &self,
        conversation: &UserId,
        sender: Sender,
        body: String,
    ) -> Result<ChatMessage, ChatServiceError> {
        if body.trim().is_empty() {
            return Err(ChatError::EmptyBody.into());
        }
        let sent_at = self.clock.now();
        let id = self
            .chat
            .insert_message(NewMessageRecord {
                user_id: conversation.clone(),
                sender,
                body: body.clone(),
                sent_at,
            })
            .await?;

        let message = ChatMessage::new(id, conversation.clone(), sender, body, sent_at)?;
        Ok(message)
    }

    /// Messages strictly after the caller's cursor, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if repository access fails.
    pub async fn poll(
        &self,
        conversation: &UserId,
        after: Option<MessageId>,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, ChatServiceError> {
        let messages = self.chat.messages_after(conversation, after, limit).await?;
        Ok(messages)
    }

    /// Conversation overview for the back office, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if repository access fails.
    pub async fn conversations(
        &self,
        limit: u32,
    ) -> Result<Vec<ConversationSummary>, ChatServiceError> {
        let conversations = self.chat.conversations(limit).await?;
        Ok(conversations)
    }
}
