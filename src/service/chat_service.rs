// service/chat_service.rs
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::{
        chatdb::{self, ChatExt},
        db::DBClient,
    },
    models::chatmodel::*,
    service::{
        chat_filter::{self, DetectedFlag},
        error::ServiceError,
    },
};

#[derive(Debug, Serialize)]
pub struct SentMessage {
    pub message: Message,
    pub is_blocked: bool,
    pub flags: Vec<DetectedFlag>,
}

#[derive(Debug, Clone)]
pub struct ChatService {
    db_client: Arc<DBClient>,
}

impl ChatService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    async fn conversation_for(&self, conversation_id: Uuid, user_id: Uuid) -> Result<Conversation, ServiceError> {
        let conversation = self
            .db_client
            .get_conversation(conversation_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Conversation"))?;

        if !conversation.is_participant(user_id) {
            return Err(ServiceError::forbidden("You are not a participant in this conversation"));
        }

        Ok(conversation)
    }

    /// Runs the content filter and stores the outcome. A blocked message is
    /// kept as a system record with empty content so only the sender and
    /// auditors ever see what was attempted.
    pub async fn send_message(
        &self,
        sender_id: Uuid,
        conversation_id: Uuid,
        content: &str,
    ) -> Result<SentMessage, ServiceError> {
        if content.trim().is_empty() {
            return Err(ServiceError::Validation("Message content cannot be empty".to_string()));
        }

        let conversation = self.conversation_for(conversation_id, sender_id).await?;
        let filtered = chat_filter::filter(content, conversation.escrow_active);

        let mut tx = self.db_client.begin().await?;

        let message = if filtered.is_blocked {
            chatdb::insert_message(
                &mut tx,
                conversation.id,
                sender_id,
                MessageType::System,
                "",
                Some(content),
                true,
            )
            .await?
        } else {
            let original = (filtered.sanitized_content != content).then_some(content);
            chatdb::insert_message(
                &mut tx,
                conversation.id,
                sender_id,
                MessageType::Text,
                &filtered.sanitized_content,
                original,
                false,
            )
            .await?
        };

        for flag in &filtered.flags {
            chatdb::insert_message_flag(&mut tx, message.id, flag.flag_type, &flag.matched).await?;
        }

        if !filtered.is_blocked {
            chatdb::touch_conversation(&mut tx, conversation.id).await?;
        }

        tx.commit().await?;

        if filtered.is_flagged() {
            tracing::warn!(
                "Message {} from {} in conversation {} flagged {:?} (blocked: {})",
                message.id,
                sender_id,
                conversation.id,
                filtered.flags.iter().map(|f| f.flag_type).collect::<Vec<_>>(),
                filtered.is_blocked
            );
        }

        Ok(SentMessage {
            message,
            is_blocked: filtered.is_blocked,
            flags: filtered.flags,
        })
    }

    pub async fn list_messages(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, ServiceError> {
        let conversation = self.conversation_for(conversation_id, user_id).await?;
        Ok(self
            .db_client
            .get_messages(conversation.id, user_id, limit, offset)
            .await?)
    }

    pub async fn get_project_conversation(&self, project_id: Uuid, user_id: Uuid) -> Result<Conversation, ServiceError> {
        let conversation = self
            .db_client
            .get_conversation_by_project(project_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Conversation"))?;

        if !conversation.is_participant(user_id) {
            return Err(ServiceError::forbidden("You are not a participant in this conversation"));
        }

        Ok(conversation)
    }
}
