//! Chat Service
//!
//! Validates, persists, and prepares chat messages for fan-out. This is the
//! message router of the gateway: every send or delete request passes through
//! here before anything is broadcast, and nothing is broadcast when a request
//! fails.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::{
    ChatTarget, GroupRepository, Message, MessageRepository, MessageType, UserRepository,
};
use crate::shared::error::EventError;
use crate::shared::snowflake::SnowflakeGenerator;
use crate::shared::validation::validation_error;

/// Send request as received from the wire.
///
/// Exactly one of `receiver_id`/`group_id` must be set; `ChatTarget` enforces
/// the rule after the content checks.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 4000, message = "Content must be 1-4000 characters"))]
    pub content: String,

    #[serde(default, rename = "type")]
    pub message_type: MessageType,

    #[serde(default)]
    pub receiver_id: Option<i64>,

    #[serde(default)]
    pub group_id: Option<i64>,
}

/// Message data transfer object emitted to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: String,
    pub sender_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub created_at: String,
}

impl From<Message> for MessageDto {
    fn from(message: Message) -> Self {
        Self {
            id: message.id.to_string(),
            sender_id: message.sender_id.to_string(),
            receiver_id: message.receiver_id.map(|id| id.to_string()),
            group_id: message.group_id.map(|id| id.to_string()),
            content: message.content,
            message_type: message.message_type.as_str().to_string(),
            created_at: message.created_at.to_rfc3339(),
        }
    }
}

/// Chat service implementation.
pub struct ChatService<M, G, U>
where
    M: MessageRepository,
    G: GroupRepository,
    U: UserRepository,
{
    message_repo: Arc<M>,
    group_repo: Arc<G>,
    user_repo: Arc<U>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<M, G, U> ChatService<M, G, U>
where
    M: MessageRepository,
    G: GroupRepository,
    U: UserRepository,
{
    pub fn new(
        message_repo: Arc<M>,
        group_repo: Arc<G>,
        user_repo: Arc<U>,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            message_repo,
            group_repo,
            user_repo,
            id_generator,
        }
    }

    /// Validate and persist a message.
    ///
    /// Validation order, first failure wins: content shape, target shape,
    /// group membership, recipient existence. The message is persisted before
    /// the caller fans it out, so readers of history never race the live
    /// broadcast.
    pub async fn send_message(
        &self,
        sender_id: i64,
        request: SendMessageRequest,
    ) -> Result<Message, EventError> {
        request.validate().map_err(validation_error)?;
        if request.content.trim().is_empty() {
            return Err(EventError::Validation("content must not be blank".into()));
        }

        let target = ChatTarget::from_parts(request.receiver_id, request.group_id)?;

        match target {
            ChatTarget::Group(group_id) => {
                let is_member = self.group_repo.is_member(sender_id, group_id).await?;
                if !is_member {
                    return Err(EventError::Authorization(
                        "not a member of this group".into(),
                    ));
                }
            }
            ChatTarget::Direct(receiver_id) => {
                self.user_repo
                    .find_by_id(receiver_id)
                    .await?
                    .ok_or_else(|| {
                        EventError::NotFound(format!("user {} not found", receiver_id))
                    })?;
            }
        }

        let message = Message {
            id: self.id_generator.generate(),
            sender_id,
            receiver_id: request.receiver_id,
            group_id: request.group_id,
            content: request.content,
            message_type: request.message_type,
            created_at: Utc::now(),
        };

        let persisted = self.message_repo.create(&message).await?;
        Ok(persisted)
    }

    /// Hard-delete a message. Only the original sender may delete; the
    /// deleted message is returned so the caller can address the deletion
    /// notice to the original target.
    pub async fn delete_message(
        &self,
        requester_id: i64,
        message_id: i64,
    ) -> Result<Message, EventError> {
        let message = self
            .message_repo
            .find_by_id(message_id)
            .await?
            .ok_or_else(|| EventError::NotFound(format!("message {} not found", message_id)))?;

        if message.sender_id != requester_id {
            return Err(EventError::Authorization(
                "only the sender may delete a message".into(),
            ));
        }

        self.message_repo.delete(message_id).await?;
        Ok(message)
    }
}
