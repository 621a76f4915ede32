//! Message entity, chat target, and repository trait.
//!
//! Maps to the `messages` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::RoomId;
use crate::shared::error::{AppError, EventError};

/// Message types matching the PostgreSQL ENUM `message_type`.
///
/// Database definition:
/// ```sql
/// CREATE TYPE message_type AS ENUM ('TEXT', 'IMAGE', 'FILE');
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    /// Plain text content
    #[default]
    Text,
    /// Content is a reference to an uploaded image
    Image,
    /// Content is a reference to an uploaded file
    File,
}

impl MessageType {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "IMAGE" => Self::Image,
            "FILE" => Self::File,
            _ => Self::Text,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Image => "IMAGE",
            Self::File => "FILE",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a message (or typing indicator) is addressed.
///
/// A request carries `receiver_id` or `group_id`; exactly one must be set.
/// Both validation and fan-out consume this single discriminated type, so
/// the direct and group paths cannot drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatTarget {
    /// Direct message to one identity
    Direct(i64),
    /// Broadcast to a chat group
    Group(i64),
}

impl ChatTarget {
    /// Build a target from the optional wire fields, enforcing the
    /// exactly-one-of rule.
    pub fn from_parts(
        receiver_id: Option<i64>,
        group_id: Option<i64>,
    ) -> Result<Self, EventError> {
        match (receiver_id, group_id) {
            (Some(user_id), None) => Ok(ChatTarget::Direct(user_id)),
            (None, Some(group_id)) => Ok(ChatTarget::Group(group_id)),
            _ => Err(EventError::Validation(
                "exactly one of receiver_id or group_id must be set".into(),
            )),
        }
    }

    /// The room this target fans out to.
    pub fn room(&self) -> RoomId {
        match self {
            ChatTarget::Direct(user_id) => RoomId::personal(*user_id),
            ChatTarget::Group(group_id) => RoomId::group(*group_id),
        }
    }
}

/// Represents a chat message.
///
/// Maps to the `messages` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - sender_id: BIGINT NOT NULL REFERENCES users(id)
/// - receiver_id: BIGINT NULL REFERENCES users(id)
/// - group_id: BIGINT NULL REFERENCES groups(id)
/// - content: TEXT NOT NULL
/// - message_type: message_type NOT NULL DEFAULT 'TEXT'
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
///
/// Exactly one of `receiver_id`/`group_id` is set (CHECK constraint in the
/// schema, `ChatTarget` in code). Messages are immutable after creation
/// except for hard deletion by their sender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Sending user ID
    pub sender_id: i64,

    /// Recipient user ID for direct messages
    pub receiver_id: Option<i64>,

    /// Group ID for group messages
    pub group_id: Option<i64>,

    /// Message content (text, or a media reference for IMAGE/FILE)
    pub content: String,

    /// Type of message
    #[serde(rename = "type")]
    pub message_type: MessageType,

    /// Timestamp when the message was persisted
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// The target this message was addressed to.
    pub fn target(&self) -> Result<ChatTarget, EventError> {
        ChatTarget::from_parts(self.receiver_id, self.group_id)
    }
}

/// Repository trait for Message data access operations.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Persist a new message. The id is pre-generated; the database assigns
    /// the authoritative timestamp.
    async fn create(&self, message: &Message) -> Result<Message, AppError>;

    /// Find a message by its Snowflake ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError>;

    /// Hard-delete a message.
    async fn delete(&self, id: i64) -> Result<(), AppError>;
}
