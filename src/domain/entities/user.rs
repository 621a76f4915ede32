//! User entity and repository trait.
//!
//! Maps to the `users` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Represents an authenticated identity.
///
/// Maps to the `users` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - username: VARCHAR(32) NOT NULL UNIQUE
/// - display_name: VARCHAR(64) NULL
/// - avatar_url: TEXT NULL
/// - is_online: BOOLEAN NOT NULL DEFAULT FALSE
/// - last_seen: TIMESTAMPTZ NULL
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
///
/// Account management (registration, profile editing, credentials) lives in
/// a separate service; this server only reads users and flips their presence
/// state. The online flag and last-seen mutate exactly on connection open
/// and connection close.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Username (unique)
    pub username: String,

    /// Optional display name shown in clients
    pub display_name: Option<String>,

    /// Optional avatar URL
    pub avatar_url: Option<String>,

    /// Whether the user currently has a live connection
    pub is_online: bool,

    /// Timestamp of the last connection open or close
    pub last_seen: Option<DateTime<Utc>>,

    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Name presented to other users (display name, falling back to
    /// username).
    pub fn visible_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

/// Repository trait for User data access operations.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by its Snowflake ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    /// Record a presence transition.
    async fn set_online_status(
        &self,
        id: i64,
        is_online: bool,
        last_seen: DateTime<Utc>,
    ) -> Result<(), AppError>;
}
