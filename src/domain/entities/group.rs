//! Group membership repository trait.
//!
//! Group management (creation, invitations, membership changes) belongs to
//! the CRUD service; this server only asks membership questions when routing
//! messages and joining rooms.

use async_trait::async_trait;

use crate::shared::error::AppError;

/// Repository trait for chat-group membership lookups.
#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Whether the user is currently a member of the group.
    async fn is_member(&self, user_id: i64, group_id: i64) -> Result<bool, AppError>;

    /// All group ids the user currently belongs to, used to join group rooms
    /// on connection open.
    async fn list_group_ids_for_user(&self, user_id: i64) -> Result<Vec<i64>, AppError>;
}
