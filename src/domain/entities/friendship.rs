//! Friendship repository trait.
//!
//! The friend relation is symmetric and owned by the CRUD service; the core
//! reads it only to compute presence fan-out sets.

use async_trait::async_trait;

use crate::shared::error::AppError;

/// Repository trait for friendship lookups.
#[async_trait]
pub trait FriendshipRepository: Send + Sync {
    /// Ids of every friend of the given user.
    async fn list_friend_ids(&self, user_id: i64) -> Result<Vec<i64>, AppError>;
}
