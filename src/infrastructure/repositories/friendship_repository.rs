//! Friendship Repository Implementation
//!
//! PostgreSQL implementation of friend-set lookups. The `friends` table
//! stores one row per symmetric relation, so a user may appear on either
//! side.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::FriendshipRepository;
use crate::shared::error::AppError;

/// PostgreSQL friendship repository implementation.
pub struct PgFriendshipRepository {
    pool: PgPool,
}

impl PgFriendshipRepository {
    /// Creates a new PgFriendshipRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FriendshipRepository for PgFriendshipRepository {
    async fn list_friend_ids(&self, user_id: i64) -> Result<Vec<i64>, AppError> {
        let friend_ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT CASE WHEN user1_id = $1 THEN user2_id ELSE user1_id END
            FROM friends
            WHERE user1_id = $1 OR user2_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(friend_ids)
    }
}
