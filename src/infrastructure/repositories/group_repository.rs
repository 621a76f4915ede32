//! Group Repository Implementation
//!
//! PostgreSQL implementation of chat-group membership lookups.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::GroupRepository;
use crate::shared::error::AppError;

/// PostgreSQL group repository implementation.
pub struct PgGroupRepository {
    pool: PgPool,
}

impl PgGroupRepository {
    /// Creates a new PgGroupRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupRepository for PgGroupRepository {
    async fn is_member(&self, user_id: i64, group_id: i64) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM group_members WHERE user_id = $1 AND group_id = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(group_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn list_group_ids_for_user(&self, user_id: i64) -> Result<Vec<i64>, AppError> {
        let group_ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT group_id FROM group_members WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(group_ids)
    }
}
