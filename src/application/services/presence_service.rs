//! Presence Service
//!
//! Handles the persistence side of connection open and close: online-status
//! transitions, group-room enumeration, and the friend sets used for
//! presence fan-out.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{FriendshipRepository, GroupRepository, UserRepository};
use crate::shared::error::{AppError, EventError};

/// Everything the gateway needs to wire a freshly authenticated connection.
#[derive(Debug, Default)]
pub struct ConnectionSetup {
    /// Groups whose rooms the connection joins.
    pub group_ids: Vec<i64>,
    /// Friends to notify that the user came online.
    pub friend_ids: Vec<i64>,
}

/// Presence service implementation.
pub struct PresenceService<U, G, F>
where
    U: UserRepository,
    G: GroupRepository,
    F: FriendshipRepository,
{
    user_repo: Arc<U>,
    group_repo: Arc<G>,
    friendship_repo: Arc<F>,
}

impl<U, G, F> PresenceService<U, G, F>
where
    U: UserRepository,
    G: GroupRepository,
    F: FriendshipRepository,
{
    pub fn new(user_repo: Arc<U>, group_repo: Arc<G>, friendship_repo: Arc<F>) -> Self {
        Self {
            user_repo,
            group_repo,
            friendship_repo,
        }
    }

    /// Record the connection open: mark the user online and collect room and
    /// fan-out sets. A failed presence write or group lookup fails the
    /// connection; the friend lookup is best-effort.
    pub async fn mark_connected(&self, user_id: i64) -> Result<ConnectionSetup, AppError> {
        self.user_repo
            .set_online_status(user_id, true, Utc::now())
            .await?;

        let group_ids = self.group_repo.list_group_ids_for_user(user_id).await?;
        let friend_ids = self.friend_ids_best_effort(user_id).await;

        Ok(ConnectionSetup {
            group_ids,
            friend_ids,
        })
    }

    /// Record the connection close: mark the user offline and return the
    /// friends to notify. Entirely best-effort; the connection is already
    /// gone, so there is nobody to report a failure to.
    pub async fn mark_disconnected(&self, user_id: i64) -> Vec<i64> {
        if let Err(e) = self
            .user_repo
            .set_online_status(user_id, false, Utc::now())
            .await
        {
            tracing::error!(user_id, error = %e, "Failed to mark user offline");
        }

        self.friend_ids_best_effort(user_id).await
    }

    /// Membership gate for explicit group-room joins.
    pub async fn authorize_join(&self, user_id: i64, group_id: i64) -> Result<(), EventError> {
        let is_member = self.group_repo.is_member(user_id, group_id).await?;
        if !is_member {
            return Err(EventError::Authorization(
                "not a member of this group".into(),
            ));
        }
        Ok(())
    }

    async fn friend_ids_best_effort(&self, user_id: i64) -> Vec<i64> {
        match self.friendship_repo.list_friend_ids(user_id).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Friend lookup failed, skipping presence fan-out");
                Vec::new()
            }
        }
    }
}
