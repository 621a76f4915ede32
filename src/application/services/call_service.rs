//! Call Service
//!
//! Per-call state machine coordinating call request, accept/reject, signal
//! relay, and termination between exactly two identities. The server only
//! exchanges signaling metadata; the media path is negotiated directly
//! between the two clients.
//!
//! Sessions live in process memory. A session is created on request,
//! mutated at most once (Requested -> Accepted), and discarded on every
//! terminal transition; a discarded call id can never be signaled again.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{User, UserRepository};
use crate::shared::error::EventError;

/// Kind of media session being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    Audio,
    Video,
}

impl CallType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallType::Audio => "audio",
            CallType::Video => "video",
        }
    }
}

/// Lifecycle state of a live call session.
///
/// Terminal states (rejected, ended, expired) have no variant: reaching one
/// removes the session outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// Requested, waiting for the callee to answer.
    Requested,
    /// Accepted; the parties are exchanging signaling.
    Accepted,
}

/// State for one call attempt between two identities.
#[derive(Debug, Clone)]
pub struct CallSession {
    pub call_id: Uuid,
    pub caller_id: i64,
    pub callee_id: i64,
    pub call_type: CallType,
    pub state: CallState,
}

impl CallSession {
    pub fn is_participant(&self, user_id: i64) -> bool {
        self.caller_id == user_id || self.callee_id == user_id
    }

    /// The other party of the call, if `user_id` is a participant.
    pub fn peer_of(&self, user_id: i64) -> Option<i64> {
        if user_id == self.caller_id {
            Some(self.callee_id)
        } else if user_id == self.callee_id {
            Some(self.caller_id)
        } else {
            None
        }
    }
}

/// Data delivered to the callee for an incoming call.
#[derive(Debug, Clone)]
pub struct IncomingCall {
    pub call_id: Uuid,
    pub callee_id: i64,
    pub caller_id: i64,
    pub caller_name: String,
    pub call_type: CallType,
}

/// Call negotiator and signaling gatekeeper.
pub struct CallService<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
    sessions: DashMap<Uuid, CallSession>,
}

impl<U> CallService<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>) -> Self {
        Self {
            user_repo,
            sessions: DashMap::new(),
        }
    }

    /// Open a new call session in the Requested state.
    ///
    /// A user participates in at most one live session; a request naming a
    /// busy caller or callee is rejected so the relay never has to
    /// disambiguate two sessions addressing the same identity.
    pub async fn request(
        &self,
        caller: &User,
        callee_id: i64,
        call_type: CallType,
    ) -> Result<IncomingCall, EventError> {
        if callee_id == caller.id {
            return Err(EventError::Validation("cannot call yourself".into()));
        }

        self.user_repo
            .find_by_id(callee_id)
            .await?
            .ok_or_else(|| EventError::NotFound(format!("user {} not found", callee_id)))?;

        if self.is_busy(caller.id) {
            return Err(EventError::Validation("you are already in a call".into()));
        }
        if self.is_busy(callee_id) {
            return Err(EventError::Validation("user is already in a call".into()));
        }

        let session = CallSession {
            call_id: Uuid::new_v4(),
            caller_id: caller.id,
            callee_id,
            call_type,
            state: CallState::Requested,
        };
        let call_id = session.call_id;
        self.sessions.insert(call_id, session);

        tracing::info!(
            call_id = %call_id,
            caller_id = caller.id,
            callee_id,
            call_type = call_type.as_str(),
            "Call requested"
        );

        Ok(IncomingCall {
            call_id,
            callee_id,
            caller_id: caller.id,
            caller_name: caller.visible_name().to_string(),
            call_type,
        })
    }

    /// Callee answers: Requested -> Accepted. Returns the accepted session
    /// so the caller can be notified.
    pub fn accept(&self, user_id: i64, call_id: Uuid) -> Result<CallSession, EventError> {
        let mut entry = self
            .sessions
            .get_mut(&call_id)
            .ok_or_else(|| unknown_call(call_id))?;

        if entry.callee_id != user_id {
            return Err(EventError::Authorization(
                "only the callee may answer a call".into(),
            ));
        }
        if entry.state != CallState::Requested {
            return Err(EventError::Validation(
                "call is not awaiting an answer".into(),
            ));
        }

        entry.state = CallState::Accepted;
        tracing::info!(call_id = %call_id, "Call accepted");
        Ok(entry.clone())
    }

    /// Callee declines a pending call. Terminal: the session is discarded.
    pub fn reject(&self, user_id: i64, call_id: Uuid) -> Result<CallSession, EventError> {
        {
            let entry = self
                .sessions
                .get(&call_id)
                .ok_or_else(|| unknown_call(call_id))?;

            if entry.callee_id != user_id {
                return Err(EventError::Authorization(
                    "only the callee may reject a call".into(),
                ));
            }
            if entry.state != CallState::Requested {
                return Err(EventError::Validation(
                    "call is not awaiting an answer".into(),
                ));
            }
        }

        let (_, session) = self
            .sessions
            .remove(&call_id)
            .ok_or_else(|| unknown_call(call_id))?;
        tracing::info!(call_id = %call_id, "Call rejected");
        Ok(session)
    }

    /// Either participant hangs up, from Requested or Accepted. Terminal.
    pub fn end(&self, user_id: i64, call_id: Uuid) -> Result<CallSession, EventError> {
        {
            let entry = self
                .sessions
                .get(&call_id)
                .ok_or_else(|| unknown_call(call_id))?;

            if !entry.is_participant(user_id) {
                return Err(EventError::Authorization(
                    "not a participant of this call".into(),
                ));
            }
        }

        let (_, session) = self
            .sessions
            .remove(&call_id)
            .ok_or_else(|| unknown_call(call_id))?;
        tracing::info!(call_id = %call_id, ended_by = user_id, "Call ended");
        Ok(session)
    }

    /// Gate a signaling envelope: the call must be live, and sender and
    /// addressed receiver must be its two participants. The signal content
    /// itself is opaque and never inspected.
    pub fn authorize_signal(
        &self,
        sender_id: i64,
        call_id: Uuid,
        receiver_id: i64,
    ) -> Result<(), EventError> {
        let entry = self
            .sessions
            .get(&call_id)
            .ok_or_else(|| unknown_call(call_id))?;

        if !entry.is_participant(sender_id) || entry.peer_of(sender_id) != Some(receiver_id) {
            return Err(EventError::Authorization(
                "not a participant of this call".into(),
            ));
        }
        Ok(())
    }

    /// Discard a session that is still waiting for an answer. Used by the
    /// request-timeout task; a call that was accepted, rejected, or ended in
    /// the meantime is left alone.
    pub fn expire_if_requested(&self, call_id: Uuid) -> Option<CallSession> {
        self.sessions
            .remove_if(&call_id, |_, session| session.state == CallState::Requested)
            .map(|(_, session)| {
                tracing::info!(call_id = %call_id, "Call request expired unanswered");
                session
            })
    }

    /// Number of live call sessions.
    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    fn is_busy(&self, user_id: i64) -> bool {
        self.sessions
            .iter()
            .any(|entry| entry.is_participant(user_id))
    }
}

fn unknown_call(call_id: Uuid) -> EventError {
    EventError::NotFound(format!("call {} not found", call_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use mockall::mock;

    use crate::shared::error::AppError;

    mock! {
        Users {}

        #[async_trait]
        impl UserRepository for Users {
            async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;
            async fn set_online_status(
                &self,
                id: i64,
                is_online: bool,
                last_seen: DateTime<Utc>,
            ) -> Result<(), AppError>;
        }
    }

    fn test_user(id: i64) -> User {
        User {
            id,
            username: format!("user{}", id),
            display_name: None,
            avatar_url: None,
            is_online: true,
            last_seen: None,
            created_at: Utc::now(),
        }
    }

    fn service_with_users() -> CallService<MockUsers> {
        let mut users = MockUsers::new();
        users
            .expect_find_by_id()
            .returning(|id| Ok(Some(test_user(id))));
        CallService::new(Arc::new(users))
    }

    #[tokio::test]
    async fn test_request_and_accept() {
        let svc = service_with_users();
        let caller = test_user(1);

        let incoming = svc.request(&caller, 2, CallType::Audio).await.unwrap();
        assert_eq!(incoming.caller_id, 1);
        assert_eq!(incoming.callee_id, 2);
        assert_eq!(incoming.caller_name, "user1");

        let accepted = svc.accept(2, incoming.call_id).unwrap();
        assert_eq!(accepted.state, CallState::Accepted);
        assert_eq!(accepted.caller_id, 1);
        assert_eq!(svc.active_count(), 1);
    }

    #[tokio::test]
    async fn test_caller_cannot_accept_own_call() {
        let svc = service_with_users();
        let incoming = svc
            .request(&test_user(1), 2, CallType::Video)
            .await
            .unwrap();

        let err = svc.accept(1, incoming.call_id).unwrap_err();
        assert!(matches!(err, EventError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_reject_is_terminal() {
        let svc = service_with_users();
        let incoming = svc
            .request(&test_user(1), 2, CallType::Audio)
            .await
            .unwrap();

        let rejected = svc.reject(2, incoming.call_id).unwrap();
        assert_eq!(rejected.caller_id, 1);
        assert_eq!(svc.active_count(), 0);

        // Every further reference to the id is refused.
        assert!(svc.accept(2, incoming.call_id).is_err());
        assert!(svc.end(1, incoming.call_id).is_err());
        assert!(svc.authorize_signal(1, incoming.call_id, 2).is_err());
    }

    #[tokio::test]
    async fn test_end_from_either_party() {
        let svc = service_with_users();
        let incoming = svc
            .request(&test_user(1), 2, CallType::Audio)
            .await
            .unwrap();
        svc.accept(2, incoming.call_id).unwrap();

        let ended = svc.end(1, incoming.call_id).unwrap();
        assert_eq!(ended.peer_of(1), Some(2));
        assert_eq!(svc.active_count(), 0);
    }

    #[tokio::test]
    async fn test_non_participant_cannot_end() {
        let svc = service_with_users();
        let incoming = svc
            .request(&test_user(1), 2, CallType::Audio)
            .await
            .unwrap();

        let err = svc.end(3, incoming.call_id).unwrap_err();
        assert!(matches!(err, EventError::Authorization(_)));
        assert_eq!(svc.active_count(), 1);
    }

    #[tokio::test]
    async fn test_busy_party_rejects_second_request() {
        let svc = service_with_users();
        svc.request(&test_user(1), 2, CallType::Audio).await.unwrap();

        let err = svc
            .request(&test_user(3), 2, CallType::Audio)
            .await
            .unwrap_err();
        assert!(matches!(err, EventError::Validation(_)));

        let err = svc
            .request(&test_user(1), 3, CallType::Audio)
            .await
            .unwrap_err();
        assert!(matches!(err, EventError::Validation(_)));
    }

    #[tokio::test]
    async fn test_cannot_call_yourself() {
        let svc = service_with_users();
        let err = svc
            .request(&test_user(1), 1, CallType::Audio)
            .await
            .unwrap_err();
        assert!(matches!(err, EventError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_callee() {
        let mut users = MockUsers::new();
        users.expect_find_by_id().returning(|_| Ok(None));
        let svc = CallService::new(Arc::new(users));

        let err = svc
            .request(&test_user(1), 2, CallType::Audio)
            .await
            .unwrap_err();
        assert!(matches!(err, EventError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_signal_gating() {
        let svc = service_with_users();
        let incoming = svc
            .request(&test_user(1), 2, CallType::Audio)
            .await
            .unwrap();

        assert!(svc.authorize_signal(1, incoming.call_id, 2).is_ok());
        assert!(svc.authorize_signal(2, incoming.call_id, 1).is_ok());
        // A third party is never relayed, in either position.
        assert!(svc.authorize_signal(3, incoming.call_id, 2).is_err());
        assert!(svc.authorize_signal(1, incoming.call_id, 3).is_err());
        // Unknown call ids are refused outright.
        assert!(svc.authorize_signal(1, Uuid::new_v4(), 2).is_err());
    }

    #[tokio::test]
    async fn test_expire_only_while_requested() {
        let svc = service_with_users();
        let incoming = svc
            .request(&test_user(1), 2, CallType::Audio)
            .await
            .unwrap();

        svc.accept(2, incoming.call_id).unwrap();
        assert!(svc.expire_if_requested(incoming.call_id).is_none());
        assert_eq!(svc.active_count(), 1);

        let ended = svc.end(2, incoming.call_id).unwrap();
        assert_eq!(ended.state, CallState::Accepted);

        // A fresh request does expire.
        let incoming = svc
            .request(&test_user(1), 2, CallType::Audio)
            .await
            .unwrap();
        let expired = svc.expire_if_requested(incoming.call_id).unwrap();
        assert_eq!(expired.state, CallState::Requested);
        assert_eq!(svc.active_count(), 0);
    }
}
