//! Gateway Event Dispatcher
//!
//! Turns each typed client event into an explicit set of outbound
//! deliveries. Handlers never write to sockets directly: they return
//! `Delivery` values that the registry applies, which keeps the full fan-out
//! of every operation observable in tests without a live transport.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use uuid::Uuid;

use super::messages::{
    AcceptCallPayload, CallIdPayload, CallRejectedPayload, CallRequestPayload, ClientEvent,
    DeleteMessagePayload, EndCallPayload, ErrorPayload, FriendPresence, GroupAck, GroupPayload,
    RejectCallPayload, ServerEvent, SignalBroadcast, SignalEnvelope, TypingBroadcast, TypingTarget,
};
use super::registry::RoomRegistry;
use crate::application::services::{
    call_service::CallService,
    chat_service::{ChatService, MessageDto, SendMessageRequest},
    presence_service::PresenceService,
};
use crate::domain::{
    ChatTarget, FriendshipRepository, GroupRepository, MessageRepository, RoomId, User,
    UserRepository,
};
use crate::infrastructure::metrics;
use crate::shared::error::{AppError, EventError};
use crate::shared::snowflake::SnowflakeGenerator;

/// Where one outbound event goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryTarget {
    /// The originating connection only.
    Caller,
    /// Every connection in a room, optionally minus the originator.
    Room { room: RoomId, exclude_caller: bool },
    /// Every live connection of one identity.
    User(i64),
}

/// One outbound event with its target.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub target: DeliveryTarget,
    pub event: ServerEvent,
}

impl Delivery {
    pub fn to_caller(event: ServerEvent) -> Self {
        Self {
            target: DeliveryTarget::Caller,
            event,
        }
    }

    pub fn to_room(room: RoomId, exclude_caller: bool, event: ServerEvent) -> Self {
        Self {
            target: DeliveryTarget::Room {
                room,
                exclude_caller,
            },
            event,
        }
    }

    pub fn to_user(user_id: i64, event: ServerEvent) -> Self {
        Self {
            target: DeliveryTarget::User(user_id),
            event,
        }
    }
}

/// Per-connection context, bound once at authentication.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub connection_id: Uuid,
    pub user: User,
}

/// Typed command dispatcher for the gateway.
pub struct EventDispatcher<U, M, G, F>
where
    U: UserRepository + 'static,
    M: MessageRepository + 'static,
    G: GroupRepository + 'static,
    F: FriendshipRepository + 'static,
{
    chat: ChatService<M, G, U>,
    presence: PresenceService<U, G, F>,
    calls: Arc<CallService<U>>,
    registry: Arc<RoomRegistry>,
    call_request_timeout: Duration,
}

impl<U, M, G, F> EventDispatcher<U, M, G, F>
where
    U: UserRepository + 'static,
    M: MessageRepository + 'static,
    G: GroupRepository + 'static,
    F: FriendshipRepository + 'static,
{
    pub fn new(
        user_repo: Arc<U>,
        message_repo: Arc<M>,
        group_repo: Arc<G>,
        friendship_repo: Arc<F>,
        registry: Arc<RoomRegistry>,
        id_generator: Arc<SnowflakeGenerator>,
        call_request_timeout: Duration,
    ) -> Self {
        Self {
            chat: ChatService::new(
                message_repo,
                Arc::clone(&group_repo),
                Arc::clone(&user_repo),
                id_generator,
            ),
            presence: PresenceService::new(
                Arc::clone(&user_repo),
                group_repo,
                friendship_repo,
            ),
            calls: Arc::new(CallService::new(user_repo)),
            registry,
            call_request_timeout,
        }
    }

    /// Wire a freshly authenticated connection: register it, mark the user
    /// online, join its personal and group rooms, and notify friends.
    pub async fn handle_connect(
        &self,
        connection_id: Uuid,
        user: &User,
        sender: mpsc::UnboundedSender<ServerEvent>,
    ) -> Result<(), AppError> {
        self.registry
            .register_connection(connection_id, user.id, sender);

        let setup = match self.presence.mark_connected(user.id).await {
            Ok(setup) => setup,
            Err(e) => {
                self.registry.unregister_connection(&connection_id);
                return Err(e);
            }
        };

        self.registry
            .join_room(connection_id, RoomId::personal(user.id));
        for group_id in setup.group_ids {
            self.registry
                .join_room(connection_id, RoomId::group(group_id));
        }

        let event = ServerEvent::FriendOnline(FriendPresence {
            user_id: user.id,
            is_online: true,
        });
        for friend_id in setup.friend_ids {
            self.registry.send_to_user(friend_id, &event);
        }

        Ok(())
    }

    /// Tear down a closed connection and notify friends the user went
    /// offline.
    pub async fn handle_disconnect(&self, connection_id: Uuid, user_id: i64) {
        self.registry.unregister_connection(&connection_id);

        let friend_ids = self.presence.mark_disconnected(user_id).await;
        let event = ServerEvent::FriendOnline(FriendPresence {
            user_id,
            is_online: false,
        });
        for friend_id in friend_ids {
            self.registry.send_to_user(friend_id, &event);
        }
    }

    /// Dispatch one client event to its handler and collect the deliveries.
    /// Failures become a single `error` delivery to the caller; nothing ever
    /// reaches a third party on a failed event.
    pub async fn dispatch(&self, ctx: &ConnectionContext, event: ClientEvent) -> Vec<Delivery> {
        metrics::inc_client_event(event.name());

        let result = match event {
            ClientEvent::SendMessage(request) => self.handle_send_message(ctx, request).await,
            ClientEvent::DeleteMessage(payload) => self.handle_delete_message(ctx, payload).await,
            ClientEvent::JoinGroup(payload) => self.handle_join_group(ctx, payload).await,
            ClientEvent::LeaveGroup(payload) => Ok(self.handle_leave_group(ctx, payload)),
            ClientEvent::TypingStart(target) => Ok(self.relay_typing(ctx, target, true)),
            ClientEvent::TypingStop(target) => Ok(self.relay_typing(ctx, target, false)),
            ClientEvent::CallRequest(payload) => self.handle_call_request(ctx, payload).await,
            ClientEvent::AcceptCall(payload) => self.handle_accept_call(ctx, payload),
            ClientEvent::RejectCall(payload) => self.handle_reject_call(ctx, payload),
            ClientEvent::EndCall(payload) => self.handle_end_call(ctx, payload),
            ClientEvent::WebrtcSignal(envelope) => self.handle_signal(ctx, envelope),
        };

        match result {
            Ok(deliveries) => deliveries,
            Err(err) => {
                tracing::debug!(
                    user_id = ctx.user.id,
                    code = err.code(),
                    error = %err,
                    "Client event failed"
                );
                vec![Delivery::to_caller(ServerEvent::Error(ErrorPayload::from(
                    &err,
                )))]
            }
        }
    }

    async fn handle_send_message(
        &self,
        ctx: &ConnectionContext,
        request: SendMessageRequest,
    ) -> Result<Vec<Delivery>, EventError> {
        let message = self.chat.send_message(ctx.user.id, request).await?;
        let target = message.target()?;
        let dto = MessageDto::from(message);

        let mut deliveries = Vec::with_capacity(2);
        match target {
            ChatTarget::Group(group_id) => {
                metrics::inc_messages_routed("group");
                deliveries.push(Delivery::to_room(
                    RoomId::group(group_id),
                    true,
                    ServerEvent::NewMessage(dto.clone()),
                ));
            }
            ChatTarget::Direct(receiver_id) => {
                metrics::inc_messages_routed("direct");
                deliveries.push(Delivery::to_user(
                    receiver_id,
                    ServerEvent::NewMessage(dto.clone()),
                ));
            }
        }
        deliveries.push(Delivery::to_caller(ServerEvent::MessageSent(dto)));
        Ok(deliveries)
    }

    async fn handle_delete_message(
        &self,
        ctx: &ConnectionContext,
        payload: DeleteMessagePayload,
    ) -> Result<Vec<Delivery>, EventError> {
        let message = self
            .chat
            .delete_message(ctx.user.id, payload.message_id)
            .await?;
        let target = message.target()?;

        let deleted = ServerEvent::MessageDeleted(super::messages::MessageDeletedPayload {
            message_id: message.id.to_string(),
            receiver_id: message.receiver_id,
            group_id: message.group_id,
        });

        let notice = match target {
            ChatTarget::Group(group_id) => {
                Delivery::to_room(RoomId::group(group_id), true, deleted.clone())
            }
            ChatTarget::Direct(receiver_id) => Delivery::to_user(receiver_id, deleted.clone()),
        };

        Ok(vec![notice, Delivery::to_caller(deleted)])
    }

    async fn handle_join_group(
        &self,
        ctx: &ConnectionContext,
        payload: GroupPayload,
    ) -> Result<Vec<Delivery>, EventError> {
        self.presence
            .authorize_join(ctx.user.id, payload.group_id)
            .await?;

        self.registry
            .join_room(ctx.connection_id, RoomId::group(payload.group_id));

        Ok(vec![Delivery::to_caller(ServerEvent::JoinedGroup(
            GroupAck {
                group_id: payload.group_id,
            },
        ))])
    }

    fn handle_leave_group(&self, ctx: &ConnectionContext, payload: GroupPayload) -> Vec<Delivery> {
        self.registry
            .leave_room(&ctx.connection_id, &RoomId::group(payload.group_id));

        vec![Delivery::to_caller(ServerEvent::LeftGroup(GroupAck {
            group_id: payload.group_id,
        }))]
    }

    /// Typing indicators are best-effort: a malformed target is dropped
    /// silently, and a broadcast into an empty room is a no-op.
    fn relay_typing(
        &self,
        ctx: &ConnectionContext,
        target: TypingTarget,
        started: bool,
    ) -> Vec<Delivery> {
        let chat_target = match ChatTarget::from_parts(target.receiver_id, target.group_id) {
            Ok(chat_target) => chat_target,
            Err(_) => return Vec::new(),
        };

        let broadcast = TypingBroadcast {
            user_id: ctx.user.id,
            receiver_id: target.receiver_id,
            group_id: target.group_id,
        };
        let event = if started {
            ServerEvent::UserTyping(broadcast)
        } else {
            ServerEvent::UserStoppedTyping(broadcast)
        };

        match chat_target {
            ChatTarget::Group(group_id) => {
                vec![Delivery::to_room(RoomId::group(group_id), true, event)]
            }
            ChatTarget::Direct(receiver_id) => vec![Delivery::to_user(receiver_id, event)],
        }
    }

    async fn handle_call_request(
        &self,
        ctx: &ConnectionContext,
        payload: CallRequestPayload,
    ) -> Result<Vec<Delivery>, EventError> {
        let incoming = self
            .calls
            .request(&ctx.user, payload.receiver_id, payload.call_type)
            .await?;
        metrics::set_call_sessions(self.calls.active_count());

        self.spawn_request_expiry(incoming.call_id);

        Ok(vec![Delivery::to_user(
            incoming.callee_id,
            ServerEvent::CallRequest(incoming.into()),
        )])
    }

    fn handle_accept_call(
        &self,
        ctx: &ConnectionContext,
        payload: AcceptCallPayload,
    ) -> Result<Vec<Delivery>, EventError> {
        let session = self.calls.accept(ctx.user.id, payload.call_id)?;

        Ok(vec![Delivery::to_user(
            session.caller_id,
            ServerEvent::CallAccepted(CallIdPayload {
                call_id: session.call_id,
            }),
        )])
    }

    fn handle_reject_call(
        &self,
        ctx: &ConnectionContext,
        payload: RejectCallPayload,
    ) -> Result<Vec<Delivery>, EventError> {
        let session = self.calls.reject(ctx.user.id, payload.call_id)?;
        metrics::set_call_sessions(self.calls.active_count());

        Ok(vec![Delivery::to_user(
            session.caller_id,
            ServerEvent::CallRejected(CallRejectedPayload {
                call_id: session.call_id,
                reason: payload.reason,
            }),
        )])
    }

    fn handle_end_call(
        &self,
        ctx: &ConnectionContext,
        payload: EndCallPayload,
    ) -> Result<Vec<Delivery>, EventError> {
        let session = self.calls.end(ctx.user.id, payload.call_id)?;
        metrics::set_call_sessions(self.calls.active_count());

        let deliveries = match session.peer_of(ctx.user.id) {
            Some(peer_id) => vec![Delivery::to_user(
                peer_id,
                ServerEvent::CallEnded(CallIdPayload {
                    call_id: session.call_id,
                }),
            )],
            None => Vec::new(),
        };
        Ok(deliveries)
    }

    fn handle_signal(
        &self,
        ctx: &ConnectionContext,
        envelope: SignalEnvelope,
    ) -> Result<Vec<Delivery>, EventError> {
        self.calls
            .authorize_signal(ctx.user.id, envelope.call_id, envelope.receiver_id)?;
        metrics::inc_signals_relayed();

        Ok(vec![Delivery::to_user(
            envelope.receiver_id,
            ServerEvent::WebrtcSignal(SignalBroadcast {
                call_id: envelope.call_id,
                sender_id: ctx.user.id,
                signal: envelope.signal,
            }),
        )])
    }

    /// Auto-end a call that is still unanswered after the configured
    /// timeout. Both parties learn the call is gone; an answered or already
    /// terminated call is untouched.
    fn spawn_request_expiry(&self, call_id: Uuid) {
        let calls = Arc::clone(&self.calls);
        let registry = Arc::clone(&self.registry);
        let timeout = self.call_request_timeout;

        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(expired) = calls.expire_if_requested(call_id) {
                metrics::set_call_sessions(calls.active_count());
                let event = ServerEvent::CallEnded(CallIdPayload { call_id });
                registry.send_to_user(expired.caller_id, &event);
                registry.send_to_user(expired.callee_id, &event);
            }
        });
    }
}
