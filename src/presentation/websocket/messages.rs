//! Gateway Message Types
//!
//! Wire format for the bidirectional event channel. Both directions use a
//! JSON envelope `{"event": <name>, "data": {...}}`; the enums below are the
//! single source of truth for the event names the original clients speak.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::services::call_service::{CallType, IncomingCall};
use crate::application::services::chat_service::{MessageDto, SendMessageRequest};
use crate::shared::error::EventError;

/// Events accepted from clients.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    SendMessage(SendMessageRequest),
    DeleteMessage(DeleteMessagePayload),
    JoinGroup(GroupPayload),
    LeaveGroup(GroupPayload),
    TypingStart(TypingTarget),
    TypingStop(TypingTarget),
    CallRequest(CallRequestPayload),
    AcceptCall(AcceptCallPayload),
    RejectCall(RejectCallPayload),
    EndCall(EndCallPayload),
    WebrtcSignal(SignalEnvelope),
}

impl ClientEvent {
    /// Wire name, used for logging and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::SendMessage(_) => "send_message",
            ClientEvent::DeleteMessage(_) => "delete_message",
            ClientEvent::JoinGroup(_) => "join_group",
            ClientEvent::LeaveGroup(_) => "leave_group",
            ClientEvent::TypingStart(_) => "typing_start",
            ClientEvent::TypingStop(_) => "typing_stop",
            ClientEvent::CallRequest(_) => "call_request",
            ClientEvent::AcceptCall(_) => "accept_call",
            ClientEvent::RejectCall(_) => "reject_call",
            ClientEvent::EndCall(_) => "end_call",
            ClientEvent::WebrtcSignal(_) => "webrtc_signal",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMessagePayload {
    pub message_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPayload {
    pub group_id: i64,
}

/// Target discriminator shared by the typing events.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingTarget {
    #[serde(default)]
    pub receiver_id: Option<i64>,
    #[serde(default)]
    pub group_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequestPayload {
    pub receiver_id: i64,
    pub call_type: CallType,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptCallPayload {
    pub call_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectCallPayload {
    pub call_id: Uuid,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndCallPayload {
    pub call_id: Uuid,
}

/// Opaque signaling envelope: session offer, session answer, or ICE
/// candidate. The server never looks inside `signal`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalEnvelope {
    pub call_id: Uuid,
    pub receiver_id: i64,
    pub signal: serde_json::Value,
}

/// Events emitted to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    NewMessage(MessageDto),
    MessageSent(MessageDto),
    MessageDeleted(MessageDeletedPayload),
    Error(ErrorPayload),
    JoinedGroup(GroupAck),
    LeftGroup(GroupAck),
    UserTyping(TypingBroadcast),
    UserStoppedTyping(TypingBroadcast),
    FriendOnline(FriendPresence),
    CallRequest(IncomingCallPayload),
    CallAccepted(CallIdPayload),
    CallRejected(CallRejectedPayload),
    CallEnded(CallIdPayload),
    WebrtcSignal(SignalBroadcast),
}

impl ServerEvent {
    /// Wire name, used for logging and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::NewMessage(_) => "new_message",
            ServerEvent::MessageSent(_) => "message_sent",
            ServerEvent::MessageDeleted(_) => "message_deleted",
            ServerEvent::Error(_) => "error",
            ServerEvent::JoinedGroup(_) => "joined_group",
            ServerEvent::LeftGroup(_) => "left_group",
            ServerEvent::UserTyping(_) => "user_typing",
            ServerEvent::UserStoppedTyping(_) => "user_stopped_typing",
            ServerEvent::FriendOnline(_) => "friend_online",
            ServerEvent::CallRequest(_) => "call_request",
            ServerEvent::CallAccepted(_) => "call_accepted",
            ServerEvent::CallRejected(_) => "call_rejected",
            ServerEvent::CallEnded(_) => "call_ended",
            ServerEvent::WebrtcSignal(_) => "webrtc_signal",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDeletedPayload {
    pub message_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub code: &'static str,
    pub message: String,
}

impl From<&EventError> for ErrorPayload {
    fn from(err: &EventError) -> Self {
        Self {
            code: err.code(),
            message: err.public_message(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupAck {
    pub group_id: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingBroadcast {
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendPresence {
    pub user_id: i64,
    pub is_online: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingCallPayload {
    pub call_id: Uuid,
    pub sender_id: i64,
    pub sender_name: String,
    pub call_type: CallType,
}

impl From<IncomingCall> for IncomingCallPayload {
    fn from(incoming: IncomingCall) -> Self {
        Self {
            call_id: incoming.call_id,
            sender_id: incoming.caller_id,
            sender_name: incoming.caller_name,
            call_type: incoming.call_type,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallIdPayload {
    pub call_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRejectedPayload {
    pub call_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalBroadcast {
    pub call_id: Uuid,
    pub sender_id: i64,
    pub signal: serde_json::Value,
}
