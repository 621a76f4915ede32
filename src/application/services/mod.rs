//! Application Services
//!
//! Business logic services consumed by the gateway dispatcher.

pub mod call_service;
pub mod chat_service;
pub mod presence_service;

pub use call_service::{CallService, CallSession, CallState, CallType, IncomingCall};
pub use chat_service::{ChatService, MessageDto, SendMessageRequest};
pub use presence_service::{ConnectionSetup, PresenceService};
