//! WebSocket Gateway
//!
//! Real-time communication via WebSocket connections: authentication,
//! room registry, typed event dispatch, and the connection handler.

pub mod auth;
pub mod dispatcher;
pub mod handler;
pub mod messages;
pub mod registry;

pub use auth::{authenticate, AuthError};
pub use dispatcher::{ConnectionContext, Delivery, DeliveryTarget, EventDispatcher};
pub use handler::ws_handler;
pub use messages::{ClientEvent, ServerEvent};
pub use registry::RoomRegistry;
