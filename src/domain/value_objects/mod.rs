//! # Value Objects
//!
//! Immutable value types shared across the domain.

mod room;

pub use room::RoomId;
