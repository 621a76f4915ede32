//! # Domain Entities
//!
//! Core domain entities for the real-time messaging and call-signaling
//! server. All entities map directly to their corresponding database tables.
//!
//! ## Entities
//!
//! - **User**: An authenticated identity with presence state
//! - **Message**: A chat message addressed to a direct partner or a group
//! - **Group**: Chat-group membership (read-only lookup)
//! - **Friendship**: Symmetric friend relation (read-only lookup)
//!
//! ## Repository Traits
//!
//! Each entity has an associated repository trait defining data access
//! operations. These traits are implemented in the infrastructure layer,
//! following the dependency inversion principle; the core never caches
//! repository state beyond the lifetime of one event.

mod friendship;
mod group;
mod message;
mod user;

pub use user::{User, UserRepository};

pub use message::{ChatTarget, Message, MessageRepository, MessageType};

pub use group::GroupRepository;

pub use friendship::FriendshipRepository;
