//! Repository Implementations
//!
//! PostgreSQL implementations of the domain repository traits.

mod friendship_repository;
mod group_repository;
mod message_repository;
mod user_repository;

pub use friendship_repository::PgFriendshipRepository;
pub use group_repository::PgGroupRepository;
pub use message_repository::PgMessageRepository;
pub use user_repository::PgUserRepository;
