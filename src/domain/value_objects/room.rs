//! Room identifiers.
//!
//! A room is a named broadcast group of connections. Room names follow a
//! fixed convention: `user_<id>` for a user's personal room and
//! `group_<id>` for a chat group's room. The constructors below are the only
//! place that convention lives.

use std::fmt;

/// Typed room identifier.
///
/// A personal room exists per identity and delivers to every live connection
/// of that identity; a group room exists per chat group. Membership is
/// connection-scoped, so two connections of the same user join rooms
/// independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomId {
    /// Per-identity room, used for direct delivery.
    Personal(i64),
    /// Per-group room, used for group broadcasts.
    Group(i64),
}

impl RoomId {
    /// Room for direct delivery to one identity.
    pub fn personal(user_id: i64) -> Self {
        RoomId::Personal(user_id)
    }

    /// Room for a chat group.
    pub fn group(group_id: i64) -> Self {
        RoomId::Group(group_id)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomId::Personal(id) => write!(f, "user_{}", id),
            RoomId::Group(id) => write!(f, "group_{}", id),
        }
    }
}
