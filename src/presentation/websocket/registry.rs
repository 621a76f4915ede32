//! Room Registry
//!
//! Process-wide table of live connections and their room memberships,
//! constructed once at startup and passed by reference to everything that
//! fans out events. Membership is connection-scoped: two connections of the
//! same user join and leave rooms independently, and all of a connection's
//! memberships vanish with it.

use std::collections::HashSet;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::dispatcher::{Delivery, DeliveryTarget};
use super::messages::ServerEvent;
use crate::domain::RoomId;

/// A live connection: its identity and the channel draining into its socket.
struct ConnectionHandle {
    user_id: i64,
    sender: mpsc::UnboundedSender<ServerEvent>,
    /// Rooms this connection has joined, tracked for O(joined) cleanup.
    rooms: Mutex<HashSet<RoomId>>,
}

/// Registry of rooms and connections.
pub struct RoomRegistry {
    connections: DashMap<Uuid, ConnectionHandle>,
    rooms: DashMap<RoomId, HashSet<Uuid>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            rooms: DashMap::new(),
        }
    }

    /// Register an authenticated connection. Rooms are joined separately.
    pub fn register_connection(
        &self,
        connection_id: Uuid,
        user_id: i64,
        sender: mpsc::UnboundedSender<ServerEvent>,
    ) {
        self.connections.insert(
            connection_id,
            ConnectionHandle {
                user_id,
                sender,
                rooms: Mutex::new(HashSet::new()),
            },
        );
        tracing::debug!(user_id, connection_id = %connection_id, "Connection registered");
    }

    /// Drop a connection and every room membership it holds.
    pub fn unregister_connection(&self, connection_id: &Uuid) {
        if let Some((_, handle)) = self.connections.remove(connection_id) {
            let rooms = handle.rooms.into_inner();
            for room in rooms {
                self.remove_member(&room, connection_id);
            }
            tracing::debug!(
                user_id = handle.user_id,
                connection_id = %connection_id,
                "Connection unregistered"
            );
        }
    }

    /// Join a connection to a room. Unknown connections are ignored.
    pub fn join_room(&self, connection_id: Uuid, room: RoomId) {
        if let Some(handle) = self.connections.get(&connection_id) {
            handle.rooms.lock().insert(room);
            self.rooms.entry(room).or_default().insert(connection_id);
        }
    }

    /// Remove a connection from a room.
    pub fn leave_room(&self, connection_id: &Uuid, room: &RoomId) {
        if let Some(handle) = self.connections.get(connection_id) {
            handle.rooms.lock().remove(room);
        }
        self.remove_member(room, connection_id);
    }

    /// Deliver an event to every connection currently in the room.
    ///
    /// Only the members joined at emit time receive it: no buffering for
    /// late joiners, and a connection that already left is silently skipped.
    pub fn broadcast_to_room(&self, room: &RoomId, event: &ServerEvent, exclude: Option<Uuid>) {
        let members: Vec<Uuid> = match self.rooms.get(room) {
            Some(members) => members.iter().copied().collect(),
            None => return,
        };

        for connection_id in members {
            if Some(connection_id) == exclude {
                continue;
            }
            if let Some(handle) = self.connections.get(&connection_id) {
                let _ = handle.sender.send(event.clone());
            }
        }
    }

    /// Deliver an event to every live connection of one identity.
    pub fn send_to_user(&self, user_id: i64, event: &ServerEvent) {
        self.broadcast_to_room(&RoomId::personal(user_id), event, None);
    }

    /// Deliver an event to one specific connection.
    pub fn send_to_connection(&self, connection_id: &Uuid, event: &ServerEvent) -> bool {
        match self.connections.get(connection_id) {
            Some(handle) => handle.sender.send(event.clone()).is_ok(),
            None => false,
        }
    }

    /// Apply a dispatcher's explicit delivery set, resolving caller-relative
    /// targets against the originating connection.
    pub fn apply(&self, origin: Uuid, deliveries: Vec<Delivery>) {
        for delivery in deliveries {
            match delivery.target {
                DeliveryTarget::Caller => {
                    self.send_to_connection(&origin, &delivery.event);
                }
                DeliveryTarget::Room {
                    room,
                    exclude_caller,
                } => {
                    let exclude = exclude_caller.then_some(origin);
                    self.broadcast_to_room(&room, &delivery.event, exclude);
                }
                DeliveryTarget::User(user_id) => {
                    self.send_to_user(user_id, &delivery.event);
                }
            }
        }
    }

    /// Whether the identity has at least one live connection in its
    /// personal room.
    pub fn is_user_online(&self, user_id: i64) -> bool {
        self.rooms
            .get(&RoomId::personal(user_id))
            .map(|members| !members.is_empty())
            .unwrap_or(false)
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn remove_member(&self, room: &RoomId, connection_id: &Uuid) {
        if let Some(mut members) = self.rooms.get_mut(room) {
            members.remove(connection_id);
        }
        self.rooms.remove_if(room, |_, members| members.is_empty());
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::websocket::messages::{FriendPresence, GroupAck};

    fn attach(registry: &RoomRegistry, user_id: i64) -> (Uuid, mpsc::UnboundedReceiver<ServerEvent>) {
        let connection_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.register_connection(connection_id, user_id, tx);
        registry.join_room(connection_id, RoomId::personal(user_id));
        (connection_id, rx)
    }

    fn ack(group_id: i64) -> ServerEvent {
        ServerEvent::JoinedGroup(GroupAck { group_id })
    }

    #[test]
    fn test_broadcast_reaches_room_members_only() {
        let registry = RoomRegistry::new();
        let (a, mut rx_a) = attach(&registry, 1);
        let (_b, mut rx_b) = attach(&registry, 2);

        registry.join_room(a, RoomId::group(10));
        registry.broadcast_to_room(&RoomId::group(10), &ack(10), None);

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn test_broadcast_excludes_sender() {
        let registry = RoomRegistry::new();
        let (a, mut rx_a) = attach(&registry, 1);
        let (b, mut rx_b) = attach(&registry, 2);

        registry.join_room(a, RoomId::group(10));
        registry.join_room(b, RoomId::group(10));
        registry.broadcast_to_room(&RoomId::group(10), &ack(10), Some(a));

        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn test_send_to_user_reaches_all_connections() {
        let registry = RoomRegistry::new();
        let (_c1, mut rx1) = attach(&registry, 1);
        let (_c2, mut rx2) = attach(&registry, 1);

        let event = ServerEvent::FriendOnline(FriendPresence {
            user_id: 2,
            is_online: true,
        });
        registry.send_to_user(1, &event);

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn test_unregister_drops_all_memberships() {
        let registry = RoomRegistry::new();
        let (a, mut rx_a) = attach(&registry, 1);
        registry.join_room(a, RoomId::group(10));

        registry.unregister_connection(&a);
        assert!(!registry.is_user_online(1));
        assert_eq!(registry.connection_count(), 0);

        registry.broadcast_to_room(&RoomId::group(10), &ack(10), None);
        assert!(rx_a.try_recv().is_err());
    }

    #[test]
    fn test_leave_room_stops_delivery() {
        let registry = RoomRegistry::new();
        let (a, mut rx_a) = attach(&registry, 1);
        registry.join_room(a, RoomId::group(10));
        registry.leave_room(&a, &RoomId::group(10));

        registry.broadcast_to_room(&RoomId::group(10), &ack(10), None);
        assert!(rx_a.try_recv().is_err());
    }
}
