//! Common Test Utilities
//!
//! In-memory repository fakes and a gateway harness that drives the
//! dispatcher directly, capturing every delivery through per-connection
//! channels instead of live sockets.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use parley::domain::{
    FriendshipRepository, GroupRepository, Message, MessageRepository, User, UserRepository,
};
use parley::presentation::websocket::{
    ClientEvent, ConnectionContext, EventDispatcher, RoomRegistry, ServerEvent,
};
use parley::shared::error::AppError;
use parley::shared::snowflake::SnowflakeGenerator;

/// In-memory user store.
#[derive(Default)]
pub struct InMemoryUsers {
    users: Mutex<HashMap<i64, User>>,
}

impl InMemoryUsers {
    pub fn insert(&self, user: User) {
        self.users.lock().insert(user.id, user);
    }

    pub fn get(&self, id: i64) -> User {
        self.users.lock().get(&id).cloned().expect("unknown test user")
    }

    pub fn is_online(&self, id: i64) -> bool {
        self.users.lock().get(&id).map(|u| u.is_online).unwrap_or(false)
    }
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.users.lock().get(&id).cloned())
    }

    async fn set_online_status(
        &self,
        id: i64,
        is_online: bool,
        last_seen: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut users = self.users.lock();
        let user = users
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;
        user.is_online = is_online;
        user.last_seen = Some(last_seen);
        Ok(())
    }
}

/// In-memory message store.
#[derive(Default)]
pub struct InMemoryMessages {
    messages: Mutex<HashMap<i64, Message>>,
}

impl InMemoryMessages {
    pub fn count(&self) -> usize {
        self.messages.lock().len()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessages {
    async fn create(&self, message: &Message) -> Result<Message, AppError> {
        self.messages.lock().insert(message.id, message.clone());
        Ok(message.clone())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError> {
        Ok(self.messages.lock().get(&id).cloned())
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        self.messages
            .lock()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Message {} not found", id)))
    }
}

/// In-memory group membership store.
#[derive(Default)]
pub struct InMemoryGroups {
    members: Mutex<HashSet<(i64, i64)>>,
}

impl InMemoryGroups {
    pub fn add_member(&self, user_id: i64, group_id: i64) {
        self.members.lock().insert((user_id, group_id));
    }
}

#[async_trait]
impl GroupRepository for InMemoryGroups {
    async fn is_member(&self, user_id: i64, group_id: i64) -> Result<bool, AppError> {
        Ok(self.members.lock().contains(&(user_id, group_id)))
    }

    async fn list_group_ids_for_user(&self, user_id: i64) -> Result<Vec<i64>, AppError> {
        Ok(self
            .members
            .lock()
            .iter()
            .filter(|(uid, _)| *uid == user_id)
            .map(|(_, gid)| *gid)
            .collect())
    }
}

/// In-memory friendship store (symmetric).
#[derive(Default)]
pub struct InMemoryFriendships {
    friends: Mutex<HashMap<i64, Vec<i64>>>,
}

impl InMemoryFriendships {
    pub fn befriend(&self, a: i64, b: i64) {
        let mut friends = self.friends.lock();
        friends.entry(a).or_default().push(b);
        friends.entry(b).or_default().push(a);
    }
}

#[async_trait]
impl FriendshipRepository for InMemoryFriendships {
    async fn list_friend_ids(&self, user_id: i64) -> Result<Vec<i64>, AppError> {
        Ok(self.friends.lock().get(&user_id).cloned().unwrap_or_default())
    }
}

pub type TestDispatcher =
    EventDispatcher<InMemoryUsers, InMemoryMessages, InMemoryGroups, InMemoryFriendships>;

/// Gateway harness over in-memory stores.
pub struct TestApp {
    pub users: Arc<InMemoryUsers>,
    pub messages: Arc<InMemoryMessages>,
    pub groups: Arc<InMemoryGroups>,
    pub friendships: Arc<InMemoryFriendships>,
    pub registry: Arc<RoomRegistry>,
    pub dispatcher: TestDispatcher,
}

/// One simulated client connection with its captured event stream.
pub struct TestConnection {
    pub ctx: ConnectionContext,
    pub rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl TestConnection {
    /// Collect everything delivered so far.
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_call_timeout(Duration::from_secs(60))
    }

    pub fn with_call_timeout(call_request_timeout: Duration) -> Self {
        let users = Arc::new(InMemoryUsers::default());
        let messages = Arc::new(InMemoryMessages::default());
        let groups = Arc::new(InMemoryGroups::default());
        let friendships = Arc::new(InMemoryFriendships::default());
        let registry = Arc::new(RoomRegistry::new());

        let dispatcher = EventDispatcher::new(
            Arc::clone(&users),
            Arc::clone(&messages),
            Arc::clone(&groups),
            Arc::clone(&friendships),
            Arc::clone(&registry),
            Arc::new(SnowflakeGenerator::new(1)),
            call_request_timeout,
        );

        Self {
            users,
            messages,
            groups,
            friendships,
            registry,
            dispatcher,
        }
    }

    /// Seed a user account.
    pub fn seed_user(&self, id: i64, username: &str) {
        self.users.insert(User {
            id,
            username: username.into(),
            display_name: None,
            avatar_url: None,
            is_online: false,
            last_seen: None,
            created_at: Utc::now(),
        });
    }

    /// Open an authenticated connection for a seeded user.
    pub async fn connect(&self, user_id: i64) -> TestConnection {
        let user = self.users.get(user_id);
        let connection_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        self.dispatcher
            .handle_connect(connection_id, &user, tx)
            .await
            .expect("connection setup failed");

        TestConnection {
            ctx: ConnectionContext {
                connection_id,
                user,
            },
            rx,
        }
    }

    /// Dispatch one client event from a connection and apply its fan-out.
    pub async fn send(&self, conn: &TestConnection, event: ClientEvent) {
        let deliveries = self.dispatcher.dispatch(&conn.ctx, event).await;
        self.registry.apply(conn.ctx.connection_id, deliveries);
    }

    /// Close a connection.
    pub async fn disconnect(&self, conn: &TestConnection) {
        self.dispatcher
            .handle_disconnect(conn.ctx.connection_id, conn.ctx.user.id)
            .await;
    }
}

/// Parse a client event from its wire form.
pub fn client_event(json: &str) -> ClientEvent {
    serde_json::from_str(json).expect("invalid client event json")
}
