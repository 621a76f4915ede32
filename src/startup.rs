//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::config::Settings;
use crate::infrastructure::repositories::{
    PgFriendshipRepository, PgGroupRepository, PgMessageRepository, PgUserRepository,
};
use crate::infrastructure::{cache, database};
use crate::presentation::http::routes;
use crate::presentation::middleware::{cors, logging};
use crate::presentation::websocket::{EventDispatcher, RoomRegistry};
use crate::shared::snowflake::SnowflakeGenerator;

/// The dispatcher wired to the PostgreSQL repositories.
pub type AppDispatcher = EventDispatcher<
    PgUserRepository,
    PgMessageRepository,
    PgGroupRepository,
    PgFriendshipRepository,
>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub redis: ConnectionManager,
    pub registry: Arc<RoomRegistry>,
    pub dispatcher: Arc<AppDispatcher>,
    pub settings: Arc<Settings>,
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        // Create database pool
        let db = database::create_pool(&settings.database).await?;
        tracing::info!("Database connection pool created");

        database::run_migrations(&db).await?;
        tracing::info!("Database migrations applied");

        // Create Redis client
        let redis = cache::create_redis_client(&settings.redis).await?;
        tracing::info!("Redis connection established");

        // Create snowflake generator for message ids
        let snowflake = Arc::new(SnowflakeGenerator::new(settings.snowflake.machine_id as u64));

        // Create the room registry and wire the dispatcher to it
        let registry = Arc::new(RoomRegistry::new());
        let dispatcher = Arc::new(EventDispatcher::new(
            Arc::new(PgUserRepository::new(db.clone())),
            Arc::new(PgMessageRepository::new(db.clone())),
            Arc::new(PgGroupRepository::new(db.clone())),
            Arc::new(PgFriendshipRepository::new(db.clone())),
            Arc::clone(&registry),
            snowflake,
            Duration::from_secs(settings.call.request_timeout_secs),
        ));

        // Create app state
        let state = AppState {
            db,
            redis,
            registry,
            dispatcher,
            settings: Arc::new(settings.clone()),
        };

        // Build router with middleware
        let router = routes::create_router(state)
            .layer(logging::create_trace_layer())
            .layer(cors::create_cors_layer(&settings.cors));

        // Bind to address
        let addr: SocketAddr = settings.server_addr().parse()?;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}
