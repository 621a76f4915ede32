//! Cache Module
//!
//! Redis connection management. Redis backs the gateway rate limiter; all
//! chat state lives in PostgreSQL or process memory.

use redis::aio::ConnectionManager;

use crate::config::RedisSettings;

/// Create a Redis connection manager with automatic reconnection.
pub async fn create_redis_client(
    settings: &RedisSettings,
) -> Result<ConnectionManager, redis::RedisError> {
    let client = redis::Client::open(settings.url.as_str())?;
    ConnectionManager::new(client).await
}
