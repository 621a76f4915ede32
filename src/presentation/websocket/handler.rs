//! WebSocket Connection Handler
//!
//! Accepts gateway upgrades, authenticates them, and runs the per-connection
//! event loop: inbound frames are parsed into typed client events and
//! dispatched; outbound events drain through a dedicated sender task.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::auth::authenticate;
use super::dispatcher::{ConnectionContext, Delivery};
use super::messages::{ClientEvent, ErrorPayload, ServerEvent};
use crate::domain::User;
use crate::infrastructure::metrics;
use crate::infrastructure::repositories::PgUserRepository;
use crate::shared::error::ErrorResponse;
use crate::startup::AppState;

/// Handshake query parameters.
#[derive(Debug, Deserialize)]
pub struct GatewayParams {
    token: Option<String>,
}

/// WebSocket upgrade handler. The credential is checked before the upgrade
/// completes, so an unauthenticated client never reaches the event loop.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<GatewayParams>,
    State(state): State<AppState>,
) -> Response {
    let user_repo = PgUserRepository::new(state.db.clone());

    let user = match authenticate(params.token.as_deref(), &state.settings.jwt, &user_repo).await {
        Ok(user) => user,
        Err(err) => {
            tracing::debug!(error = %err, "Gateway connection refused");
            let body = ErrorResponse {
                code: 10003,
                message: format!("Authentication error: {}", err),
            };
            return (StatusCode::UNAUTHORIZED, Json(body)).into_response();
        }
    };

    let websocket = &state.settings.websocket;
    ws.max_message_size(websocket.max_message_size)
        .max_frame_size(websocket.max_frame_size)
        .on_upgrade(move |socket| handle_socket(socket, state, user))
}

/// Run one authenticated connection until the transport closes.
async fn handle_socket(socket: WebSocket, state: AppState, user: User) {
    let connection_id = Uuid::new_v4();
    let user_id = user.id;

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    if let Err(e) = state
        .dispatcher
        .handle_connect(connection_id, &user, tx)
        .await
    {
        tracing::error!(user_id, error = %e, "Connection setup failed");
        let _ = ws_sender.close().await;
        return;
    }

    metrics::set_gateway_connections(state.registry.connection_count());
    tracing::info!(user_id, connection_id = %connection_id, "User connected");

    // Forward outbound events from the channel to the socket.
    let sender_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize server event");
                    continue;
                }
            };
            if ws_sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let ctx = ConnectionContext {
        connection_id,
        user,
    };

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let deliveries = match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => state.dispatcher.dispatch(&ctx, event).await,
                    Err(e) => {
                        tracing::debug!(
                            connection_id = %connection_id,
                            error = %e,
                            "Malformed client event"
                        );
                        vec![Delivery::to_caller(ServerEvent::Error(ErrorPayload {
                            code: "VALIDATION_ERROR",
                            message: "malformed event".into(),
                        }))]
                    }
                };
                state.registry.apply(connection_id, deliveries);
            }
            Ok(Message::Close(_)) => {
                tracing::debug!(connection_id = %connection_id, "Connection closed");
                break;
            }
            Ok(Message::Ping(_)) => {
                // Pong is handled automatically by axum
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    state.dispatcher.handle_disconnect(connection_id, user_id).await;
    sender_task.abort();
    metrics::set_gateway_connections(state.registry.connection_count());

    tracing::info!(user_id, connection_id = %connection_id, "User disconnected");
}
