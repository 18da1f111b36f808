use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, error, info, warn};

use crate::{
    common::types::MemberId, server::AppState, transport::bridge::messages::BridgeInbound,
};

/// GET /gateway
pub async fn gateway_handler(
    headers: HeaderMap,
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Result<Response, (StatusCode, &'static str)> {
    let auth_header = headers.get("authorization").and_then(|h| h.to_str().ok());
    match auth_header {
        Some(auth) if auth == state.config.server.password => {}
        Some(_) => {
            warn!("Bridge authorization failed: Invalid password provided");
            return Err((StatusCode::UNAUTHORIZED, "Unauthorized"));
        }
        None => {
            warn!("Bridge authorization failed: Missing Authorization header");
            return Err((StatusCode::UNAUTHORIZED, "Unauthorized"));
        }
    }

    let user_id = headers
        .get("user-id")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse::<MemberId>().ok());
    match user_id {
        Some(id) if id == state.config.bot.user_id => {}
        Some(id) => {
            warn!("Bridge connected as {} but this bot is {}", id, state.config.bot.user_id);
            return Err((StatusCode::FORBIDDEN, "User-Id does not match this bot"));
        }
        None => return Err((StatusCode::BAD_REQUEST, "Missing or invalid User-Id header")),
    }

    match headers.get("client-name").and_then(|h| h.to_str().ok()) {
        Some(name) => info!("Incoming bridge connection from client: {}", name),
        None => debug!("Bridge connected without 'Client-Name' header"),
    }

    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, state))
        .into_response())
}

pub async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let connection = uuid::Uuid::new_v4();
    let (tx, rx) = flume::unbounded::<String>();
    state.bridge.attach(tx.clone());
    info!("Gateway bridge connected: connection={}", connection);

    loop {
        tokio::select! {
            Ok(json) = rx.recv_async() => {
                if let Err(e) = socket.send(Message::Text(json.into())).await {
                    error!("Bridge send error: connection={} err={}", connection, e);
                    break;
                }
            }
            msg = socket.recv() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        warn!("Bridge websocket error: connection={} err={}", connection, e);
                        break;
                    }
                    None => break,
                };

                match msg {
                    Message::Text(text) => handle_frame(&state, text.as_str()),
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    }

    state.bridge.detach(&tx);
    info!("Gateway bridge disconnected: connection={}", connection);
}

fn handle_frame(state: &AppState, text: &str) {
    let frame = match serde_json::from_str::<BridgeInbound>(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("Ignoring malformed bridge frame: {}", e);
            return;
        }
    };

    match frame {
        BridgeInbound::Ack { id, ok, error } => state.bridge.resolve(id, ok, error),
        other => {
            if let Some(event) = other.into_event() {
                if state.events.send(event).is_err() {
                    error!("Event loop is gone; dropping bridge event");
                }
            }
        }
    }
}
