use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::{ledger::SCORE_CHANNEL, server::AppState};

/// GET /ws/score
pub async fn score_socket(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| stream_scores(socket, state))
}

/// Forwards every `channel:score` message to the socket until it closes.
async fn stream_scores(mut socket: WebSocket, state: Arc<AppState>) {
    let mut events = state.ledger.subscribe();
    debug!("Live subscriber attached to {}", SCORE_CHANNEL);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let Ok(json) = serde_json::to_string(&event) else {
                        continue;
                    };
                    if let Err(e) = socket.send(Message::Text(json.into())).await {
                        debug!("Live subscriber gone: {}", e);
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Live subscriber lagged, skipped {} messages", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            msg = socket.recv() => match msg {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }
    debug!("Live subscriber detached from {}", SCORE_CHANNEL);
}
