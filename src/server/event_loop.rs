use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::{
    commands::Reply,
    voice::{ChatSink, Controller, GatewayEvent},
};

/// Processes gateway events one at a time until every sender is gone.
/// A failed event is logged and never stops the loop.
pub async fn run_event_loop(
    controller: Arc<Controller>,
    chat: Arc<dyn ChatSink>,
    mut events: mpsc::UnboundedReceiver<GatewayEvent>,
) {
    while let Some(event) = events.recv().await {
        dispatch(&controller, chat.as_ref(), event).await;
    }
    info!("Event loop finished");
}

pub async fn dispatch(controller: &Controller, chat: &dyn ChatSink, event: GatewayEvent) {
    let guild_id = event.guild_id();
    let reply_to = match &event {
        GatewayEvent::CommandInvoked(invocation) => Some(invocation.channel_id),
        _ => None,
    };

    let reply = match controller.handle(event).await {
        Ok(reply) => reply,
        Err(e) if e.is_user_facing() => Some(Reply::message(e.to_string())),
        Err(e) => {
            warn!("[{}] Event handling failed: {}", guild_id, e);
            None
        }
    };

    if let (Some(reply), Some(channel)) = (reply, reply_to) {
        chat.send_reply(guild_id, channel, &reply).await;
    }
}
