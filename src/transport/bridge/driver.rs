use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::{
    commands::Reply,
    common::{
        errors::CaramellaError,
        types::{ChannelId, GuildId, MemberId},
    },
    playback::AudioSource,
    transport::bridge::messages::BridgeOutbound,
    voice::{ChatSink, VoiceDriver},
};

type AckSender = oneshot::Sender<Result<(), String>>;

/// [`VoiceDriver`] and [`ChatSink`] backed by the bridge websocket.
///
/// Voice actions are sent with a request id and complete when the bridge
/// acks that id, or fail once the gateway timeout elapses.
pub struct BridgeDriver {
    sender: Mutex<Option<flume::Sender<String>>>,
    pending: DashMap<u64, AckSender>,
    playing: DashSet<GuildId>,
    next_id: AtomicU64,
    timeout: Duration,
}

impl BridgeDriver {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sender: Mutex::new(None),
            pending: DashMap::new(),
            playing: DashSet::new(),
            next_id: AtomicU64::new(1),
            timeout,
        }
    }

    /// Routes outgoing frames to a newly connected bridge, replacing any previous one.
    pub fn attach(&self, tx: flume::Sender<String>) {
        if self.sender.lock().replace(tx).is_some() {
            warn!("Gateway bridge replaced by a new connection");
        }
    }

    /// Forgets `tx` if it is still the active bridge. In-flight voice actions fail.
    pub fn detach(&self, tx: &flume::Sender<String>) {
        let mut sender = self.sender.lock();
        if sender.as_ref().is_some_and(|current| current.same_channel(tx)) {
            *sender = None;
            drop(sender);
            // Dropping the ack senders wakes every waiter with an error.
            self.pending.clear();
            self.playing.clear();
        }
    }

    pub fn is_attached(&self) -> bool {
        self.sender.lock().is_some()
    }

    /// Completes the voice action waiting on `id`.
    pub fn resolve(&self, id: u64, ok: bool, error: Option<String>) {
        let Some((_, tx)) = self.pending.remove(&id) else {
            debug!("Ack for unknown or expired request {}", id);
            return;
        };
        let outcome = if ok {
            Ok(())
        } else {
            Err(error.unwrap_or_else(|| "rejected by gateway".to_string()))
        };
        let _ = tx.send(outcome);
    }

    fn send(&self, frame: &BridgeOutbound) -> Result<(), String> {
        let json = serde_json::to_string(frame).map_err(|e| e.to_string())?;
        let sender = self.sender.lock();
        let Some(tx) = sender.as_ref() else {
            return Err("no gateway bridge connected".to_string());
        };
        tx.send(json).map_err(|_| "gateway bridge disconnected".to_string())
    }

    async fn request(
        &self,
        action: &'static str,
        frame: impl FnOnce(u64) -> BridgeOutbound,
    ) -> Result<(), CaramellaError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);

        if let Err(reason) = self.send(&frame(id)) {
            self.pending.remove(&id);
            return Err(CaramellaError::voice(action, reason));
        }

        let outcome = tokio::time::timeout(self.timeout, rx).await;
        self.pending.remove(&id);
        match outcome {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(reason))) => Err(CaramellaError::voice(action, reason)),
            Ok(Err(_)) => Err(CaramellaError::voice(action, "gateway bridge disconnected")),
            Err(_) => Err(CaramellaError::voice(
                action,
                format!("no ack within {}ms", self.timeout.as_millis()),
            )),
        }
    }

    fn notify(&self, frame: BridgeOutbound) {
        if let Err(reason) = self.send(&frame) {
            debug!("Dropped {:?}: {}", frame, reason);
        }
    }
}

#[async_trait]
impl VoiceDriver for BridgeDriver {
    async fn connect(&self, guild: GuildId, channel: ChannelId) -> Result<(), CaramellaError> {
        self.request("connect", |id| BridgeOutbound::Connect {
            id,
            guild_id: guild,
            channel_id: channel,
        })
        .await
    }

    async fn disconnect(&self, guild: GuildId) -> Result<(), CaramellaError> {
        self.playing.remove(&guild);
        self.request("disconnect", |id| BridgeOutbound::Disconnect {
            id,
            guild_id: guild,
        })
        .await
    }

    async fn play(&self, guild: GuildId, source: &AudioSource) -> Result<(), CaramellaError> {
        self.request("play", |id| BridgeOutbound::Play {
            id,
            guild_id: guild,
            source: source.clone(),
        })
        .await?;
        self.playing.insert(guild);
        Ok(())
    }

    async fn stop(&self, guild: GuildId) -> Result<(), CaramellaError> {
        self.request("stop", |id| BridgeOutbound::Stop {
            id,
            guild_id: guild,
        })
        .await?;
        self.playing.remove(&guild);
        Ok(())
    }

    async fn is_playing(&self, guild: GuildId) -> bool {
        self.playing.contains(&guild)
    }
}

#[async_trait]
impl ChatSink for BridgeDriver {
    async fn send_reply(&self, guild: GuildId, channel: ChannelId, reply: &Reply) {
        self.notify(BridgeOutbound::Reply {
            guild_id: guild,
            channel_id: channel,
            reply: reply.clone(),
        });
    }

    async fn set_presence(&self, text: &str) {
        self.notify(BridgeOutbound::Presence {
            text: text.to_string(),
        });
    }

    async fn sync_badge(&self, guild: GuildId, member: MemberId, grant: &str, revoke: &[String]) {
        self.notify(BridgeOutbound::Badge {
            guild_id: guild,
            member_id: member,
            grant: grant.to_string(),
            revoke: revoke.to_vec(),
        });
    }
}
