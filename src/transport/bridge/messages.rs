use serde::{Deserialize, Serialize};

use crate::{
    commands::{CommandInvocation, Reply},
    common::types::{ChannelId, GuildId, MemberId},
    playback::AudioSource,
    voice::{GatewayEvent, MemberVoiceState, VoiceStateChange},
};

/// Frames the bridge process sends us.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum BridgeInbound {
    VoiceStateUpdate(VoiceStateChange),
    #[serde(rename_all = "camelCase")]
    VoiceSnapshot {
        guild_id: GuildId,
        states: Vec<MemberVoiceState>,
    },
    Command(CommandInvocation),
    Ack {
        id: u64,
        ok: bool,
        #[serde(default)]
        error: Option<String>,
    },
}

impl BridgeInbound {
    /// The controller event carried by this frame; `None` for acks.
    pub fn into_event(self) -> Option<GatewayEvent> {
        match self {
            Self::VoiceStateUpdate(change) => Some(GatewayEvent::VoiceStateChanged(change)),
            Self::VoiceSnapshot { guild_id, states } => {
                Some(GatewayEvent::VoiceSnapshot { guild_id, states })
            }
            Self::Command(invocation) => Some(GatewayEvent::CommandInvoked(invocation)),
            Self::Ack { .. } => None,
        }
    }
}

/// Frames we send to the bridge. Voice actions carry an `id` the bridge must ack.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum BridgeOutbound {
    #[serde(rename_all = "camelCase")]
    Connect {
        id: u64,
        guild_id: GuildId,
        channel_id: ChannelId,
    },
    #[serde(rename_all = "camelCase")]
    Disconnect { id: u64, guild_id: GuildId },
    #[serde(rename_all = "camelCase")]
    Play {
        id: u64,
        guild_id: GuildId,
        source: AudioSource,
    },
    #[serde(rename_all = "camelCase")]
    Stop { id: u64, guild_id: GuildId },
    #[serde(rename_all = "camelCase")]
    Reply {
        guild_id: GuildId,
        channel_id: ChannelId,
        reply: Reply,
    },
    Presence { text: String },
    #[serde(rename_all = "camelCase")]
    Badge {
        guild_id: GuildId,
        member_id: MemberId,
        grant: String,
        revoke: Vec<String>,
    },
}
