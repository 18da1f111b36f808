use serde::{Deserialize, Serialize};

use crate::{
    commands::CommandInvocation,
    common::types::{ChannelId, GuildId, MemberRef},
};

/// A member's voice presence at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceState {
    #[serde(default)]
    pub channel_id: Option<ChannelId>,
    #[serde(default)]
    pub self_deaf: bool,
}

impl VoiceState {
    pub fn in_channel(channel: impl Into<ChannelId>) -> Self {
        Self {
            channel_id: Some(channel.into()),
            self_deaf: false,
        }
    }

    pub fn deafened(mut self, self_deaf: bool) -> Self {
        self.self_deaf = self_deaf;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceStateChange {
    pub guild_id: GuildId,
    pub member: MemberRef,
    #[serde(default)]
    pub before: VoiceState,
    #[serde(default)]
    pub after: VoiceState,
}

impl VoiceStateChange {
    pub fn moved_channel(&self) -> bool {
        self.before.channel_id != self.after.channel_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberVoiceState {
    pub member: MemberRef,
    #[serde(flatten)]
    pub state: VoiceState,
}

/// Everything the controller reacts to.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    VoiceStateChanged(VoiceStateChange),
    CommandInvoked(CommandInvocation),
    /// Full voice roster of a guild, sent by the gateway after it (re)connects.
    VoiceSnapshot {
        guild_id: GuildId,
        states: Vec<MemberVoiceState>,
    },
}

impl GatewayEvent {
    pub fn guild_id(&self) -> GuildId {
        match self {
            Self::VoiceStateChanged(change) => change.guild_id,
            Self::CommandInvoked(invocation) => invocation.guild_id,
            Self::VoiceSnapshot { guild_id, .. } => *guild_id,
        }
    }
}
