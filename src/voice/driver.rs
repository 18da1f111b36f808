use async_trait::async_trait;

use crate::{
    commands::Reply,
    common::{
        errors::CaramellaError,
        types::{ChannelId, GuildId, MemberId},
    },
    playback::AudioSource,
};

/// Voice actions the chat gateway performs for the bot.
///
/// Every call is bounded by the gateway's own timeout; failures come back
/// as [`CaramellaError::VoiceActionFailed`].
#[async_trait]
pub trait VoiceDriver: Send + Sync {
    async fn connect(&self, guild: GuildId, channel: ChannelId) -> Result<(), CaramellaError>;

    async fn disconnect(&self, guild: GuildId) -> Result<(), CaramellaError>;

    async fn play(&self, guild: GuildId, source: &AudioSource) -> Result<(), CaramellaError>;

    async fn stop(&self, guild: GuildId) -> Result<(), CaramellaError>;

    async fn is_playing(&self, guild: GuildId) -> bool;
}

/// Fire-and-forget chat side effects.
#[async_trait]
pub trait ChatSink: Send + Sync {
    async fn send_reply(&self, guild: GuildId, channel: ChannelId, reply: &Reply);

    async fn set_presence(&self, text: &str);

    async fn sync_badge(&self, guild: GuildId, member: MemberId, grant: &str, revoke: &[String]);
}
