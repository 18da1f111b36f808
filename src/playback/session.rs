use serde::Serialize;
use tokio::time::Instant;

use crate::{
    common::{
        errors::CaramellaError,
        types::{ChannelId, MemberId},
    },
    playback::source::{AudioAsset, AudioSource},
};

pub const MIN_TEMPO: f64 = 0.25;
pub const MAX_TEMPO: f64 = 4.0;

/// Whoever or whatever the bot follows into voice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum Target {
    #[default]
    None,
    Member(MemberId),
    Channel(ChannelId),
}

pub fn validate_tempo(tempo: f64) -> Result<f64, CaramellaError> {
    if (MIN_TEMPO..=MAX_TEMPO).contains(&tempo) {
        Ok(tempo)
    } else {
        Err(CaramellaError::OutOfRange(tempo))
    }
}

/// Per-community playback state: target, position, tempo and the current source.
#[derive(Debug)]
pub struct PlaybackSession {
    target: Target,
    tempo: f64,
    elapsed_seconds: f64,
    audio_handle: Option<AudioSource>,
    playing_since: Option<Instant>,
}

impl PlaybackSession {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            tempo: 1.0,
            elapsed_seconds: 0.0,
            audio_handle: None,
            playing_since: None,
        }
    }

    pub fn target(&self) -> Target {
        self.target
    }

    /// Swaps the target. Playback is left alone.
    pub fn retarget(&mut self, target: Target) {
        self.target = target;
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    /// Takes effect on the next [`reload`](Self::reload).
    pub fn set_tempo(&mut self, tempo: f64) -> Result<(), CaramellaError> {
        self.tempo = validate_tempo(tempo)?;
        Ok(())
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    pub fn is_running(&self) -> bool {
        self.playing_since.is_some()
    }

    /// Track position at `now`: the frozen position plus, while playing, the
    /// wall-clock time since playback started scaled by tempo.
    pub fn current_offset(&self, now: Instant) -> f64 {
        match self.playing_since {
            Some(since) => {
                self.elapsed_seconds
                    + now.saturating_duration_since(since).as_secs_f64() * self.tempo
            }
            None => self.elapsed_seconds,
        }
    }

    /// Freezes the position at `offset`; the position stops advancing until
    /// [`mark_playing`](Self::mark_playing).
    pub fn capture_position(&mut self, offset: f64) {
        self.elapsed_seconds = offset.max(0.0);
        self.playing_since = None;
    }

    /// Captures the live position, if playing.
    pub fn freeze(&mut self) {
        if self.playing_since.is_some() {
            let offset = self.current_offset(Instant::now());
            self.capture_position(offset);
        }
    }

    /// Drops the current source and builds a new one at the frozen position and current tempo.
    pub fn reload(&mut self, asset: &AudioAsset) -> &AudioSource {
        self.release();
        self.audio_handle
            .insert(AudioSource::new(asset, self.elapsed_seconds, self.tempo))
    }

    /// Drops the current source, if any.
    pub fn release(&mut self) {
        self.audio_handle = None;
    }

    pub fn audio_handle(&self) -> Option<&AudioSource> {
        self.audio_handle.as_ref()
    }

    pub fn mark_playing(&mut self) {
        self.playing_since = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn asset() -> AudioAsset {
        AudioAsset::new("caramelldansen.opus", 175.0)
    }

    #[test]
    fn tempo_range_is_enforced() {
        let mut session = PlaybackSession::new(Target::None);
        assert!(matches!(
            session.set_tempo(0.2),
            Err(CaramellaError::OutOfRange(_))
        ));
        assert!(session.set_tempo(4.5).is_err());
        assert_eq!(session.tempo(), 1.0);

        session.set_tempo(0.25).unwrap();
        session.set_tempo(4.0).unwrap();
        assert_eq!(session.tempo(), 4.0);
    }

    #[test]
    fn retarget_leaves_playback_alone() {
        let mut session = PlaybackSession::new(Target::Channel(ChannelId(1)));
        session.capture_position(12.0);
        session.reload(&asset());
        session.retarget(Target::Member(MemberId(2)));

        assert_eq!(session.target(), Target::Member(MemberId(2)));
        assert_eq!(session.elapsed_seconds(), 12.0);
        assert!(session.audio_handle().is_some());
    }

    #[test]
    fn reload_rebuilds_with_current_parameters() {
        let mut session = PlaybackSession::new(Target::None);
        session.capture_position(200.0);
        let first = session.reload(&asset()).clone();
        assert_eq!(first.seek, 25.0);
        assert_eq!(first.filter, "atempo=1.0");

        session.set_tempo(3.0).unwrap();
        let second = session.reload(&asset()).clone();
        assert_eq!(second.seek, 25.0);
        assert_eq!(second.filter, "atempo=2.0,atempo=1.5");
        assert_eq!(session.audio_handle(), Some(&second));
    }

    #[tokio::test(start_paused = true)]
    async fn position_only_advances_while_playing() {
        let mut session = PlaybackSession::new(Target::None);
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(session.current_offset(Instant::now()), 0.0);

        session.mark_playing();
        tokio::time::advance(Duration::from_secs(10)).await;
        session.freeze();
        assert_eq!(session.elapsed_seconds(), 10.0);
        assert!(!session.is_running());

        tokio::time::advance(Duration::from_secs(30)).await;
        session.freeze();
        assert_eq!(session.elapsed_seconds(), 10.0);
    }

    #[tokio::test(start_paused = true)]
    async fn position_scales_with_tempo() {
        let mut session = PlaybackSession::new(Target::None);
        session.set_tempo(2.0).unwrap();
        session.mark_playing();
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(session.current_offset(Instant::now()), 10.0);
    }
}
