use std::path::PathBuf;

use serde::Serialize;

use crate::configs::BotConfig;

/// Range a single `atempo` stage accepts.
const STAGE_MIN: f64 = 0.5;
const STAGE_MAX: f64 = 2.0;

/// The looped track every session plays.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioAsset {
    pub path: PathBuf,
    pub track_length_secs: f64,
}

impl AudioAsset {
    pub fn new(path: impl Into<PathBuf>, track_length_secs: f64) -> Self {
        Self {
            path: path.into(),
            track_length_secs,
        }
    }

    pub fn from_config(bot: &BotConfig) -> Self {
        Self::new(bot.audio_path.clone(), bot.track_length_secs)
    }
}

/// An ffmpeg-backed source bound to one seek position and one tempo.
///
/// Never mutated: a different position or tempo means a new source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSource {
    pub path: PathBuf,
    /// Seconds into the track, one decimal.
    pub seek: f64,
    pub filter: String,
    pub before_options: String,
    pub options: String,
}

impl AudioSource {
    pub fn new(asset: &AudioAsset, elapsed_seconds: f64, tempo: f64) -> Self {
        let seek = seek_position(elapsed_seconds, asset.track_length_secs);
        let filter = tempo_filter(tempo);
        Self {
            path: asset.path.clone(),
            seek,
            before_options: format!("-stream_loop -1 -ss {}", py_float(seek)),
            options: format!("-filter:a \"{}\"", filter),
            filter,
        }
    }
}

/// Position inside the looped track, rounded to a tenth of a second.
pub fn seek_position(elapsed_seconds: f64, track_length_secs: f64) -> f64 {
    if track_length_secs <= 0.0 {
        return 0.0;
    }
    round_to(elapsed_seconds.rem_euclid(track_length_secs), 1)
}

/// ffmpeg `atempo` chain for `tempo`. One stage only covers 0.5–2.0, so
/// slower or faster tempos are split over two stages.
pub fn tempo_filter(tempo: f64) -> String {
    if (STAGE_MIN..=STAGE_MAX).contains(&tempo) {
        format!("atempo={}", py_float(tempo))
    } else if tempo < STAGE_MIN {
        format!(
            "atempo={},atempo={}",
            py_float(STAGE_MIN),
            py_float(round_to(tempo / STAGE_MIN, 2))
        )
    } else {
        format!(
            "atempo={},atempo={}",
            py_float(STAGE_MAX),
            py_float(round_to(tempo / STAGE_MAX, 2))
        )
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Shortest decimal form that always keeps a fractional digit (`1.0`, `1.5`, `0.75`).
fn py_float(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tempo_filter_single_stage() {
        assert_eq!(tempo_filter(1.0), "atempo=1.0");
        assert_eq!(tempo_filter(0.5), "atempo=0.5");
        assert_eq!(tempo_filter(2.0), "atempo=2.0");
        assert_eq!(tempo_filter(1.25), "atempo=1.25");
    }

    #[test]
    fn tempo_filter_chains_outside_stage_range() {
        assert_eq!(tempo_filter(0.25), "atempo=0.5,atempo=0.5");
        assert_eq!(tempo_filter(4.0), "atempo=2.0,atempo=2.0");
        assert_eq!(tempo_filter(3.0), "atempo=2.0,atempo=1.5");
        assert_eq!(tempo_filter(0.3), "atempo=0.5,atempo=0.6");
    }

    #[test]
    fn seek_wraps_track_length() {
        assert_eq!(seek_position(0.0, 175.0), 0.0);
        assert_eq!(seek_position(180.0, 175.0), 5.0);
        assert_eq!(seek_position(12.345, 175.0), 12.3);
        assert_eq!(seek_position(350.0, 175.0), 0.0);
    }

    #[test]
    fn source_renders_ffmpeg_options() {
        let asset = AudioAsset::new("caramelldansen.opus", 175.0);
        let source = AudioSource::new(&asset, 190.0, 3.0);
        assert_eq!(source.seek, 15.0);
        assert_eq!(source.before_options, "-stream_loop -1 -ss 15.0");
        assert_eq!(source.options, "-filter:a \"atempo=2.0,atempo=1.5\"");
    }
}
