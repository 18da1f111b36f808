use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::common::types::MemberId;

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct BotConfig {
    /// The bot's own member id; its voice events are reconciled, never followed.
    pub user_id: MemberId,
    /// Members allowed to run `target`.
    pub operators: Vec<MemberId>,
    pub prefixes: Vec<String>,
    pub audio_path: PathBuf,
    pub track_length_secs: f64,
    pub gateway_timeout_ms: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            user_id: MemberId(0),
            operators: Vec::new(),
            prefixes: vec!["caramella ".into(), "!".into()],
            audio_path: PathBuf::from("caramelldansen.opus"),
            track_length_secs: 175.0,
            gateway_timeout_ms: 10_000,
        }
    }
}

impl BotConfig {
    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_millis(self.gateway_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct JobsConfig {
    pub flush_secs: u64,
    pub presence_secs: u64,
    pub badges_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            flush_secs: 10,
            presence_secs: 5,
            badges_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LedgerConfig {
    /// JSON snapshot location. Without one, scores only live in memory.
    pub snapshot_path: Option<PathBuf>,
}
