use serde::{Deserialize, Serialize};

use crate::common::types::MemberId;

/// Name of the pub/sub channel score updates are published on.
pub const SCORE_CHANNEL: &str = "channel:score";

/// Messages published on `channel:score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreEvent {
    Score { member: MemberId, score: u64 },
    Listening { member: MemberId, listening: bool },
}
