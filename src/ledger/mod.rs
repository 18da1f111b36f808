pub mod events;
pub mod store;

pub use events::{SCORE_CHANNEL, ScoreEvent};
pub use store::{MemoryStore, NAMES, SCORES, ScoreStore, StoreError, StoreResult};

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::common::types::MemberId;

const EVENT_BUFFER: usize = 256;

/// One row of the scoreboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreEntry {
    pub member: MemberId,
    pub score: u64,
}

/// Per-member listening scores on top of a [`ScoreStore`].
///
/// Every increment also refreshes the member's display name and is
/// published on `channel:score`.
pub struct ScoreLedger {
    store: Arc<dyn ScoreStore>,
    events: broadcast::Sender<ScoreEvent>,
}

impl ScoreLedger {
    pub fn new(store: Arc<dyn ScoreStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self { store, events }
    }

    pub async fn get_score(&self, member: MemberId) -> StoreResult<u64> {
        match self.store.get(SCORES, &member.to_string()).await? {
            Some(raw) => parse_score(&member.to_string(), &raw),
            None => Ok(0),
        }
    }

    /// Adds `delta` seconds to `member` and returns the new total.
    ///
    /// Once the increment is stored the call succeeds; a failed name refresh
    /// is only logged so the caller never credits the same seconds twice.
    pub async fn add_score(&self, member: MemberId, name: &str, delta: u64) -> StoreResult<u64> {
        let key = member.to_string();
        let total = self.store.increment(SCORES, &key, delta as i64).await?;
        if let Err(e) = self.store.set(NAMES, &key, name.to_string()).await {
            warn!("Could not refresh the name of {}: {}", member, e);
        }

        let total = total.max(0) as u64;
        debug!("Credited {}s to {} ({}), total {}", delta, name, member, total);
        self.publish(ScoreEvent::Score {
            member,
            score: total,
        });
        Ok(total)
    }

    /// Entries with a positive score, highest first, ties by member id ascending.
    pub async fn top_n(&self, n: usize) -> StoreResult<Vec<ScoreEntry>> {
        let mut entries = Vec::new();
        for (key, raw) in self.store.get_all(SCORES).await? {
            let Ok(member) = key.parse::<MemberId>() else {
                warn!("Skipping score row with non-numeric member key {:?}", key);
                continue;
            };
            let score = match parse_score(&key, &raw) {
                Ok(score) => score,
                Err(e) => {
                    warn!("Skipping score row: {}", e);
                    continue;
                }
            };
            if score > 0 {
                entries.push(ScoreEntry { member, score });
            }
        }

        entries.sort_by(|a, b| b.score.cmp(&a.score).then(a.member.cmp(&b.member)));
        entries.truncate(n);
        Ok(entries)
    }

    /// Last display name seen for `member`, for display only.
    pub async fn display_name(&self, member: MemberId) -> StoreResult<Option<String>> {
        self.store.get(NAMES, &member.to_string()).await
    }

    pub async fn snapshot(&self) -> StoreResult<()> {
        self.store.persist().await
    }

    pub fn publish_listening(&self, member: MemberId, listening: bool) {
        self.publish(ScoreEvent::Listening { member, listening });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScoreEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: ScoreEvent) {
        // No subscribers is the common case.
        let _ = self.events.send(event);
    }
}

fn parse_score(key: &str, raw: &str) -> StoreResult<u64> {
    raw.parse::<i64>()
        .map(|v| v.max(0) as u64)
        .map_err(|_| StoreError::Corrupt {
            table: SCORES.to_string(),
            key: key.to_string(),
        })
}
