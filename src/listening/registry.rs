use std::{collections::HashMap, time::Duration};

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{
    common::types::{MemberId, MemberRef},
    ledger::ScoreLedger,
};

struct Timer {
    since: Instant,
    name: String,
}

/// Seconds that could not be written to the ledger yet.
struct Pending {
    name: String,
    seconds: u64,
}

#[derive(Default)]
struct RegistryState {
    timers: HashMap<MemberId, Timer>,
    pending: HashMap<MemberId, Pending>,
}

/// A finished listening interval.
#[derive(Debug, Clone, PartialEq)]
pub struct Stopped {
    pub elapsed: Duration,
    pub name: String,
}

/// Outcome of one [`ListeningRegistry::flush_all`] pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub credited: usize,
    pub deferred: usize,
}

/// Who is listening right now, and since when.
///
/// One per process. A member is either absent or present exactly once; all
/// access goes through a single lock that is never held across an await.
#[derive(Default)]
pub struct ListeningRegistry {
    state: Mutex<RegistryState>,
}

impl ListeningRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a timer for `member`. Returns `false` (and keeps the first
    /// start time) if one is already running.
    pub fn start(&self, member: &MemberRef) -> bool {
        let mut state = self.state.lock();
        if state.timers.contains_key(&member.id) {
            return false;
        }
        state.timers.insert(
            member.id,
            Timer {
                since: Instant::now(),
                name: member.name.clone(),
            },
        );
        true
    }

    /// Ends the timer for `member`; `None` if there was none.
    pub fn stop(&self, member: MemberId) -> Option<Stopped> {
        let timer = self.state.lock().timers.remove(&member)?;
        Some(Stopped {
            elapsed: timer.since.elapsed(),
            name: timer.name,
        })
    }

    pub fn is_active(&self, member: MemberId) -> bool {
        self.state.lock().timers.contains_key(&member)
    }

    /// Parks seconds the ledger refused so the next flush retries them.
    pub fn defer(&self, member: MemberId, name: &str, seconds: u64) {
        if seconds == 0 {
            return;
        }
        let mut state = self.state.lock();
        let pending = state.pending.entry(member).or_insert_with(|| Pending {
            name: name.to_string(),
            seconds: 0,
        });
        pending.name = name.to_string();
        pending.seconds += seconds;
    }

    /// Stops `member`'s timer and credits the whole seconds to the ledger.
    pub async fn stop_and_credit(&self, member: MemberId, ledger: &ScoreLedger) -> Option<Duration> {
        let stopped = self.stop(member)?;
        self.credit(ledger, member, &stopped.name, stopped.elapsed.as_secs())
            .await;
        Some(stopped.elapsed)
    }

    /// Checkpoints every running timer into the ledger without ending it:
    /// elapsed time is credited and the start time is reset to now.
    pub async fn flush_all(&self, ledger: &ScoreLedger) -> FlushReport {
        let credits = {
            let mut state = self.state.lock();
            let now = Instant::now();
            let mut credits: HashMap<MemberId, (String, u64)> = state
                .pending
                .drain()
                .map(|(member, p)| (member, (p.name, p.seconds)))
                .collect();

            for (member, timer) in state.timers.iter_mut() {
                let seconds = now.saturating_duration_since(timer.since).as_secs();
                timer.since = now;
                if seconds > 0 {
                    let entry = credits
                        .entry(*member)
                        .or_insert_with(|| (timer.name.clone(), 0));
                    entry.0 = timer.name.clone();
                    entry.1 += seconds;
                }
            }
            credits
        };

        let mut report = FlushReport::default();
        for (member, (name, seconds)) in credits {
            if self.credit(ledger, member, &name, seconds).await {
                report.credited += 1;
            } else {
                report.deferred += 1;
            }
        }
        if report != FlushReport::default() {
            debug!(
                "Flushed listening timers: {} credited, {} deferred",
                report.credited, report.deferred
            );
        }
        report
    }

    /// Checkpoints a single member, if they are listening.
    pub async fn flush_member(&self, member: MemberId, ledger: &ScoreLedger) -> bool {
        let credit = {
            let mut state = self.state.lock();
            if !state.timers.contains_key(&member) {
                return false;
            }
            let pending = state.pending.remove(&member).map(|p| p.seconds).unwrap_or(0);
            state.timers.get_mut(&member).map(|timer| {
                let now = Instant::now();
                let seconds = now.saturating_duration_since(timer.since).as_secs();
                timer.since = now;
                (timer.name.clone(), seconds + pending)
            })
        };

        match credit {
            Some((name, seconds)) => {
                self.credit(ledger, member, &name, seconds).await;
                true
            }
            None => false,
        }
    }

    async fn credit(&self, ledger: &ScoreLedger, member: MemberId, name: &str, seconds: u64) -> bool {
        if seconds == 0 {
            return true;
        }
        match ledger.add_score(member, name, seconds).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Could not credit {}s to {}: {}; keeping it for the next flush", seconds, member, e);
                self.defer(member, name, seconds);
                false
            }
        }
    }
}
