use tracing::warn;

use crate::{ledger::ScoreLedger, listening::ListeningRegistry};

/// Checkpoints every running timer into the ledger, then snapshots the store.
pub async fn flush_scores(registry: &ListeningRegistry, ledger: &ScoreLedger) {
    registry.flush_all(ledger).await;
    if let Err(e) = ledger.snapshot().await {
        warn!("Score snapshot failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::types::{MemberId, MemberRef},
        ledger::MemoryStore,
    };
    use std::{sync::Arc, time::Duration};

    #[tokio::test(start_paused = true)]
    async fn final_flush_after_periodic_flush_does_not_double_credit() {
        let registry = ListeningRegistry::new();
        let ledger = ScoreLedger::new(Arc::new(MemoryStore::new()));
        registry.start(&MemberRef::new(1, "alice"));

        tokio::time::advance(Duration::from_secs(25)).await;
        flush_scores(&registry, &ledger).await;
        flush_scores(&registry, &ledger).await;

        assert_eq!(ledger.get_score(MemberId(1)).await.unwrap(), 25);
        assert!(registry.is_active(MemberId(1)));
    }
}
