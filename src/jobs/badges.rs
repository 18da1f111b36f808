use tracing::debug;

use crate::{
    configs::{BadgeTier, BadgesConfig},
    ledger::{ScoreLedger, StoreResult},
    voice::ChatSink,
};

/// The highest tier whose threshold the score has reached.
pub fn badge_for(score: u64, tiers: &[BadgeTier]) -> Option<&BadgeTier> {
    tiers
        .iter()
        .filter(|tier| tier.threshold <= score)
        .max_by_key(|tier| tier.threshold)
}

/// Grants every scored member of the badge guild their tier role and revokes
/// the other tier roles. Returns how many members were synced.
pub async fn sync_badges(
    ledger: &ScoreLedger,
    badges: &BadgesConfig,
    chat: &dyn ChatSink,
) -> StoreResult<usize> {
    let mut synced = 0;
    for entry in ledger.top_n(usize::MAX).await? {
        let Some(tier) = badge_for(entry.score, &badges.tiers) else {
            continue;
        };
        let revoke: Vec<String> = badges
            .tiers
            .iter()
            .filter(|other| other.role != tier.role)
            .map(|other| other.role.clone())
            .collect();
        chat.sync_badge(badges.guild_id, entry.member, &tier.role, &revoke)
            .await;
        synced += 1;
    }
    debug!("Synced badges for {} members", synced);
    Ok(synced)
}
