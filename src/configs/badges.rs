use serde::{Deserialize, Serialize};

use crate::common::types::GuildId;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BadgesConfig {
    /// The community whose roles mirror listening time.
    pub guild_id: GuildId,
    #[serde(default = "default_tiers")]
    pub tiers: Vec<BadgeTier>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BadgeTier {
    pub threshold: u64,
    pub role: String,
}

fn default_tiers() -> Vec<BadgeTier> {
    [
        (0, "unenlightened"),
        (600, "Caramella Babies - 10 Minutes"),
        (3600, "Caramella Fans - 1 Hour"),
        (43200, "Caramella Captains - 12 Hours"),
        (86400, "Caramella Dancers - 1 Day"),
    ]
    .into_iter()
    .map(|(threshold, role)| BadgeTier {
        threshold,
        role: role.to_string(),
    })
    .collect()
}
