//! Scan results and the final per-game rank record.

use serde::{Deserialize, Serialize};

use super::{GameId, PlayedGame};

/// Leaderboard ranks whose play counts are reported for every game.
pub const PERCENTILE_RANKS: [u32; 5] = [1, 5, 10, 20, 100];

/// Play count written for a user with no leaderboard row.
pub const NOT_RANKED: &str = "NR";

/// Placeholder for a percentile rank the leaderboard does not reach.
pub const NOT_AVAILABLE: &str = "N/A";

/// Where the user sits on one game's leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UserStanding {
    /// The user's row was found at this absolute (1-based) rank.
    Ranked { rank: u32, plays: String },

    /// The leaderboard ended without a row for the user.
    Unranked,
}

impl UserStanding {
    /// Absolute rank, or 0 for an unranked user.
    pub fn rank(&self) -> u32 {
        match self {
            UserStanding::Ranked { rank, .. } => *rank,
            UserStanding::Unranked => 0,
        }
    }

    /// Play count as rendered by the site, or `NR`.
    pub fn plays(&self) -> &str {
        match self {
            UserStanding::Ranked { plays, .. } => plays,
            UserStanding::Unranked => NOT_RANKED,
        }
    }

    pub fn is_ranked(&self) -> bool {
        matches!(self, UserStanding::Ranked { .. })
    }
}

/// Play counts observed at the fixed ranks in [`PERCENTILE_RANKS`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Percentiles {
    plays: [Option<String>; 5],
}

impl Percentiles {
    /// Record the play count seen at `rank`. Ranks outside
    /// [`PERCENTILE_RANKS`] are ignored.
    pub fn record(&mut self, rank: u32, plays: impl Into<String>) {
        if let Some(slot) = PERCENTILE_RANKS.iter().position(|&r| r == rank) {
            self.plays[slot] = Some(plays.into());
        }
    }

    /// Play count at `rank`, if the leaderboard reaches it.
    pub fn at(&self, rank: u32) -> Option<&str> {
        PERCENTILE_RANKS
            .iter()
            .position(|&r| r == rank)
            .and_then(|slot| self.plays[slot].as_deref())
    }
}

/// Everything learned from walking one game's leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub percentiles: Percentiles,
    pub ghi: u32,
    pub standing: UserStanding,
    pub pages_fetched: u32,
}

/// One output row: a played game with its rank statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankRecord {
    pub game: String,
    pub game_id: GameId,
    pub rank: u32,
    pub plays: String,
    pub rank1_plays: Option<String>,
    pub rank5_plays: Option<String>,
    pub rank10_plays: Option<String>,
    pub rank20_plays: Option<String>,
    pub rank100_plays: Option<String>,
    pub ghi: u32,
    pub owned: bool,
}

impl RankRecord {
    pub fn new(game: &PlayedGame, scan: &ScanResult, owned: bool) -> Self {
        let at = |rank: u32| scan.percentiles.at(rank).map(str::to_string);

        Self {
            game: game.name.clone(),
            game_id: game.id.clone(),
            rank: scan.standing.rank(),
            plays: scan.standing.plays().to_string(),
            rank1_plays: at(1),
            rank5_plays: at(5),
            rank10_plays: at(10),
            rank20_plays: at(20),
            rank100_plays: at(100),
            ghi: scan.ghi,
            owned,
        }
    }

    /// The five percentile play counts, ordered by rank.
    pub fn percentile_plays(&self) -> [Option<&str>; 5] {
        [
            self.rank1_plays.as_deref(),
            self.rank5_plays.as_deref(),
            self.rank10_plays.as_deref(),
            self.rank20_plays.as_deref(),
            self.rank100_plays.as_deref(),
        ]
    }
}
