//! Per-game rank aggregation.

use tracing::{error, info};

use super::scanner::LeaderboardScanner;
use super::{CancelFlag, PipelineError};
use crate::bgg::Endpoints;
use crate::fetch::PageSource;
use crate::models::{OwnedSet, PlayedGame, RankRecord};

/// What to do when one game's scan fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the run on the first failure.
    #[default]
    FailFast,

    /// Log the failure, skip the game and carry on.
    Isolate,
}

/// A game skipped under [`FailurePolicy::Isolate`].
#[derive(Debug, Clone)]
pub struct GameFailure {
    pub game: PlayedGame,
    pub error: String,
}

/// Records in games-played order plus any isolated failures.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub records: Vec<RankRecord>,
    pub failures: Vec<GameFailure>,
}

/// Runs one leaderboard scan per played game and joins in ownership.
pub struct RankAggregator<'a> {
    source: &'a dyn PageSource,
    endpoints: &'a Endpoints,
    cancel: &'a CancelFlag,
    policy: FailurePolicy,
}

impl<'a> RankAggregator<'a> {
    pub fn new(
        source: &'a dyn PageSource,
        endpoints: &'a Endpoints,
        cancel: &'a CancelFlag,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            source,
            endpoints,
            cancel,
            policy,
        }
    }

    /// Scan every game in order. Games are never reordered or deduplicated.
    pub async fn aggregate(
        &self,
        games: &[PlayedGame],
        username: &str,
        owned: &OwnedSet,
    ) -> Result<Aggregation, PipelineError> {
        let scanner = LeaderboardScanner::new(self.source, self.endpoints, self.cancel);
        let mut aggregation = Aggregation::default();
        let total = games.len();

        for (i, game) in games.iter().enumerate() {
            info!("[{}/{}] {}", i + 1, total, game.name);

            match scanner.scan(game, username).await {
                Ok(scan) => {
                    let record = RankRecord::new(game, &scan, owned.contains(&game.id));
                    aggregation.records.push(record);
                }
                Err(PipelineError::Cancelled) => return Err(PipelineError::Cancelled),
                Err(e) if self.policy == FailurePolicy::Isolate => {
                    error!("Skipping {} ({}): {}", game.name, game.id, e);
                    aggregation.failures.push(GameFailure {
                        game: game.clone(),
                        error: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        Ok(aggregation)
    }
}
