//! Leaderboard resolution pipeline.
//!
//! Coordinates a run for one user:
//! 1. Poll the collection export until it is ready (owned set)
//! 2. Walk the games-played listing (games + canonical username)
//! 3. Scan each game's leaderboard in order (one rank record per game)
//!
//! Every request is issued and awaited one at a time.

mod aggregate;
mod paginator;
mod poller;
mod scanner;

pub use aggregate::{Aggregation, FailurePolicy, GameFailure, RankAggregator};
pub use paginator::{GamesPlayed, GamesPlayedPaginator};
pub use poller::{ExportPoller, PollConfig};
pub use scanner::{absolute_rank, threshold_on_page, LeaderboardScanner, ScanState};

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::bgg::{Endpoints, ParseError};
use crate::fetch::{FetchError, PageSource};
use crate::models::RankRecord;

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No user by that name: {0}")]
    UserNotFound(String),

    #[error("Transport fault: {0}")]
    Fetch(#[from] FetchError),

    #[error("Parse fault at {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: ParseError,
    },

    #[error("Collection export for {username} not ready after {waited:?}")]
    ExportTimeout { username: String, waited: Duration },

    #[error("Run cancelled")]
    Cancelled,
}

/// Shared flag a caller sets to stop a run before its next request.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<RwLock<bool>>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub async fn cancel(&self) {
        *self.0.write().await = true;
    }

    pub async fn is_cancelled(&self) -> bool {
        *self.0.read().await
    }

    /// Fail with `Cancelled` once cancellation was requested.
    pub async fn check(&self) -> Result<(), PipelineError> {
        if self.is_cancelled().await {
            warn!("Run cancelled");
            return Err(PipelineError::Cancelled);
        }
        Ok(())
    }
}

/// Configuration for a run.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub poll: PollConfig,
    pub failure_policy: FailurePolicy,
}

/// Result of a complete run.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Username as the site renders it
    pub canonical_username: String,

    /// One record per scanned game, in games-played order
    pub records: Vec<RankRecord>,

    /// Games skipped under `FailurePolicy::Isolate`
    pub failures: Vec<GameFailure>,

    pub owned_count: usize,
    pub duration: Duration,
}

impl RunResult {
    pub fn ranked_count(&self) -> usize {
        self.records.iter().filter(|r| r.rank > 0).count()
    }

    pub fn owned_played_count(&self) -> usize {
        self.records.iter().filter(|r| r.owned).count()
    }
}

/// Pipeline orchestrator.
pub struct Pipeline {
    config: PipelineConfig,
    source: Arc<dyn PageSource>,
    endpoints: Endpoints,
    cancel: CancelFlag,
}

impl Pipeline {
    /// Create a new pipeline.
    pub fn new(config: PipelineConfig, source: Arc<dyn PageSource>, endpoints: Endpoints) -> Self {
        Self {
            config,
            source,
            endpoints,
            cancel: CancelFlag::new(),
        }
    }

    /// Handle for cancelling this pipeline from elsewhere.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Resolve every played game's leaderboard standing for `username`.
    pub async fn run(&self, username: &str) -> Result<RunResult, PipelineError> {
        let start = std::time::Instant::now();
        let source = self.source.as_ref();

        info!("Collection hunting for {}", username);
        let owned = ExportPoller::new(source, &self.endpoints, self.config.poll.clone(), &self.cancel)
            .poll(username)
            .await?;

        let played = GamesPlayedPaginator::new(source, &self.endpoints, &self.cancel)
            .collect(username)
            .await?;

        let aggregation = RankAggregator::new(
            source,
            &self.endpoints,
            &self.cancel,
            self.config.failure_policy,
        )
        .aggregate(&played.games, &played.canonical_username, &owned)
        .await?;

        let duration = start.elapsed();
        info!(
            "Resolved {} games for {} in {:?}",
            aggregation.records.len(),
            played.canonical_username,
            duration
        );

        Ok(RunResult {
            canonical_username: played.canonical_username,
            records: aggregation.records,
            failures: aggregation.failures,
            owned_count: owned.len(),
            duration,
        })
    }
}
