//! Leaderboard scanning.
//!
//! A game's leaderboard is paginated with no total count, so the scanner
//! walks pages 1, 2, ... and folds each one into a [`ScanState`] until two
//! one-shot facts are known: where the user's row is, and the threshold
//! rank (GHI). Both are evaluated against the same fetched page.

use tracing::{debug, info};

use super::{CancelFlag, PipelineError};
use crate::bgg::{parse_leaderboard, Endpoints, LeaderboardPage, LEADERBOARD_PAGE_SIZE};
use crate::fetch::{Freshness, PageSource};
use crate::models::{Percentiles, PlayedGame, ScanResult, UserStanding, PERCENTILE_RANKS};

/// Absolute 1-based rank of a row at `position` on `page`.
pub fn absolute_rank(page: u32, position: usize) -> u32 {
    (LEADERBOARD_PAGE_SIZE as u32) * (page - 1) + position as u32
}

/// Threshold rank determined by this page, if any.
///
/// At the first row whose rank exceeds its play count the threshold is the
/// rank before it. When the last page of the table has no such row, the
/// threshold is the last row's rank.
pub fn threshold_on_page(page_number: u32, page: &LeaderboardPage) -> Option<u32> {
    for row in page.rows() {
        let rank = absolute_rank(page_number, row.position);
        if let Some(plays) = row.play_count_value() {
            if u64::from(rank) > plays {
                return Some(rank - 1);
            }
        }
    }

    if page.is_last() {
        page.rows()
            .last()
            .map(|row| absolute_rank(page_number, row.position))
    } else {
        None
    }
}

/// Per-game scan progress. Every field is written at most once.
#[derive(Debug, Clone, Default)]
pub struct ScanState {
    percentiles: Percentiles,
    ghi: Option<u32>,
    standing: Option<UserStanding>,
    last_rank_seen: u32,
    pages_seen: u32,
}

impl ScanState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_found(&self) -> bool {
        self.standing.is_some()
    }

    pub fn threshold_found(&self) -> bool {
        self.ghi.is_some()
    }

    /// Scanning continues while either fact is still unknown.
    pub fn is_complete(&self) -> bool {
        self.user_found() && self.threshold_found()
    }

    /// Fold one fetched page into the state.
    pub fn observe(&mut self, page_number: u32, page: &LeaderboardPage, username: &str) {
        self.pages_seen += 1;

        if page.is_empty() {
            // Past the end of the table, or no plays recorded at all
            if self.ghi.is_none() {
                self.ghi = Some(self.last_rank_seen);
            }
            if self.standing.is_none() {
                self.standing = Some(UserStanding::Unranked);
            }
            return;
        }

        if page_number == 1 {
            for rank in PERCENTILE_RANKS {
                if let Some(row) = page.row_at(rank as usize) {
                    if !row.play_count.is_empty() {
                        self.percentiles.record(rank, row.play_count.clone());
                    }
                }
            }
        }

        if self.ghi.is_none() {
            self.ghi = threshold_on_page(page_number, page);
        }

        if self.standing.is_none() {
            if let Some(row) = page.find_user(username) {
                self.standing = Some(UserStanding::Ranked {
                    rank: absolute_rank(page_number, row.position),
                    plays: row.user_plays.clone(),
                });
            } else if page.is_last() {
                self.standing = Some(UserStanding::Unranked);
            }
        }

        if let Some(row) = page.rows().last() {
            self.last_rank_seen = absolute_rank(page_number, row.position);
        }
    }

    /// Freeze the state into a result.
    pub fn into_result(self) -> ScanResult {
        ScanResult {
            percentiles: self.percentiles,
            ghi: self.ghi.unwrap_or(self.last_rank_seen),
            standing: self.standing.unwrap_or(UserStanding::Unranked),
            pages_fetched: self.pages_seen,
        }
    }
}

/// Walks one game's leaderboard.
pub struct LeaderboardScanner<'a> {
    source: &'a dyn PageSource,
    endpoints: &'a Endpoints,
    cancel: &'a CancelFlag,
}

impl<'a> LeaderboardScanner<'a> {
    pub fn new(source: &'a dyn PageSource, endpoints: &'a Endpoints, cancel: &'a CancelFlag) -> Self {
        Self {
            source,
            endpoints,
            cancel,
        }
    }

    /// Scan `game`'s leaderboard for `username`'s row and the threshold.
    pub async fn scan(&self, game: &PlayedGame, username: &str) -> Result<ScanResult, PipelineError> {
        let mut state = ScanState::new();
        let mut page_number = 0u32;

        while !state.is_complete() {
            self.cancel.check().await?;
            page_number += 1;

            let url = self.endpoints.leaderboard(&game.id, page_number);
            let html = self.source.fetch_text(&url, Freshness::Cached).await?;
            let page = parse_leaderboard(&html);

            debug!(
                "{} leaderboard page {}: {} rows",
                game.name,
                page_number,
                page.len()
            );
            state.observe(page_number, &page, username);
        }

        let result = state.into_result();
        info!(
            "{}: rank {} ({} plays), GHI {}, {} pages",
            game.name,
            result.standing.rank(),
            result.standing.plays(),
            result.ghi,
            result.pages_fetched
        );
        Ok(result)
    }
}
