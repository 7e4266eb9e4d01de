//! BoardGameGeek specifics.
//!
//! Everything that depends on the site's URLs and markup lives here so a
//! redesign on their end touches a single module:
//! - `endpoints`: URL construction for the three outbound request kinds
//! - `export`: classification of the collection export XML
//! - `pages`: games-played and leaderboard HTML parsing
//! - `username`: username normalization policy

pub mod endpoints;
pub mod export;
pub mod pages;
pub mod username;

#[cfg(test)]
pub(crate) mod fixtures;

use thiserror::Error;

pub use endpoints::{Endpoints, LEADERBOARD_PAGE_SIZE};
pub use export::{classify_export, ExportStatus};
pub use pages::{
    parse_games_played, parse_leaderboard, GamesPlayedContent, GamesPlayedPage, LeaderboardPage,
    LeaderboardRow,
};

/// Errors raised when a fetched document lacks an expected structure.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("No data table and no empty-results marker on {0} page")]
    MissingTable(&'static str),

    #[error("Row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },
}
