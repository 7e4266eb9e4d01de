//! # Play Ranks
//!
//! Resolves a BoardGameGeek user's position on the all-time play-count
//! leaderboard of every game they have logged plays for.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (played games, owned set, rank records)
//! - **bgg**: Source-site specifics (URLs, export XML, HTML page parsing)
//! - **fetch**: HTTP transport with caching, politeness delay and retries
//! - **pipeline**: Export polling, games-played pagination, leaderboard scanning
//! - **storage**: Result sinks (pipe-delimited report, JSONL)
//! - **config**: Configuration loading and validation

pub mod bgg;
pub mod config;
pub mod fetch;
pub mod models;
pub mod pipeline;
pub mod storage;

pub use models::*;

use std::time::Duration;

/// Parse a human-friendly duration string (e.g., "5s", "10m", "1h").
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('h') {
        (n, 3600)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else {
        // Default to seconds
        (s, 1)
    };

    let num: u64 = num_str.trim().parse().ok()?;
    Some(Duration::from_secs(num * multiplier))
}
