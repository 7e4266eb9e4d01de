//! Games-played pagination.

use tracing::{debug, info, warn};

use super::{CancelFlag, PipelineError};
use crate::bgg::{parse_games_played, Endpoints, GamesPlayedContent};
use crate::fetch::{Freshness, PageSource};
use crate::models::PlayedGame;

/// A user's complete games-played listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GamesPlayed {
    /// Games in listing order (most recently played first)
    pub games: Vec<PlayedGame>,

    /// Username as the site renders it; leaderboard rows are matched on it
    pub canonical_username: String,

    pub pages_fetched: u32,
}

/// Walks a user's games-played pages until the empty-results marker.
pub struct GamesPlayedPaginator<'a> {
    source: &'a dyn PageSource,
    endpoints: &'a Endpoints,
    cancel: &'a CancelFlag,
}

impl<'a> GamesPlayedPaginator<'a> {
    pub fn new(source: &'a dyn PageSource, endpoints: &'a Endpoints, cancel: &'a CancelFlag) -> Self {
        Self {
            source,
            endpoints,
            cancel,
        }
    }

    /// Fetch pages 1, 2, ... in order until one carries the end marker.
    pub async fn collect(&self, username: &str) -> Result<GamesPlayed, PipelineError> {
        let mut games = Vec::new();
        let mut canonical_username = None;
        let mut page = 1u32;

        loop {
            self.cancel.check().await?;

            let url = self.endpoints.games_played(username, page);
            let html = self.source.fetch_text(&url, Freshness::Cached).await?;
            let parsed = parse_games_played(&html).map_err(|source| PipelineError::Parse {
                url: url.to_string(),
                source,
            })?;

            if page == 1 {
                canonical_username = parsed.heading_username;
            }

            match parsed.content {
                GamesPlayedContent::Exhausted => break,
                GamesPlayedContent::Games(page_games) => {
                    debug!("Games played page {}: {} games", page, page_games.len());
                    games.extend(page_games);
                }
            }

            page += 1;
        }

        let canonical_username = canonical_username.unwrap_or_else(|| {
            warn!(
                "No username heading on games-played page; matching leaderboards on {:?}",
                username
            );
            username.trim().to_string()
        });

        info!(
            "Got {} games played for {}",
            games.len(),
            canonical_username
        );

        Ok(GamesPlayed {
            games,
            canonical_username,
            pages_fetched: page,
        })
    }
}
