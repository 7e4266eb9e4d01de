//! URL construction for the site's collection export, games-played listing
//! and all-time plays leaderboard.

use url::Url;

use crate::fetch::FetchError;
use crate::models::GameId;

/// Rows per leaderboard page. A page with fewer rows is the last one.
pub const LEADERBOARD_PAGE_SIZE: usize = 100;

const DEFAULT_SITE: &str = "https://boardgamegeek.com";
const DEFAULT_EXPORT_SITE: &str = "https://www.boardgamegeek.com";

/// Base URLs for the HTML pages and the XML API.
#[derive(Debug, Clone)]
pub struct Endpoints {
    site: Url,
    export_site: Url,
}

impl Endpoints {
    /// Build endpoints from the HTML site base and the XML API base.
    pub fn new(site: &str, export_site: &str) -> Result<Self, FetchError> {
        Ok(Self {
            site: parse_base(site)?,
            export_site: parse_base(export_site)?,
        })
    }

    /// Collection export (owned items only).
    ///
    /// `/xmlapi2/collection?username={username}&own=1`
    pub fn collection_export(&self, username: &str) -> Url {
        let mut url = with_path(&self.export_site, &["xmlapi2", "collection"]);
        url.query_pairs_mut()
            .append_pair("username", username)
            .append_pair("own", "1");
        url
    }

    /// One page of the games a user has logged plays for.
    ///
    /// `/plays/bygame/user/{username}/subtype/boardgame/page/{page}`
    pub fn games_played(&self, username: &str, page: u32) -> Url {
        let page = page.to_string();
        with_path(
            &self.site,
            &[
                "plays", "bygame", "user", username, "subtype", "boardgame", "page", &page,
            ],
        )
    }

    /// One page of a game's all-time plays leaderboard.
    ///
    /// `/playstats/thing/{id}/page/{page}`
    pub fn leaderboard(&self, game: &GameId, page: u32) -> Url {
        let page = page.to_string();
        with_path(
            &self.site,
            &["playstats", "thing", game.as_str(), "page", &page],
        )
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            site: Url::parse(DEFAULT_SITE).expect("default site URL is valid"),
            export_site: Url::parse(DEFAULT_EXPORT_SITE).expect("default export URL is valid"),
        }
    }
}

fn parse_base(s: &str) -> Result<Url, FetchError> {
    let url = Url::parse(s.trim())
        .map_err(|e| FetchError::InvalidUrl(format!("Bad base URL {}: {}", s, e)))?;

    if url.cannot_be_a_base() {
        return Err(FetchError::InvalidUrl(format!(
            "Base URL cannot carry a path: {}",
            s
        )));
    }

    Ok(url)
}

/// Append percent-encoded path segments to a base URL.
fn with_path(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}
