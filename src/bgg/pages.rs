//! HTML page parsing for the games-played listing and the all-time plays
//! leaderboard.
//!
//! Both pages render their data in `table.forum_table`; row 0 of every such
//! table is a header and is never treated as data.

use scraper::{ElementRef, Html, Selector};

use super::endpoints::LEADERBOARD_PAGE_SIZE;
use super::username::{username_from_profile_href, usernames_match};
use super::ParseError;
use crate::models::PlayedGame;

// ── Games played ────────────────────────────────────────────────────────────

/// Data half of a games-played page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GamesPlayedContent {
    /// The empty-results marker: there are no more pages.
    Exhausted,

    /// Games listed on this page, in page order.
    Games(Vec<PlayedGame>),
}

/// One parsed page of a user's games-played listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GamesPlayedPage {
    /// Username as the site renders it in the page heading.
    pub heading_username: Option<String>,

    pub content: GamesPlayedContent,
}

/// Parse one games-played page.
///
/// The heading (`h2 a`) carries the canonical username. A `.messagebox`
/// marks the end of the listing; otherwise the second `.forum_table` holds
/// one game per row, linked as `/boardgame/{id}/{slug}`.
pub fn parse_games_played(html: &str) -> Result<GamesPlayedPage, ParseError> {
    let document = Html::parse_document(html);

    let heading_sel = Selector::parse("h2 a").unwrap();
    let marker_sel = Selector::parse(".messagebox").unwrap();
    let table_sel = Selector::parse(".forum_table").unwrap();
    let row_sel = Selector::parse("tr").unwrap();
    let cell_sel = Selector::parse("td").unwrap();
    let link_sel = Selector::parse("a[href]").unwrap();

    let heading_username = document
        .select(&heading_sel)
        .next()
        .map(|a| element_text(&a))
        .filter(|name| !name.is_empty());

    if document.select(&marker_sel).next().is_some() {
        return Ok(GamesPlayedPage {
            heading_username,
            content: GamesPlayedContent::Exhausted,
        });
    }

    let table = document
        .select(&table_sel)
        .nth(1)
        .ok_or(ParseError::MissingTable("games-played"))?;

    let mut games = Vec::new();
    for (row_index, row) in table.select(&row_sel).enumerate().skip(1) {
        let link = row
            .select(&cell_sel)
            .next()
            .and_then(|cell| cell.select(&link_sel).next())
            .ok_or_else(|| ParseError::MalformedRow {
                row: row_index,
                reason: "no game link in first cell".to_string(),
            })?;

        let href = link.value().attr("href").unwrap_or_default();
        let id = href
            .split('/')
            .nth(2)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ParseError::MalformedRow {
                row: row_index,
                reason: format!("cannot read game id from {:?}", href),
            })?;

        games.push(PlayedGame::new(id, element_text(&link)));
    }

    Ok(GamesPlayedPage {
        heading_username,
        content: GamesPlayedContent::Games(games),
    })
}

// ── Leaderboard ─────────────────────────────────────────────────────────────

/// One data row of a leaderboard page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardRow {
    /// 1-based position within the page (the header is position 0).
    pub position: usize,

    /// Text of the play-count link in the second cell.
    pub play_count: String,

    /// Text of the `.lf` cell, used when this row is the user's.
    pub user_plays: String,

    /// Usernames linked from the row (profile href segment and link text).
    pub profile_names: Vec<String>,
}

impl LeaderboardRow {
    /// Play count as a number. Thousands separators are ignored; anything
    /// else non-numeric yields `None`.
    pub fn play_count_value(&self) -> Option<u64> {
        parse_play_count(&self.play_count)
    }
}

/// One parsed page of a game's all-time plays leaderboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaderboardPage {
    rows: Vec<LeaderboardRow>,
}

impl LeaderboardPage {
    pub fn new(rows: Vec<LeaderboardRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[LeaderboardRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// A short page is the end of the table.
    pub fn is_last(&self) -> bool {
        self.rows.len() < LEADERBOARD_PAGE_SIZE
    }

    /// Row at a 1-based position within the page.
    pub fn row_at(&self, position: usize) -> Option<&LeaderboardRow> {
        self.rows.iter().find(|row| row.position == position)
    }

    /// First row linking to `username`.
    pub fn find_user(&self, username: &str) -> Option<&LeaderboardRow> {
        self.rows.iter().find(|row| {
            row.profile_names
                .iter()
                .any(|name| usernames_match(name, username))
        })
    }
}

/// Parse one leaderboard page. A page without a `.forum_table` has no rows.
pub fn parse_leaderboard(html: &str) -> LeaderboardPage {
    let document = Html::parse_document(html);

    let table_sel = Selector::parse(".forum_table").unwrap();
    let row_sel = Selector::parse("tr").unwrap();
    let cell_sel = Selector::parse("td, th").unwrap();
    let link_sel = Selector::parse("a").unwrap();
    let profile_sel = Selector::parse(r#"a[href^="/user/"]"#).unwrap();

    let Some(table) = document.select(&table_sel).next() else {
        return LeaderboardPage::default();
    };

    let rows = table
        .select(&row_sel)
        .enumerate()
        .skip(1)
        .map(|(position, row)| {
            let cells: Vec<ElementRef> = row.select(&cell_sel).collect();

            let play_count = cells
                .get(1)
                .map(|cell| match cell.select(&link_sel).next() {
                    Some(link) => element_text(&link),
                    None => element_text(cell),
                })
                .unwrap_or_default();

            let user_plays = cells
                .iter()
                .find(|cell| cell.value().classes().any(|class| class == "lf"))
                .map(element_text)
                .unwrap_or_else(|| play_count.clone());

            let mut profile_names = Vec::new();
            for link in row.select(&profile_sel) {
                if let Some(name) = link
                    .value()
                    .attr("href")
                    .and_then(username_from_profile_href)
                {
                    profile_names.push(name);
                }
                let text = element_text(&link);
                if !text.is_empty() {
                    profile_names.push(text);
                }
            }

            LeaderboardRow {
                position,
                play_count,
                user_plays,
                profile_names,
            }
        })
        .collect();

    LeaderboardPage { rows }
}

/// Parse a rendered play count such as `1,204`.
pub fn parse_play_count(text: &str) -> Option<u64> {
    let digits: String = text.trim().chars().filter(|c| *c != ',').collect();
    digits.parse().ok()
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bgg::fixtures::{games_played_html, leaderboard_html, no_more_games_html};
    use crate::models::GameId;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_games_played_page() {
        let html = games_played_html(
            "MeepleMaster",
            &[("13", "Catan"), ("822", "Carcassonne")],
        );
        let page = parse_games_played(&html).unwrap();

        assert_eq!(page.heading_username.as_deref(), Some("MeepleMaster"));
        assert_eq!(
            page.content,
            GamesPlayedContent::Games(vec![
                PlayedGame::new("13", "Catan"),
                PlayedGame::new("822", "Carcassonne"),
            ])
        );
    }

    #[test]
    fn test_parse_games_played_trims_names() {
        let html = r#"
        <html><body>
        <h2>Plays by <a href="/user/alice"> alice </a></h2>
        <table class="forum_table"><tr><td>filters</td></tr></table>
        <table class="forum_table">
            <tr><th>Game</th><th>Plays</th></tr>
            <tr><td><a href="/boardgame/30549/pandemic">
                Pandemic
            </a></td><td>12</td></tr>
        </table>
        </body></html>"#;

        let page = parse_games_played(html).unwrap();
        assert_eq!(page.heading_username.as_deref(), Some("alice"));
        assert_eq!(
            page.content,
            GamesPlayedContent::Games(vec![PlayedGame::new("30549", "Pandemic")])
        );
    }

    #[test]
    fn test_parse_games_played_exhausted() {
        let page = parse_games_played(&no_more_games_html("MeepleMaster")).unwrap();

        assert_eq!(page.content, GamesPlayedContent::Exhausted);
        assert_eq!(page.heading_username.as_deref(), Some("MeepleMaster"));
    }

    #[test]
    fn test_parse_games_played_missing_table() {
        let html = "<html><body><h2>Plays</h2><p>Something changed</p></body></html>";
        assert!(matches!(
            parse_games_played(html),
            Err(ParseError::MissingTable(_))
        ));
    }

    #[test]
    fn test_parse_games_played_row_without_link() {
        let html = r#"
        <table class="forum_table"><tr><td>filters</td></tr></table>
        <table class="forum_table">
            <tr><th>Game</th></tr>
            <tr><td>Mystery game</td></tr>
        </table>"#;

        assert!(matches!(
            parse_games_played(html),
            Err(ParseError::MalformedRow { row: 1, .. })
        ));
    }

    #[test]
    fn test_parse_leaderboard_rows() {
        let html = leaderboard_html(1, &[("alice", 52), ("MeepleMaster", 40), ("bob", 3)]);
        let page = parse_leaderboard(&html);

        assert_eq!(page.len(), 3);
        assert!(page.is_last());

        let first = page.row_at(1).unwrap();
        assert_eq!(first.play_count, "52");
        assert_eq!(first.play_count_value(), Some(52));
        assert!(first.profile_names.contains(&"alice".to_string()));

        assert_eq!(page.row_at(3).unwrap().user_plays, "3");
        assert!(page.row_at(4).is_none());
    }

    #[test]
    fn test_find_user_is_case_insensitive() {
        let html = leaderboard_html(1, &[("alice", 52), ("MeepleMaster", 40)]);
        let page = parse_leaderboard(&html);

        let row = page.find_user("meeplemaster").unwrap();
        assert_eq!(row.position, 2);
        assert_eq!(row.user_plays, "40");
        assert!(page.find_user("carol").is_none());
    }

    #[test]
    fn test_find_user_by_link_text() {
        let html = r#"
        <table class="forum_table">
            <tr><th>Rank</th><th>Plays</th><th>User</th></tr>
            <tr><td>1</td><td class="lf"><a href="/plays/thing/13?userid=7">9</a></td>
                <td><a href="/user/7">Board Gamer</a></td></tr>
        </table>"#;

        let page = parse_leaderboard(html);
        assert_eq!(page.find_user("board gamer").unwrap().position, 1);
    }

    #[test]
    fn test_parse_leaderboard_without_table() {
        let page = parse_leaderboard("<html><body>No plays recorded.</body></html>");
        assert!(page.is_empty());
        assert!(page.is_last());
    }

    #[test]
    fn test_full_page_is_not_last() {
        let players: Vec<(String, u64)> = (0..100).map(|i| (format!("user{}", i), 500)).collect();
        let refs: Vec<(&str, u64)> = players.iter().map(|(n, p)| (n.as_str(), *p)).collect();
        let page = parse_leaderboard(&leaderboard_html(1, &refs));

        assert_eq!(page.len(), 100);
        assert!(!page.is_last());
        assert_eq!(page.row_at(100).unwrap().position, 100);
    }

    #[test]
    fn test_parse_play_count() {
        assert_eq!(parse_play_count("17"), Some(17));
        assert_eq!(parse_play_count(" 1,204 "), Some(1204));
        assert_eq!(parse_play_count(""), None);
        assert_eq!(parse_play_count("n/a"), None);
    }

    #[test]
    fn test_games_keep_ids_as_text() {
        let html = games_played_html("u", &[("0042", "Leading Zeros")]);
        match parse_games_played(&html).unwrap().content {
            GamesPlayedContent::Games(games) => assert_eq!(games[0].id, GameId::from("0042")),
            other => panic!("Expected games, got {:?}", other),
        }
    }
}
