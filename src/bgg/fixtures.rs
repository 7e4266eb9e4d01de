//! HTML/XML builders mirroring the site's markup, for tests.

/// A leaderboard page with one row per `(username, plays)` pair.
pub fn leaderboard_html(page: u32, rows: &[(&str, u64)]) -> String {
    let mut html = String::from(
        r#"<html><body>
        <div class="plays-header">All-time plays</div>
        <table class="forum_table" cellpadding="2">
        <tr><th>Rank</th><th>Plays</th><th>User</th></tr>
        "#,
    );

    for (i, (user, plays)) in rows.iter().enumerate() {
        let rank = 100 * (page as usize - 1) + i + 1;
        html.push_str(&format!(
            r#"<tr><td>{rank}</td><td class="lf"><a href="/plays/thing/13?username={user}">{plays}</a></td><td><a href="/user/{user}">{user}</a></td></tr>
            "#
        ));
    }

    html.push_str("</table></body></html>");
    html
}

/// A leaderboard page for a game nobody has logged plays for.
pub fn empty_leaderboard_html() -> String {
    leaderboard_html(1, &[])
}

/// A games-played page listing `(id, name)` pairs.
pub fn games_played_html(username: &str, games: &[(&str, &str)]) -> String {
    let mut html = format!(
        r#"<html><body>
        <h2>Plays by Game: <a href="/user/{username}">{username}</a></h2>
        <table class="forum_table"><tr><td>Subtype: boardgame</td></tr></table>
        <table class="forum_table">
        <tr><th>Game</th><th>Plays</th></tr>
        "#
    );

    for (id, name) in games {
        let slug = name.to_lowercase().replace(' ', "-");
        html.push_str(&format!(
            r#"<tr><td><a href="/boardgame/{id}/{slug}">{name}</a></td><td>1</td></tr>
            "#
        ));
    }

    html.push_str("</table></body></html>");
    html
}

/// The games-played page past the end of the listing.
pub fn no_more_games_html(username: &str) -> String {
    format!(
        r#"<html><body>
        <h2>Plays by Game: <a href="/user/{username}">{username}</a></h2>
        <div class="messagebox">No plays found.</div>
        </body></html>"#
    )
}

pub fn pending_export_xml() -> String {
    r#"<?xml version="1.0" encoding="utf-8" standalone="yes" ?>
<message>
    Your request for this collection has been accepted and will be processed.  Please try again later for access.
</message>"#
        .to_string()
}

pub fn ready_export_xml(ids: &[&str]) -> String {
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="utf-8" standalone="yes" ?>
<items totalitems="{}">"#,
        ids.len()
    );
    for id in ids {
        xml.push_str(&format!(
            r#"<item objecttype="thing" objectid="{id}" subtype="boardgame"><status own="1"/></item>"#
        ));
    }
    xml.push_str("</items>");
    xml
}

pub fn unknown_user_xml() -> String {
    r#"<?xml version="1.0" encoding="utf-8" standalone="yes" ?>
<errors><error><message>Invalid username specified</message></error></errors>"#
        .to_string()
}
