//! Username normalization.
//!
//! The site renders usernames with the capitalization the user registered,
//! while people type them however they like. Two names are the same user
//! when they are equal after trimming and lower-casing.

/// Normalized form used for all username comparisons.
pub fn normalize_username(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Whether two usernames refer to the same account.
pub fn usernames_match(a: &str, b: &str) -> bool {
    let a = normalize_username(a);
    !a.is_empty() && a == normalize_username(b)
}

/// Extract the username from a profile link such as `/user/Some%20Name`.
pub fn username_from_profile_href(href: &str) -> Option<String> {
    let rest = href.strip_prefix("/user/")?;
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let name = rest[..end].replace("%20", " ").replace('+', " ");

    if name.trim().is_empty() {
        None
    } else {
        Some(name)
    }
}
