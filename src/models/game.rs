//! Played games and the owned-item set.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// An opaque BoardGameGeek item identifier (the numeric `objectid`).
///
/// Kept as text: the site only ever hands it back to us inside URLs and
/// export attributes, and we never do arithmetic on it.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GameId({})", self.0)
    }
}

impl From<String> for GameId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for GameId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A game the user has logged plays for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayedGame {
    pub id: GameId,
    pub name: String,
}

impl PlayedGame {
    pub fn new(id: impl Into<GameId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Identifiers of the items a user marks as owned.
///
/// Built once from the collection export and only queried afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnedSet {
    ids: HashSet<GameId>,
}

impl OwnedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &GameId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<GameId> for OwnedSet {
    fn from_iter<I: IntoIterator<Item = GameId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_id_display() {
        let id = GameId::new("13");
        assert_eq!(id.to_string(), "13");
        assert_eq!(format!("{:?}", id), "GameId(13)");
    }

    #[test]
    fn test_game_id_serializes_as_plain_string() {
        let game = PlayedGame::new("822", "Carcassonne");
        let json = serde_json::to_string(&game).unwrap();
        assert_eq!(json, r#"{"id":"822","name":"Carcassonne"}"#);
    }

    #[test]
    fn test_owned_set_membership() {
        let owned: OwnedSet = ["13", "822"].into_iter().map(GameId::from).collect();

        assert_eq!(owned.len(), 2);
        assert!(owned.contains(&GameId::from("13")));
        assert!(!owned.contains(&GameId::from("30549")));
    }

    #[test]
    fn test_owned_set_deduplicates() {
        let owned: OwnedSet = ["13", "13"].into_iter().map(GameId::from).collect();
        assert_eq!(owned.len(), 1);
    }

    #[test]
    fn test_owned_set_empty() {
        let owned = OwnedSet::new();
        assert!(owned.is_empty());
        assert!(!owned.contains(&GameId::from("13")));
    }
}
