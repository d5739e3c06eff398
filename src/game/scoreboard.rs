//! Per-player scores kept in join order

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ws::protocol::PlayerId;

/// Scores in first-seen order.
///
/// Serialized as a JSON object whose key order is the join order, which is
/// also the tie-break order for [`Scoreboard::leader`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scoreboard {
    entries: Vec<(PlayerId, u32)>,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a zero entry unless the player already has one
    pub fn ensure(&mut self, id: &PlayerId) {
        if self.position(id).is_none() {
            self.entries.push((id.clone(), 0));
        }
    }

    pub fn remove(&mut self, id: &PlayerId) -> Option<u32> {
        let idx = self.position(id)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn get(&self, id: &PlayerId) -> Option<u32> {
        self.position(id).map(|idx| self.entries[idx].1)
    }

    /// Add one point; returns false when the player has no entry
    pub fn increment(&mut self, id: &PlayerId) -> bool {
        match self.position(id) {
            Some(idx) => {
                self.entries[idx].1 += 1;
                true
            }
            None => false,
        }
    }

    /// Highest score, earliest entry wins ties. `None` only when empty.
    pub fn leader(&self) -> Option<&PlayerId> {
        let mut best: Option<(&PlayerId, u32)> = None;
        for (id, score) in &self.entries {
            match best {
                Some((_, top)) if *score <= top => {}
                _ => best = Some((id, *score)),
            }
        }
        best.map(|(id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PlayerId, u32)> {
        self.entries.iter().map(|(id, score)| (id, *score))
    }

    fn position(&self, id: &PlayerId) -> Option<usize> {
        self.entries.iter().position(|(entry, _)| entry == id)
    }
}

impl Serialize for Scoreboard {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, score) in &self.entries {
            map.serialize_entry(id, score)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Scoreboard {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScoreboardVisitor;

        impl<'de> Visitor<'de> for ScoreboardVisitor {
            type Value = Scoreboard;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of player id to score")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Scoreboard, A::Error> {
                let mut board = Scoreboard::new();
                while let Some((id, score)) = access.next_entry::<PlayerId, u32>()? {
                    match board.position(&id) {
                        Some(idx) => board.entries[idx].1 = score,
                        None => board.entries.push((id, score)),
                    }
                }
                Ok(board)
            }
        }

        deserializer.deserialize_map(ScoreboardVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> PlayerId {
        PlayerId::from(s)
    }

    #[test]
    fn leader_prefers_first_seen_on_ties() {
        let mut board = Scoreboard::new();
        board.ensure(&id("b"));
        board.ensure(&id("a"));
        assert_eq!(board.leader(), Some(&id("b")));

        board.increment(&id("a"));
        board.increment(&id("b"));
        assert_eq!(board.leader(), Some(&id("b")));

        board.increment(&id("a"));
        assert_eq!(board.leader(), Some(&id("a")));
    }

    #[test]
    fn empty_board_has_no_leader() {
        assert_eq!(Scoreboard::new().leader(), None);
    }

    #[test]
    fn ensure_keeps_existing_score() {
        let mut board = Scoreboard::new();
        board.ensure(&id("a"));
        board.increment(&id("a"));
        board.ensure(&id("a"));
        assert_eq!(board.get(&id("a")), Some(1));
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn increment_unknown_player_is_rejected() {
        let mut board = Scoreboard::new();
        assert!(!board.increment(&id("ghost")));
        assert!(board.is_empty());
    }

    #[test]
    fn serializes_in_join_order() {
        let mut board = Scoreboard::new();
        board.ensure(&id("zed"));
        board.ensure(&id("amy"));
        board.increment(&id("amy"));

        let json = serde_json::to_string(&board).unwrap();
        assert_eq!(json, r#"{"zed":0,"amy":1}"#);

        let back: Scoreboard = serde_json::from_str(&json).unwrap();
        assert_eq!(back.iter().next(), Some((&id("zed"), 0)));
        assert_eq!(back.get(&id("amy")), Some(1));
    }
}
