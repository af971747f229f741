//! Participant membership for the game room
//!
//! This module tracks who is currently connected and what they are called:
//! - Participant lifecycle (register on connect, remove on disconnect)
//! - Display name changes requested by `player:join`
//! - Score bookkeeping driven by the session
//! - Ordered snapshots for `game:updatePlayers` broadcasts
//!
//! Every operation tolerates ids that are no longer registered, because a
//! rename or hit can legitimately arrive after its connection went away.

use log::info;
use neon_shared::{PlayerRoster, PlayerSummary, MAX_NAME_CHARS};
use std::collections::HashMap;

/// A connected player and their score in the current game
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    /// Connection identity supplied by the transport
    pub id: String,
    /// Name shown to every player
    pub name: String,
    /// Points scored in the current game
    pub score: u32,
    /// Registration order, used to break score ties
    pub seq: u64,
}

impl Participant {
    /// Creates a participant with a placeholder name derived from the id
    pub fn new(id: &str, seq: u64) -> Self {
        Self {
            id: id.to_string(),
            name: placeholder_name(id),
            score: 0,
            seq,
        }
    }

    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            name: self.name.clone(),
            score: self.score,
        }
    }
}

/// Builds the "Anon-xxxx" name given to players who have not joined yet
pub fn placeholder_name(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    let suffix: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("Anon-{}", suffix)
}

/// Trims a requested display name; returns None when nothing usable is left
pub fn sanitize_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_NAME_CHARS).collect())
}

/// Owns every participant in the room
///
/// The registry is mutated only by the session, which itself runs on the
/// server's single event loop, so no locking is needed here.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    participants: HashMap<String, Participant>,
    next_seq: u64,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection and returns its participant
    ///
    /// Registering an id twice keeps the existing participant untouched.
    pub fn register(&mut self, id: &str) -> Participant {
        if let Some(existing) = self.participants.get(id) {
            return existing.clone();
        }

        let participant = Participant::new(id, self.next_seq);
        self.next_seq += 1;

        info!("Participant {} registered as {}", id, participant.name);
        self.participants.insert(id.to_string(), participant.clone());
        participant
    }

    /// Changes a participant's display name
    ///
    /// Returns true if a name was applied. Unknown ids and blank names are
    /// ignored.
    pub fn rename(&mut self, id: &str, name: &str) -> bool {
        let Some(name) = sanitize_name(name) else {
            return false;
        };

        match self.participants.get_mut(id) {
            Some(participant) => {
                info!("Participant {} is now {}", id, name);
                participant.name = name;
                true
            }
            None => false,
        }
    }

    /// Removes a participant. Returns false if they were already gone.
    pub fn remove(&mut self, id: &str) -> bool {
        if let Some(participant) = self.participants.remove(id) {
            info!("Participant {} ({}) removed", id, participant.name);
            true
        } else {
            false
        }
    }

    /// Adds one point to a registered participant
    pub fn award_point(&mut self, id: &str) -> bool {
        if let Some(participant) = self.participants.get_mut(id) {
            participant.score += 1;
            true
        } else {
            false
        }
    }

    pub fn reset_scores(&mut self) {
        for participant in self.participants.values_mut() {
            participant.score = 0;
        }
    }

    pub fn get(&self, id: &str) -> Option<&Participant> {
        self.participants.get(id)
    }

    /// All participants, highest score first, ties in registration order
    pub fn all(&self) -> Vec<&Participant> {
        let mut all: Vec<&Participant> = self.participants.values().collect();
        all.sort_by(|a, b| b.score.cmp(&a.score).then(a.seq.cmp(&b.seq)));
        all
    }

    /// Wire snapshot used for `game:updatePlayers`
    pub fn roster(&self) -> PlayerRoster {
        PlayerRoster(
            self.all()
                .into_iter()
                .map(|p| (p.id.clone(), p.summary()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_assigns_placeholder_name() {
        let mut registry = ClientRegistry::new();
        let participant = registry.register("c0ffee42");

        assert_eq!(participant.name, "Anon-ee42");
        assert_eq!(participant.score, 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_placeholder_name_short_id() {
        assert_eq!(placeholder_name("ab"), "Anon-ab");
        assert_eq!(placeholder_name(""), "Anon-");
    }

    #[test]
    fn test_register_twice_keeps_state() {
        let mut registry = ClientRegistry::new();
        registry.register("a");
        registry.award_point("a");

        let again = registry.register("a");
        assert_eq!(again.score, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_rename() {
        let mut registry = ClientRegistry::new();
        registry.register("a");

        assert!(registry.rename("a", "  Ana  "));
        assert_eq!(registry.get("a").unwrap().name, "Ana");
    }

    #[test]
    fn test_rename_rejects_blank_names() {
        let mut registry = ClientRegistry::new();
        registry.register("a");
        let before = registry.get("a").unwrap().name.clone();

        assert!(!registry.rename("a", ""));
        assert!(!registry.rename("a", "   \t"));
        assert_eq!(registry.get("a").unwrap().name, before);
    }

    #[test]
    fn test_rename_caps_length() {
        let mut registry = ClientRegistry::new();
        registry.register("a");

        registry.rename("a", &"x".repeat(100));
        assert_eq!(registry.get("a").unwrap().name.chars().count(), MAX_NAME_CHARS);
    }

    #[test]
    fn test_rename_unknown_client() {
        let mut registry = ClientRegistry::new();
        assert!(!registry.rename("ghost", "Boo"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut registry = ClientRegistry::new();
        registry.register("a");

        assert!(registry.remove("a"));
        assert!(!registry.remove("a"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_award_point_unknown_client() {
        let mut registry = ClientRegistry::new();
        assert!(!registry.award_point("ghost"));
    }

    #[test]
    fn test_all_orders_by_score_then_join_order() {
        let mut registry = ClientRegistry::new();
        registry.register("a");
        registry.register("b");
        registry.register("c");
        registry.award_point("c");
        registry.award_point("c");
        registry.award_point("b");

        let ids: Vec<&str> = registry.all().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);

        registry.reset_scores();
        let ids: Vec<&str> = registry.all().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_roster_snapshot() {
        let mut registry = ClientRegistry::new();
        registry.register("a");
        registry.rename("a", "Ana");
        registry.award_point("a");

        let roster = registry.roster();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.get("a").unwrap().name, "Ana");
        assert_eq!(roster.get("a").unwrap().score, 1);
    }
}
