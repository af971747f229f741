//! Authoritative game state for the room
//!
//! The session owns membership, round progression, the live target and
//! scores. Each operation mutates state and returns an [`Outcome`]
//! describing what the rest of the server has to do: the notifications to
//! broadcast, and whether the next round should be scheduled after a delay.
//!
//! The session never performs I/O and never sleeps. It is driven by the
//! server's single event loop, which makes every operation linear. Hit
//! arbitration relies on that: the match-and-clear of the current target
//! happens in one step, so only the first hit on a target can succeed.

use crate::registry::ClientRegistry;
use crate::spawner::{SpawnBounds, TargetSpawner};
use log::{debug, info};
use neon_shared::{
    EndPayload, PlayerRoster, SpawnPayload, Target, DEFAULT_MAX_ROUNDS, NO_WINNER_NAME,
    RESPAWN_DELAY_MS,
};
use std::time::Duration;

/// Tunables for one room
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub max_rounds: u32,
    /// Pause between a successful hit and the next spawn
    pub respawn_delay: Duration,
    pub bounds: SpawnBounds,
    /// Fixed RNG seed; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            respawn_delay: Duration::from_millis(RESPAWN_DELAY_MS),
            bounds: SpawnBounds::default(),
            seed: None,
        }
    }
}

/// A state change the server must broadcast to every connection
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    PlayersUpdated(PlayerRoster),
    Spawned(SpawnPayload),
    Ended(EndPayload),
}

/// Result of a session operation
#[derive(Debug, Default, PartialEq)]
pub struct Outcome {
    pub notifications: Vec<Notification>,
    /// Run `advance_round` after this delay
    pub advance_after: Option<Duration>,
    /// Any advance scheduled before this operation is stale
    pub cancel_pending_advance: bool,
}

impl Outcome {
    fn notify(notification: Notification) -> Self {
        Self {
            notifications: vec![notification],
            ..Self::default()
        }
    }

    fn merge(&mut self, other: Outcome) {
        self.notifications.extend(other.notifications);
        if other.advance_after.is_some() {
            self.advance_after = other.advance_after;
        }
        self.cancel_pending_advance |= other.cancel_pending_advance;
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty() && self.advance_after.is_none() && !self.cancel_pending_advance
    }
}

/// The single game room
pub struct Session {
    config: SessionConfig,
    running: bool,
    round: u32,
    current_target: Option<Target>,
    registry: ClientRegistry,
    spawner: TargetSpawner,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let spawner = match config.seed {
            Some(seed) => TargetSpawner::from_seed(seed),
            None => TargetSpawner::new(),
        };

        Self {
            config,
            running: false,
            round: 0,
            current_target: None,
            registry: ClientRegistry::new(),
            spawner,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn max_rounds(&self) -> u32 {
        self.config.max_rounds
    }

    pub fn current_target(&self) -> Option<&Target> {
        self.current_target.as_ref()
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    /// Adds a freshly connected participant
    pub fn connect(&mut self, id: &str) -> Outcome {
        self.registry.register(id);
        self.players_updated()
    }

    /// Removes a participant. A live target stays up for everyone else.
    pub fn disconnect(&mut self, id: &str) -> Outcome {
        if !self.registry.remove(id) {
            return Outcome::default();
        }
        self.players_updated()
    }

    pub fn join(&mut self, id: &str, name: &str) -> Outcome {
        if !self.registry.rename(id, name) {
            return Outcome::default();
        }
        self.players_updated()
    }

    /// Starts a fresh game, discarding whatever game was in progress
    pub fn start(&mut self) -> Outcome {
        info!(
            "Starting game with {} players, {} rounds",
            self.registry.len(),
            self.config.max_rounds
        );

        self.running = true;
        self.round = 0;
        self.current_target = None;
        self.registry.reset_scores();

        let mut outcome = self.players_updated();
        outcome.cancel_pending_advance = true;
        outcome.merge(self.advance_round());
        self.check_invariants();
        outcome
    }

    /// Spawns the next target, or ends the game once the round limit is hit
    ///
    /// Does nothing when no game is running, so a delayed advance that fires
    /// after the game ended is harmless.
    pub fn advance_round(&mut self) -> Outcome {
        if !self.running {
            return Outcome::default();
        }

        if self.round >= self.config.max_rounds {
            return self.end();
        }

        self.round += 1;
        let target = self.spawner.spawn(&self.config.bounds);
        self.current_target = Some(target.clone());
        debug!("Round {}/{} target {}", self.round, self.config.max_rounds, target.id);

        self.check_invariants();
        Outcome::notify(Notification::Spawned(SpawnPayload {
            target,
            round: self.round,
            max_rounds: self.config.max_rounds,
        }))
    }

    /// Claims the live target for `id`
    ///
    /// Only a hit naming the current target while a game runs has any
    /// effect; late or stale hits are ignored.
    pub fn hit(&mut self, id: &str, target_id: &str) -> Outcome {
        if !self.running {
            return Outcome::default();
        }

        match &self.current_target {
            Some(target) if target.id == target_id => {}
            _ => return Outcome::default(),
        }

        self.current_target = None;
        if self.registry.award_point(id) {
            debug!("Target {} claimed by {}", target_id, id);
        } else {
            debug!("Target {} claimed by departed connection {}", target_id, id);
        }

        let mut outcome = self.players_updated();
        outcome.advance_after = Some(self.config.respawn_delay);
        self.check_invariants();
        outcome
    }

    /// Stops the game and announces the winner
    pub fn end(&mut self) -> Outcome {
        self.running = false;
        self.current_target = None;

        let result = self.winner();
        match &result.winner_id {
            Some(id) => info!("Game over after {} rounds, winner {} ({})", self.round, result.winner_name, id),
            None => info!("Game over after {} rounds, no winner", self.round),
        }

        self.check_invariants();
        Outcome::notify(Notification::Ended(result))
    }

    /// The participant holding the top score alone, if any
    ///
    /// A shared top score, an empty room and an all-zero scoreboard all
    /// produce no winner.
    pub fn winner(&self) -> EndPayload {
        let top = self.registry.all().into_iter().take(2).collect::<Vec<_>>();

        match top.as_slice() {
            [first, rest @ ..]
                if first.score > 0 && rest.first().map_or(true, |second| second.score < first.score) =>
            {
                EndPayload {
                    winner_id: Some(first.id.clone()),
                    winner_name: first.name.clone(),
                }
            }
            _ => EndPayload {
                winner_id: None,
                winner_name: NO_WINNER_NAME.to_string(),
            },
        }
    }

    fn players_updated(&self) -> Outcome {
        Outcome::notify(Notification::PlayersUpdated(self.registry.roster()))
    }

    fn check_invariants(&self) {
        debug_assert!(self.running || self.current_target.is_none());
        debug_assert!(self.round <= self.config.max_rounds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_session() -> Session {
        Session::new(SessionConfig {
            seed: Some(1),
            ..SessionConfig::default()
        })
    }

    fn session_with(ids: &[&str]) -> Session {
        let mut session = test_session();
        for id in ids {
            session.connect(id);
        }
        session
    }

    fn live_target_id(session: &Session) -> String {
        session.current_target().expect("no live target").id.clone()
    }

    fn score(session: &Session, id: &str) -> u32 {
        session.registry().get(id).map(|p| p.score).unwrap_or(0)
    }

    /// Plays rounds until the game ends, letting `hitter` pick who claims
    /// each target.
    fn play_out(session: &mut Session, mut hitter: impl FnMut(u32) -> Option<&'static str>) -> EndPayload {
        loop {
            let round = session.round();
            let target = live_target_id(session);
            if let Some(id) = hitter(round) {
                session.hit(id, &target);
            }
            let outcome = session.advance_round();
            if let Some(Notification::Ended(result)) = outcome.notifications.last() {
                return result.clone();
            }
        }
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = test_session();
        assert!(!session.is_running());
        assert_eq!(session.round(), 0);
        assert!(session.current_target().is_none());
        assert_eq!(session.max_rounds(), 15);
    }

    #[test]
    fn test_connect_broadcasts_roster() {
        let mut session = test_session();
        let outcome = session.connect("a");

        match outcome.notifications.as_slice() {
            [Notification::PlayersUpdated(roster)] => {
                assert_eq!(roster.len(), 1);
                assert_eq!(roster.get("a").unwrap().score, 0);
            }
            other => panic!("Unexpected notifications: {:?}", other),
        }
    }

    #[test]
    fn test_start_spawns_first_round() {
        let mut session = session_with(&["ana", "bo", "cy"]);
        for (id, name) in [("ana", "Ana"), ("bo", "Bo"), ("cy", "Cy")] {
            session.join(id, name);
        }

        let outcome = session.start();

        assert!(outcome.cancel_pending_advance);
        assert_eq!(outcome.advance_after, None);
        match outcome.notifications.as_slice() {
            [Notification::PlayersUpdated(roster), Notification::Spawned(spawn)] => {
                assert_eq!(roster.len(), 3);
                assert_eq!(spawn.round, 1);
                assert_eq!(spawn.max_rounds, 15);
                assert!((0.05..=0.95).contains(&spawn.target.x));
                assert!((0.15..=0.85).contains(&spawn.target.y));
                assert_eq!(Some(&spawn.target), session.current_target());
            }
            other => panic!("Unexpected notifications: {:?}", other),
        }
    }

    #[test]
    fn test_first_hit_wins_second_is_ignored() {
        let mut session = session_with(&["ana", "bo"]);
        session.start();
        let target = live_target_id(&session);

        let first = session.hit("ana", &target);
        let second = session.hit("bo", &target);

        assert_eq!(score(&session, "ana"), 1);
        assert_eq!(score(&session, "bo"), 0);
        assert!(session.current_target().is_none());
        assert_eq!(first.notifications.len(), 1);
        assert_eq!(first.advance_after, Some(Duration::from_millis(400)));
        assert!(second.is_empty());

        let next = session.advance_round();
        match next.notifications.as_slice() {
            [Notification::Spawned(spawn)] => {
                assert_eq!(spawn.round, 2);
                assert_ne!(spawn.target.id, target);
            }
            other => panic!("Unexpected notifications: {:?}", other),
        }
    }

    #[test]
    fn test_hit_with_stale_target_id() {
        let mut session = session_with(&["ana"]);
        session.start();
        let old = live_target_id(&session);
        session.hit("ana", &old);
        session.advance_round();

        let outcome = session.hit("ana", &old);
        assert!(outcome.is_empty());
        assert_eq!(score(&session, "ana"), 1);
        assert!(session.current_target().is_some());
    }

    #[test]
    fn test_hit_while_idle_is_ignored() {
        let mut session = session_with(&["ana"]);
        assert!(session.hit("ana", "anything").is_empty());
        assert_eq!(score(&session, "ana"), 0);
    }

    #[test]
    fn test_hit_from_departed_connection_still_clears_target() {
        let mut session = session_with(&["ana", "bo"]);
        session.start();
        let target = live_target_id(&session);
        session.disconnect("bo");

        let outcome = session.hit("bo", &target);
        assert!(session.current_target().is_none());
        assert_eq!(outcome.advance_after, Some(Duration::from_millis(400)));
        assert!(session.registry().get("bo").is_none());
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let mut session = session_with(&["ana", "bo"]);

        let first = session.disconnect("bo");
        let second = session.disconnect("bo");

        assert_eq!(first.notifications.len(), 1);
        assert!(second.is_empty());
        assert_eq!(session.registry().len(), 1);
    }

    #[test]
    fn test_join_unknown_connection_is_ignored() {
        let mut session = test_session();
        assert!(session.join("ghost", "Boo").is_empty());
        assert!(session.registry().is_empty());
    }

    #[test]
    fn test_join_blank_name_is_ignored() {
        let mut session = session_with(&["ana"]);
        assert!(session.join("ana", "   ").is_empty());
    }

    #[test]
    fn test_restart_resets_scores_and_round() {
        let mut session = session_with(&["ana", "bo"]);
        session.start();
        for _ in 0..4 {
            let target = live_target_id(&session);
            session.hit("ana", &target);
            session.advance_round();
        }
        assert_eq!(session.round(), 5);
        assert_eq!(score(&session, "ana"), 4);

        session.start();

        assert!(session.is_running());
        assert_eq!(session.round(), 1);
        assert_eq!(score(&session, "ana"), 0);
        assert_eq!(score(&session, "bo"), 0);
        assert!(session.current_target().is_some());
    }

    #[test]
    fn test_game_ends_after_max_rounds_with_unique_winner() {
        let mut session = session_with(&["ana", "bo"]);
        session.join("ana", "Ana");
        session.start();

        let result = play_out(&mut session, |round| Some(if round % 3 == 0 { "bo" } else { "ana" }));

        assert_eq!(result.winner_id.as_deref(), Some("ana"));
        assert_eq!(result.winner_name, "Ana");
        assert_eq!(session.round(), 15);
        assert!(!session.is_running());
        assert!(session.current_target().is_none());
    }

    #[test]
    fn test_tied_top_score_has_no_winner() {
        let mut session = session_with(&["ana", "bo", "cy"]);
        session.start();

        // 15 rounds: ana and bo alternate for 14, the last goes to cy
        let result = play_out(&mut session, |round| match round {
            15 => Some("cy"),
            r if r % 2 == 0 => Some("bo"),
            _ => Some("ana"),
        });

        assert_eq!(score(&session, "ana"), 7);
        assert_eq!(score(&session, "bo"), 7);
        assert_eq!(result.winner_id, None);
        assert_eq!(result.winner_name, NO_WINNER_NAME);
    }

    #[test]
    fn test_all_zero_scores_have_no_winner() {
        let mut session = session_with(&["ana"]);
        session.start();

        let result = play_out(&mut session, |_| None);
        assert_eq!(result.winner_id, None);
    }

    #[test]
    fn test_empty_room_game_ends_without_winner() {
        let mut session = test_session();
        session.start();

        let result = play_out(&mut session, |_| None);
        assert_eq!(result.winner_id, None);
        assert_eq!(result.winner_name, NO_WINNER_NAME);
    }

    #[test]
    fn test_departed_leader_is_not_winner() {
        let mut session = session_with(&["ana", "bo"]);
        session.start();

        for _ in 0..3 {
            let target = live_target_id(&session);
            session.hit("ana", &target);
            session.advance_round();
        }
        let target = live_target_id(&session);
        session.hit("bo", &target);
        session.advance_round();

        let outcome = session.disconnect("ana");
        match outcome.notifications.as_slice() {
            [Notification::PlayersUpdated(roster)] => {
                assert!(roster.get("ana").is_none());
                assert_eq!(roster.len(), 1);
            }
            other => panic!("Unexpected notifications: {:?}", other),
        }

        let result = play_out(&mut session, |_| None);
        assert_eq!(result.winner_id.as_deref(), Some("bo"));
    }

    #[test]
    fn test_advance_after_end_is_noop() {
        let mut session = session_with(&["ana"]);
        session.start();
        play_out(&mut session, |_| Some("ana"));

        let outcome = session.advance_round();
        assert!(outcome.is_empty());
        assert!(session.current_target().is_none());
        assert_eq!(session.round(), 15);
    }

    #[test]
    fn test_single_round_game() {
        let mut session = Session::new(SessionConfig {
            max_rounds: 1,
            seed: Some(3),
            ..SessionConfig::default()
        });
        session.connect("ana");
        session.start();

        let target = live_target_id(&session);
        session.hit("ana", &target);
        let outcome = session.advance_round();

        match outcome.notifications.as_slice() {
            [Notification::Ended(result)] => assert_eq!(result.winner_id.as_deref(), Some("ana")),
            other => panic!("Unexpected notifications: {:?}", other),
        }
    }

    #[test]
    fn test_invariants_hold_across_random_play() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let ids = ["a", "b", "c", "d"];
        let mut rng = StdRng::seed_from_u64(99);
        let mut session = test_session();

        for _ in 0..5_000 {
            let id = ids[rng.gen_range(0..ids.len())];
            match rng.gen_range(0..7) {
                0 => {
                    session.connect(id);
                }
                1 => {
                    session.disconnect(id);
                }
                2 => {
                    session.start();
                }
                3 => {
                    session.advance_round();
                }
                4 => {
                    if let Some(target) = session.current_target().cloned() {
                        session.hit(id, &target.id);
                    }
                }
                5 => {
                    session.hit(id, "stale");
                }
                _ => {
                    session.join(id, "Player");
                }
            }

            assert!(session.is_running() || session.current_target().is_none());
            assert!(session.round() <= session.max_rounds());
        }
    }
}
