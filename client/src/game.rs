//! Client-side mirror of the room state, rebuilt from server notifications.

use log::debug;
use neon_shared::{EndPayload, ServerEvent, SpawnPayload, Target, DEFAULT_MAX_ROUNDS};

/// One row of the scoreboard
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerView {
    pub id: String,
    pub name: String,
    pub score: u32,
}

/// How the last game ended from this client's point of view
#[derive(Debug, Clone, PartialEq)]
pub enum GameResult {
    Victory,
    Defeat { winner_name: String },
    Draw,
}

/// What a server event changed locally
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    Welcomed,
    Rejected(String),
    RosterChanged,
    TargetSpawned(Target),
    GameOver(GameResult),
}

#[derive(Debug, Clone)]
pub struct ClientGameState {
    /// Our connection id, known once the server welcomes us
    pub my_id: Option<String>,
    /// Scoreboard, highest score first
    pub players: Vec<PlayerView>,
    pub target: Option<Target>,
    pub round: u32,
    pub max_rounds: u32,
    pub result: Option<GameResult>,
}

impl ClientGameState {
    pub fn new() -> Self {
        Self {
            my_id: None,
            players: Vec::new(),
            target: None,
            round: 0,
            max_rounds: DEFAULT_MAX_ROUNDS,
            result: None,
        }
    }

    pub fn apply(&mut self, event: ServerEvent) -> StateChange {
        match event {
            ServerEvent::Welcome(welcome) => {
                self.my_id = Some(welcome.connection_id);
                StateChange::Welcomed
            }
            ServerEvent::Rejected(rejected) => StateChange::Rejected(rejected.reason),
            ServerEvent::UpdatePlayers(roster) => {
                let mut players: Vec<PlayerView> = roster
                    .iter()
                    .map(|(id, summary)| PlayerView {
                        id: id.to_string(),
                        name: summary.name.clone(),
                        score: summary.score,
                    })
                    .collect();
                // Stable, so the server's tiebreak order survives
                players.sort_by(|a, b| b.score.cmp(&a.score));
                self.players = players;
                StateChange::RosterChanged
            }
            ServerEvent::Spawn(spawn) => self.apply_spawn(spawn),
            ServerEvent::End(end) => self.apply_end(end),
        }
    }

    fn apply_spawn(&mut self, spawn: SpawnPayload) -> StateChange {
        debug!("Round {}/{}: target {}", spawn.round, spawn.max_rounds, spawn.target.id);
        self.round = spawn.round;
        self.max_rounds = spawn.max_rounds;
        self.result = None;
        self.target = Some(spawn.target.clone());
        StateChange::TargetSpawned(spawn.target)
    }

    fn apply_end(&mut self, end: EndPayload) -> StateChange {
        self.target = None;

        let result = match end.winner_id {
            Some(winner) if self.my_id.as_deref() == Some(winner.as_str()) => GameResult::Victory,
            Some(_) => GameResult::Defeat {
                winner_name: end.winner_name,
            },
            None => GameResult::Draw,
        };

        self.result = Some(result.clone());
        StateChange::GameOver(result)
    }

    /// Removes the target locally once we tap it, as the server will
    /// replace it anyway
    pub fn take_target(&mut self, target_id: &str) -> Option<Target> {
        match &self.target {
            Some(target) if target.id == target_id => self.target.take(),
            _ => None,
        }
    }

    pub fn me(&self) -> Option<&PlayerView> {
        let my_id = self.my_id.as_deref()?;
        self.players.iter().find(|p| p.id == my_id)
    }
}

impl Default for ClientGameState {
    fn default() -> Self {
        Self::new()
    }
}
