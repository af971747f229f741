use crate::game::{ClientGameState, GameResult, StateChange};
use crate::stats::WinCounter;
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use neon_shared::{ClientEvent, ServerEvent};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How the client behaves once connected
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Display name sent with `player:join`
    pub name: Option<String>,
    /// Ask the server to start a game after joining
    pub start: bool,
    /// Tap every target automatically after `reaction`
    pub bot: bool,
    pub reaction: Duration,
    /// Tap the current target whenever a line is read from stdin
    pub keyboard: bool,
    /// Disconnect after the first game ends
    pub once: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            name: None,
            start: false,
            bot: false,
            reaction: Duration::from_millis(150),
            keyboard: false,
            once: false,
        }
    }
}

pub struct Client {
    ws: WsStream,
    options: ClientOptions,
    game_state: ClientGameState,
    wins: Option<WinCounter>,

    /// Target the bot will tap, and when
    pending_tap: Option<(String, Instant)>,
}

impl Client {
    pub async fn connect(
        server: &str,
        options: ClientOptions,
        wins: Option<WinCounter>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let url = server_url(server);
        info!("Connecting to {}", url);

        let (ws, _) = connect_async(url.as_str()).await?;

        Ok(Client {
            ws,
            options,
            game_state: ClientGameState::new(),
            wins,
            pending_tap: None,
        })
    }

    pub fn game_state(&self) -> &ClientGameState {
        &self.game_state
    }

    async fn send_event(&mut self, event: ClientEvent) -> Result<(), Box<dyn std::error::Error>> {
        let text = event.encode()?;
        debug!("Sending {}", event.name());
        self.ws.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn tap(&mut self, target_id: &str) -> Result<(), Box<dyn std::error::Error>> {
        if self.game_state.take_target(target_id).is_some() {
            self.send_event(ClientEvent::Hit {
                target_id: target_id.to_string(),
            })
            .await?;
        }
        Ok(())
    }

    /// Reacts to one decoded notification. Returns true once the client
    /// should stop.
    async fn handle_event(&mut self, event: ServerEvent) -> Result<bool, Box<dyn std::error::Error>> {
        match self.game_state.apply(event) {
            StateChange::Welcomed => {
                info!(
                    "Joined as {}",
                    self.game_state.my_id.as_deref().unwrap_or_default()
                );
                if let Some(name) = self.options.name.clone() {
                    self.send_event(ClientEvent::Join { name }).await?;
                }
                if self.options.start {
                    self.send_event(ClientEvent::Start).await?;
                }
            }
            StateChange::Rejected(reason) => {
                return Err(format!("Server rejected connection: {}", reason).into());
            }
            StateChange::RosterChanged => {
                for player in &self.game_state.players {
                    debug!("  {:<24} {}", player.name, player.score);
                }
            }
            StateChange::TargetSpawned(target) => {
                info!(
                    "Round {}/{}: target at ({:.2}, {:.2})",
                    self.game_state.round, self.game_state.max_rounds, target.x, target.y
                );
                if self.options.bot {
                    self.pending_tap = Some((target.id, Instant::now() + self.options.reaction));
                }
            }
            StateChange::GameOver(result) => {
                self.pending_tap = None;
                self.report_result(&result);
                return Ok(self.options.once);
            }
        }

        Ok(false)
    }

    fn report_result(&mut self, result: &GameResult) {
        match result {
            GameResult::Victory => {
                info!("You win!");
                if let Some(wins) = self.wins.as_mut() {
                    match wins.increment() {
                        Ok(total) => info!("Total wins: {}", total),
                        Err(e) => warn!("Failed to save win to {}: {}", wins.path().display(), e),
                    }
                }
            }
            GameResult::Defeat { winner_name } => info!("{} wins", winner_name),
            GameResult::Draw => info!("Game over: draw"),
        }
    }

    /// Runs until the server closes the socket, or until the first game
    /// ends when `once` is set. Returns the last game's result, if any.
    pub async fn run(&mut self) -> Result<Option<GameResult>, Box<dyn std::error::Error>> {
        let (tap_tx, mut tap_rx) = mpsc::unbounded_channel::<()>();
        if self.options.keyboard {
            info!("Press Enter to tap the target");
            spawn_keyboard_reader(tap_tx);
        } else {
            drop(tap_tx);
        }

        loop {
            let deadline = self
                .pending_tap
                .as_ref()
                .map(|(_, at)| *at)
                .unwrap_or_else(Instant::now);

            tokio::select! {
                message = self.ws.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            match ServerEvent::decode(text.as_str()) {
                                Ok(Some(event)) => {
                                    if self.handle_event(event).await? {
                                        break;
                                    }
                                }
                                Ok(None) => debug!("Ignoring unknown server event"),
                                Err(e) => warn!("Failed to decode server frame: {}", e),
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            info!("Server closed the connection");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            error!("Connection error: {}", e);
                            return Err(e.into());
                        }
                    }
                }
                _ = sleep_until(deadline), if self.pending_tap.is_some() => {
                    if let Some((target_id, _)) = self.pending_tap.take() {
                        self.tap(&target_id).await?;
                    }
                }
                Some(()) = tap_rx.recv(), if self.options.keyboard => {
                    if let Some(target) = self.game_state.target.clone() {
                        self.tap(&target.id).await?;
                    }
                }
            }
        }

        let _ = self.ws.close(None).await;
        Ok(self.game_state.result.clone())
    }
}

fn spawn_keyboard_reader(tap_tx: mpsc::UnboundedSender<()>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(_)) = lines.next_line().await {
            if tap_tx.send(()).is_err() {
                break;
            }
        }
    });
}

/// Accepts either a bare `host:port` or a `ws://` URL
pub fn server_url(server: &str) -> String {
    if server.starts_with("ws://") {
        server.to_string()
    } else {
        format!("ws://{}", server)
    }
}
