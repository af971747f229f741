//! Server network layer handling WebSocket connections and the room's event loop

use crate::broadcast::{ClientConnection, ConnectionSet, SEND_QUEUE_CAPACITY};
use crate::config::ServerConfig;
use crate::router::{parse_client_event, route};
use crate::session::{Outcome, Session};
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use neon_shared::{RejectedPayload, ServerEvent, WelcomePayload};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

/// Messages sent from connection and timer tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    Connected {
        connection: ClientConnection,
    },
    FrameReceived {
        connection_id: String,
        text: String,
    },
    Disconnected {
        connection_id: String,
    },
    /// A post-hit delay elapsed
    AdvanceRound {
        epoch: u64,
    },
    Shutdown,
}

/// Main server owning the room session and every live connection
///
/// Socket tasks never touch game state. They forward what they read as
/// [`ServerMessage`]s, and `run` applies them one at a time.
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    session: Session,
    connections: ConnectionSet,
    max_clients: usize,
    /// Bumped whenever a pending round advance becomes stale
    timer_epoch: u64,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn new(config: &ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        config.validate()?;

        let listener = TcpListener::bind(config.address()).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {}", local_addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Some(listener),
            local_addr,
            session: Session::new(config.session_config()),
            connections: ConnectionSet::new(),
            max_clients: config.max_clients,
            timer_epoch: 0,
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Channel into the event loop, e.g. to request shutdown
    pub fn sender(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns task that accepts sockets and hands each to its own task
    fn spawn_acceptor(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        tokio::spawn(run_connection(stream, addr, server_tx.clone()));
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }

                if server_tx.is_closed() {
                    break;
                }
            }
        });
    }

    /// Spawns task that fires the next round after `delay`
    fn schedule_advance(&mut self, delay: Duration) {
        self.timer_epoch += 1;
        let epoch = self.timer_epoch;
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = server_tx.send(ServerMessage::AdvanceRound { epoch });
        });
    }

    /// Broadcasts notifications and arms or cancels the round timer
    fn apply(&mut self, outcome: Outcome) {
        if outcome.cancel_pending_advance {
            self.timer_epoch += 1;
        }

        let mut released = self.connections.dispatch(outcome.notifications);

        // A released socket can stay open with its writer stalled, so no
        // disconnect would ever arrive for it
        while let Some(id) = released.pop() {
            warn!("Removing lagging connection {} from the room", id);
            let departure = self.session.disconnect(&id);
            released.extend(self.connections.dispatch(departure.notifications));
        }

        if let Some(delay) = outcome.advance_after {
            self.schedule_advance(delay);
        }
    }

    fn handle_connect(&mut self, mut connection: ClientConnection) {
        if self.connections.len() >= self.max_clients {
            warn!("Rejecting connection {}: server full", connection.id);
            let rejected = ServerEvent::Rejected(RejectedPayload {
                reason: "Server full".to_string(),
            });
            if let Ok(text) = rejected.encode() {
                connection.send(Arc::new(text));
            }
            // Dropping the handle closes the socket once the frame is flushed
            return;
        }

        let id = connection.id.clone();
        self.connections.insert(connection);
        self.connections.send_to(
            &id,
            &ServerEvent::Welcome(WelcomePayload {
                connection_id: id.clone(),
            }),
        );

        let outcome = self.session.connect(&id);
        self.apply(outcome);
    }

    fn handle_frame(&mut self, connection_id: &str, text: &str) {
        if !self.connections.contains(connection_id) {
            debug!("Dropping frame from inactive connection {}", connection_id);
            return;
        }

        match parse_client_event(text) {
            Ok(Some(event)) => {
                debug!("{} from {}", event.name(), connection_id);
                let outcome = route(&mut self.session, connection_id, event);
                self.apply(outcome);
            }
            Ok(None) => debug!("Ignoring unknown event from {}", connection_id),
            Err(e) => debug!("Dropping malformed frame from {}: {}", connection_id, e),
        }
    }

    fn handle_disconnect(&mut self, connection_id: &str) {
        self.connections.remove(connection_id);
        let outcome = self.session.disconnect(connection_id);
        self.apply(outcome);
    }

    fn handle_advance(&mut self, epoch: u64) {
        if epoch != self.timer_epoch {
            debug!("Discarding stale round timer {}", epoch);
            return;
        }

        let outcome = self.session.advance_round();
        self.apply(outcome);
    }

    /// Main server loop applying socket and timer events in arrival order
    pub async fn run(mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.spawn_acceptor();
        info!("Server started successfully");

        while let Some(message) = self.server_rx.recv().await {
            match message {
                ServerMessage::Connected { connection } => self.handle_connect(connection),
                ServerMessage::FrameReceived {
                    connection_id,
                    text,
                } => self.handle_frame(&connection_id, &text),
                ServerMessage::Disconnected { connection_id } => {
                    self.handle_disconnect(&connection_id)
                }
                ServerMessage::AdvanceRound { epoch } => self.handle_advance(epoch),
                ServerMessage::Shutdown => {
                    info!("Server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Drives one socket from handshake to close
///
/// Reads are forwarded to the event loop in order; writes come from the
/// connection's queue. The socket closes when either side goes away.
async fn run_connection(
    stream: TcpStream,
    addr: SocketAddr,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake with {} failed: {}", addr, e);
            return;
        }
    };

    let connection_id = Uuid::new_v4().simple().to_string();
    info!("Connection {} opened from {}", connection_id, addr);

    let (mut ws_tx, mut ws_rx) = ws.split();
    let (send_tx, mut send_rx) = mpsc::channel::<Arc<String>>(SEND_QUEUE_CAPACITY);

    let connection = ClientConnection::new(connection_id.clone(), send_tx);
    if server_tx
        .send(ServerMessage::Connected { connection })
        .is_err()
    {
        return;
    }

    let writer_id = connection_id.clone();
    tokio::spawn(async move {
        while let Some(frame) = send_rx.recv().await {
            if let Err(e) = ws_tx.send(Message::Text(frame.to_string().into())).await {
                debug!("Write to connection {} failed: {}", writer_id, e);
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    while let Some(message) = ws_rx.next().await {
        match message {
            Ok(Message::Text(text)) => {
                let forwarded = server_tx.send(ServerMessage::FrameReceived {
                    connection_id: connection_id.clone(),
                    text: text.to_string(),
                });
                if forwarded.is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Error reading from connection {}: {}", connection_id, e);
                break;
            }
        }
    }

    info!("Connection {} closed", connection_id);
    let _ = server_tx.send(ServerMessage::Disconnected { connection_id });
}
