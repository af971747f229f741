//! Inbound event routing
//!
//! Decodes client frames against a fixed schema per event and maps each
//! event onto exactly one session operation. Malformed frames are rejected
//! here and never reach the session; unknown event names are ignored.

use crate::session::{Outcome, Session};
use neon_shared::{events, ClientEvent, Frame, ProtocolError};
use serde::Deserialize;

/// `game:hit` accepts either the bare target id or `{ "targetId": ... }`
#[derive(Deserialize)]
#[serde(untagged)]
enum HitPayload {
    Bare(String),
    Object {
        #[serde(rename = "targetId")]
        target_id: String,
    },
}

/// `player:join` accepts either the bare name or `{ "name": ... }`
#[derive(Deserialize)]
#[serde(untagged)]
enum JoinPayload {
    Bare(String),
    Object { name: String },
}

/// Parses one inbound text frame
///
/// Returns `Ok(None)` for event names this server does not handle.
pub fn parse_client_event(text: &str) -> Result<Option<ClientEvent>, ProtocolError> {
    let frame = Frame::parse(text)?;
    let event_name = frame.event.clone();

    let event = match event_name.as_str() {
        events::PLAYER_JOIN => {
            let name = match frame.payload::<JoinPayload>()? {
                JoinPayload::Bare(name) | JoinPayload::Object { name } => name,
            };
            ClientEvent::Join { name }
        }
        events::GAME_START => ClientEvent::Start,
        events::GAME_HIT => {
            let target_id = match frame.payload::<HitPayload>()? {
                HitPayload::Bare(id) | HitPayload::Object { target_id: id } => id,
            };
            if target_id.is_empty() {
                return Err(ProtocolError::InvalidPayload {
                    event: event_name,
                    reason: "empty target id".to_string(),
                });
            }
            ClientEvent::Hit { target_id }
        }
        _ => return Ok(None),
    };

    Ok(Some(event))
}

/// Applies a decoded event from `connection_id` to the session
pub fn route(session: &mut Session, connection_id: &str, event: ClientEvent) -> Outcome {
    match event {
        ClientEvent::Join { name } => session.join(connection_id, &name),
        ClientEvent::Start => session.start(),
        ClientEvent::Hit { target_id } => session.hit(connection_id, &target_id),
    }
}
