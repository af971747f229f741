//! Wire protocol shared by the Neon Tap server and client.
//!
//! Every message on the socket is a JSON text frame of the form
//! `{ "event": "<name>", "data": <payload> }`. Events without a payload
//! omit `data`. The event names mirror the ones the mobile clients already
//! speak, so the server stays wire-compatible with them.

use serde::de::{DeserializeOwned, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

pub const DEFAULT_MAX_ROUNDS: u32 = 15;
pub const RESPAWN_DELAY_MS: u64 = 400;
pub const TARGET_X_RANGE: (f64, f64) = (0.05, 0.95);
pub const TARGET_Y_RANGE: (f64, f64) = (0.15, 0.85);
/// Winner label announced when nobody holds the top score alone.
pub const NO_WINNER_NAME: &str = "Draw";
pub const MAX_NAME_CHARS: usize = 24;

/// Event names used on the wire.
pub mod events {
    pub const PLAYER_JOIN: &str = "player:join";
    pub const GAME_START: &str = "game:start";
    pub const GAME_HIT: &str = "game:hit";

    pub const UPDATE_PLAYERS: &str = "game:updatePlayers";
    pub const SPAWN: &str = "game:spawn";
    pub const END: &str = "game:end";
    pub const WELCOME: &str = "session:welcome";
    pub const REJECTED: &str = "session:rejected";
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed JSON frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event `{event}` requires a payload")]
    MissingPayload { event: String },
    #[error("event `{event}` has an invalid payload: {reason}")]
    InvalidPayload { event: String, reason: String },
}

/// Untyped envelope around every message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl Frame {
    pub fn new(event: &str, data: Value) -> Self {
        Self {
            event: event.to_string(),
            data,
        }
    }

    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_text(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes the payload into `T`, failing if it is absent or does not
    /// match the schema.
    pub fn payload<T: DeserializeOwned>(self) -> Result<T, ProtocolError> {
        let Frame { event, data } = self;
        if data.is_null() {
            return Err(ProtocolError::MissingPayload { event });
        }
        serde_json::from_value(data).map_err(|e| ProtocolError::InvalidPayload {
            event,
            reason: e.to_string(),
        })
    }
}

/// A tappable target in normalized screen coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub name: String,
    pub score: u32,
}

/// Snapshot of every participant, keyed by connection id.
///
/// Serialized as a JSON object whose key order is the roster order
/// (highest score first).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerRoster(pub Vec<(String, PlayerSummary)>);

impl PlayerRoster {
    pub fn get(&self, connection_id: &str) -> Option<&PlayerSummary> {
        self.0
            .iter()
            .find(|(id, _)| id == connection_id)
            .map(|(_, summary)| summary)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PlayerSummary)> {
        self.0.iter().map(|(id, summary)| (id.as_str(), summary))
    }
}

impl Serialize for PlayerRoster {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, summary) in &self.0 {
            map.serialize_entry(id, summary)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PlayerRoster {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RosterVisitor;

        impl<'de> Visitor<'de> for RosterVisitor {
            type Value = PlayerRoster;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of connection id to player summary")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((id, summary)) = access.next_entry::<String, PlayerSummary>()? {
                    entries.push((id, summary));
                }
                Ok(PlayerRoster(entries))
            }
        }

        deserializer.deserialize_map(RosterVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnPayload {
    pub target: Target,
    pub round: u32,
    pub max_rounds: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<String>,
    pub winner_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomePayload {
    pub connection_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedPayload {
    pub reason: String,
}

/// Intent sent by a client.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Join { name: String },
    Start,
    Hit { target_id: String },
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Join { .. } => events::PLAYER_JOIN,
            ClientEvent::Start => events::GAME_START,
            ClientEvent::Hit { .. } => events::GAME_HIT,
        }
    }

    pub fn to_frame(&self) -> Frame {
        let data = match self {
            ClientEvent::Join { name } => Value::String(name.clone()),
            ClientEvent::Start => Value::Null,
            ClientEvent::Hit { target_id } => Value::String(target_id.clone()),
        };
        Frame::new(self.name(), data)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        self.to_frame().to_text()
    }
}

/// Notification pushed by the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Welcome(WelcomePayload),
    Rejected(RejectedPayload),
    UpdatePlayers(PlayerRoster),
    Spawn(SpawnPayload),
    End(EndPayload),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Welcome(_) => events::WELCOME,
            ServerEvent::Rejected(_) => events::REJECTED,
            ServerEvent::UpdatePlayers(_) => events::UPDATE_PLAYERS,
            ServerEvent::Spawn(_) => events::SPAWN,
            ServerEvent::End(_) => events::END,
        }
    }

    pub fn to_frame(&self) -> Result<Frame, ProtocolError> {
        let data = match self {
            ServerEvent::Welcome(payload) => serde_json::to_value(payload)?,
            ServerEvent::Rejected(payload) => serde_json::to_value(payload)?,
            ServerEvent::UpdatePlayers(roster) => serde_json::to_value(roster)?,
            ServerEvent::Spawn(payload) => serde_json::to_value(payload)?,
            ServerEvent::End(payload) => serde_json::to_value(payload)?,
        };
        Ok(Frame::new(self.name(), data))
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        self.to_frame()?.to_text()
    }

    /// Parses a server frame. Unknown event names yield `Ok(None)`.
    pub fn decode(text: &str) -> Result<Option<Self>, ProtocolError> {
        let frame = Frame::parse(text)?;
        let name = frame.event.clone();
        let event = match name.as_str() {
            events::WELCOME => ServerEvent::Welcome(frame.payload()?),
            events::REJECTED => ServerEvent::Rejected(frame.payload()?),
            events::UPDATE_PLAYERS => ServerEvent::UpdatePlayers(frame.payload()?),
            events::SPAWN => ServerEvent::Spawn(frame.payload()?),
            events::END => ServerEvent::End(frame.payload()?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}
