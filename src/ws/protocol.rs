//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::{Board, Mark, Position};

/// String-to-string payload carried by every message
pub type Payload = BTreeMap<String, String>;

/// Message kinds, serialized by their variant name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    Login,
    LoginSuccess,
    GameSearchOn,
    GameSearchOff,
    GameSearchStart,
    GameOver,
    GameMove,
    GameMoved,
    GameWinner,
    GameDraw,
    MessageSend,
    MessageNew,
}

/// Decoded wire form: `{"type": "...", "payload": {...}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub payload: Payload,
}

impl Envelope {
    pub fn new(kind: MessageKind) -> Self {
        Self {
            kind,
            payload: Payload::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }

    fn field(&self, key: &'static str) -> Result<&str, ProtocolError> {
        self.payload
            .get(key)
            .map(String::as_str)
            .ok_or(ProtocolError::MissingField(key))
    }
}

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMsg {
    Login { username: String },
    GameSearchOn,
    GameSearchOff,
    GameOver,
    GameMove { position: Position },
    MessageSend { text: String },
}

impl ClientMsg {
    /// Parse a JSON text frame
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(text)?;
        Self::try_from(envelope)
    }
}

impl TryFrom<Envelope> for ClientMsg {
    type Error = ProtocolError;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        match envelope.kind {
            MessageKind::Login => Ok(ClientMsg::Login {
                username: envelope.payload.get("username").cloned().unwrap_or_default(),
            }),
            MessageKind::GameSearchOn => Ok(ClientMsg::GameSearchOn),
            MessageKind::GameSearchOff => Ok(ClientMsg::GameSearchOff),
            MessageKind::GameOver => Ok(ClientMsg::GameOver),
            MessageKind::GameMove => {
                let raw = envelope.field("position")?;
                let position =
                    Position::parse(raw).ok_or_else(|| ProtocolError::InvalidPosition(raw.to_string()))?;
                Ok(ClientMsg::GameMove { position })
            }
            MessageKind::MessageSend => Ok(ClientMsg::MessageSend {
                text: envelope.field("text")?.to_string(),
            }),
            other => Err(ProtocolError::UnexpectedKind(other)),
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMsg {
    LoginSuccess {
        user_id: Uuid,
        username: String,
    },
    /// Matchmaking for this user is over
    GameSearchOff,
    GameSearchStart {
        game_id: Uuid,
        cross_user_id: Uuid,
        zero_user_id: Uuid,
    },
    /// The opponent left or forfeited
    GameOver,
    GameMoved {
        board: Board,
    },
    GameWinner {
        winner: Mark,
    },
    GameDraw,
    /// Chat text, already escaped
    MessageNew {
        text: String,
    },
}

impl ServerMsg {
    pub fn to_envelope(&self) -> Envelope {
        match self {
            ServerMsg::LoginSuccess { user_id, username } => Envelope::new(MessageKind::LoginSuccess)
                .with("uuid", user_id.to_string())
                .with("username", username.clone()),
            ServerMsg::GameSearchOff => Envelope::new(MessageKind::GameSearchOff),
            ServerMsg::GameSearchStart {
                game_id,
                cross_user_id,
                zero_user_id,
            } => Envelope::new(MessageKind::GameSearchStart)
                .with("gameUUID", game_id.to_string())
                .with("crossUserUUID", cross_user_id.to_string())
                .with("zeroUserUUID", zero_user_id.to_string()),
            ServerMsg::GameOver => Envelope::new(MessageKind::GameOver),
            ServerMsg::GameMoved { board } => Envelope {
                kind: MessageKind::GameMoved,
                payload: board.to_payload(),
            },
            ServerMsg::GameWinner { winner } => {
                Envelope::new(MessageKind::GameWinner).with("winner", winner.as_str())
            }
            ServerMsg::GameDraw => Envelope::new(MessageKind::GameDraw),
            ServerMsg::MessageNew { text } => {
                Envelope::new(MessageKind::MessageNew).with("text", text.clone())
            }
        }
    }

    /// Serialize into a JSON text frame
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_envelope())
    }
}

/// Escape text for safe display in an HTML client
pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '\'' => escaped.push_str("&#39;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Reasons an inbound frame is dropped
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Message kind {0:?} is not accepted from clients")]
    UnexpectedKind(MessageKind),

    #[error("Missing payload field: {0}")]
    MissingField(&'static str),

    #[error("Invalid board position: {0:?}")]
    InvalidPosition(String),
}
