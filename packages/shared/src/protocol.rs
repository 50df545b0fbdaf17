//! Wire protocol.
//!
//! Every frame is a JSON object discriminated by its `type` field. Clients send
//! [`ClientMessage`]s, the hub answers with [`ServerMessage`]s.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while turning frames into messages and back.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame is not valid JSON or does not match any known message.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Public view of one participant, as carried by `welcome` and `join`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
    pub x: f64,
    pub y: f64,
}

/// Client → server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Move { x: f64, y: f64 },
    Chat { text: String },
}

/// Server → client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Sent once to a newcomer: its own identity plus everyone already present.
    Welcome {
        id: String,
        name: String,
        x: f64,
        y: f64,
        users: Vec<UserInfo>,
    },
    Join {
        id: String,
        name: String,
        x: f64,
        y: f64,
    },
    Moved {
        id: String,
        x: f64,
        y: f64,
    },
    Leave {
        id: String,
    },
    Chatted {
        id: String,
        text: String,
    },
}

impl ClientMessage {
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(frame)?)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl ServerMessage {
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(frame)?)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Build a `join` announcement from a participant view.
    pub fn join(user: &UserInfo) -> Self {
        ServerMessage::Join {
            id: user.id.clone(),
            name: user.name.clone(),
            x: user.x,
            y: user.y,
        }
    }
}
