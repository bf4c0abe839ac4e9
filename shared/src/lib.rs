use serde::{Deserialize, Serialize};
use std::fmt;

pub const PROTOCOL_VERSION: u32 = 1;
pub const DEFAULT_PORT: u16 = 25565;
pub const MAX_PACKET_SIZE: usize = 2048;
pub const KEEPALIVE_INTERVAL_MS: u64 = 1000;
pub const UNKNOWN_KICK_REASON: &str = "[unknown reason]";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect {
        protocol_version: u32,
        username: String,
        auth_mode: String,
    },
    KeepAlive {
        timestamp: u64,
    },
    Chat {
        text: String,
    },
    Control {
        flag: MotionFlag,
        state: bool,
    },
    Look {
        yaw: f32,
        pitch: f32,
    },
    Disconnect,

    Spawned {
        entity_id: u32,
    },
    KeepAliveAck {
        timestamp: u64,
    },
    ChatMessage {
        speaker: String,
        text: String,
    },
    PlayerJoined {
        username: String,
    },
    PlayerLeft {
        username: String,
    },
    Kicked {
        reason: KickReason,
    },
    Disconnected {
        reason: String,
    },
}

/// Movement-intention flags a player can hold down.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionFlag {
    Forward,
    Back,
    Left,
    Right,
    Jump,
    Sneak,
}

impl MotionFlag {
    pub const ALL: [MotionFlag; 6] = [
        MotionFlag::Forward,
        MotionFlag::Back,
        MotionFlag::Left,
        MotionFlag::Right,
        MotionFlag::Jump,
        MotionFlag::Sneak,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MotionFlag::Forward => "forward",
            MotionFlag::Back => "back",
            MotionFlag::Left => "left",
            MotionFlag::Right => "right",
            MotionFlag::Jump => "jump",
            MotionFlag::Sneak => "sneak",
        }
    }
}

impl fmt::Display for MotionFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason attached to a server-initiated kick.
///
/// Servers send either a plain line of text or a structured chat component
/// serialized as JSON. The JSON form is carried as raw text on the wire and
/// only interpreted when it is displayed.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum KickReason {
    Text(String),
    Json(String),
}

impl KickReason {
    /// Normalizes the reason into a single display line.
    ///
    /// Structured reasons are re-rendered as compact JSON; a payload that
    /// does not parse falls back to [`UNKNOWN_KICK_REASON`].
    pub fn display_text(&self) -> String {
        match self {
            KickReason::Text(text) => text.clone(),
            KickReason::Json(raw) => serde_json::from_str::<serde_json::Value>(raw)
                .map(|value| value.to_string())
                .unwrap_or_else(|_| UNKNOWN_KICK_REASON.to_string()),
        }
    }
}

impl fmt::Display for KickReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_text())
    }
}
