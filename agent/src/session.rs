//! Session handle contract and the safe-call wrapper around it
//!
//! A [`Session`] is one connection attempt to a game server. The lifecycle
//! controller never calls it directly; every operation goes through
//! [`SessionSlot`], which turns calls against a closed, stale or absent
//! session into [`OpOutcome::Skipped`] instead of an error.

use log::debug;
use shared::{KickReason, MotionFlag};
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;

/// Where and as whom to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    pub host: String,
    pub port: u16,
    pub identity: String,
    pub auth_mode: String,
}

/// Error codes attached to a session `Error` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    ConnectionReset,
    TimedOut,
    Other(String),
}

impl ErrorCode {
    /// Returns true for the codes that force a reconnect cycle.
    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorCode::ConnectionReset | ErrorCode::TimedOut)
    }

    pub fn from_io_kind(kind: std::io::ErrorKind) -> Self {
        match kind {
            std::io::ErrorKind::ConnectionReset => ErrorCode::ConnectionReset,
            std::io::ErrorKind::TimedOut => ErrorCode::TimedOut,
            other => ErrorCode::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::ConnectionReset => f.write_str("ECONNRESET"),
            ErrorCode::TimedOut => f.write_str("ETIMEDOUT"),
            ErrorCode::Other(code) => f.write_str(code),
        }
    }
}

/// Lifecycle events emitted by a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Spawned,
    Chat { speaker: String, text: String },
    PlayerJoined(String),
    PlayerLeft(String),
    Error { code: ErrorCode, message: String },
    Disconnected,
    Kicked(KickReason),
}

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session is closed")]
    Closed,
    #[error("session I/O task is gone")]
    ChannelClosed,
    #[error("failed to encode packet: {0}")]
    Encode(#[from] bincode::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One live connection to the game server.
pub trait Session {
    /// True until the connection has ended or `close` was called.
    fn is_open(&self) -> bool;
    fn send_chat(&mut self, text: &str) -> Result<(), SessionError>;
    fn set_motion_flag(&mut self, flag: MotionFlag, state: bool) -> Result<(), SessionError>;
    fn set_orientation(&mut self, yaw: f32, pitch: f32) -> Result<(), SessionError>;
    /// Ends the connection. Calling it twice is a no-op.
    fn close(&mut self);
}

/// Creates sessions. Events of the new session are delivered on `events`.
pub trait Connector {
    type Session: Session;

    fn connect(
        &mut self,
        target: &ConnectTarget,
        events: EventSender,
    ) -> Result<Self::Session, SessionError>;
}

/// Result of an operation issued through [`SessionSlot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpOutcome {
    Applied,
    Skipped,
}

/// Holder for the (at most one) current session.
pub struct SessionSlot<S> {
    session: Option<S>,
}

impl<S: Session> SessionSlot<S> {
    pub fn new() -> Self {
        Self { session: None }
    }

    /// Stores a new session, closing whatever was held before.
    pub fn install(&mut self, session: S) {
        self.close();
        self.session = Some(session);
    }

    pub fn is_open(&self) -> bool {
        self.session.as_ref().map_or(false, |s| s.is_open())
    }

    pub fn chat(&mut self, text: &str) -> OpOutcome {
        self.guarded("chat", |s| s.send_chat(text))
    }

    pub fn set_motion_flag(&mut self, flag: MotionFlag, state: bool) -> OpOutcome {
        self.guarded("control", |s| s.set_motion_flag(flag, state))
    }

    pub fn set_orientation(&mut self, yaw: f32, pitch: f32) -> OpOutcome {
        self.guarded("look", |s| s.set_orientation(yaw, pitch))
    }

    /// Closes and drops the held session.
    ///
    /// Returns `Skipped` when the slot was empty.
    pub fn close(&mut self) -> OpOutcome {
        match self.session.take() {
            Some(mut session) => {
                if session.is_open() {
                    session.close();
                }
                OpOutcome::Applied
            }
            None => OpOutcome::Skipped,
        }
    }

    fn guarded<F>(&mut self, op: &str, f: F) -> OpOutcome
    where
        F: FnOnce(&mut S) -> Result<(), SessionError>,
    {
        let Some(session) = self.session.as_mut() else {
            return OpOutcome::Skipped;
        };
        if !session.is_open() {
            return OpOutcome::Skipped;
        }
        match f(session) {
            Ok(()) => OpOutcome::Applied,
            Err(e) => {
                debug!("Dropped {} on dead session: {}", op, e);
                OpOutcome::Skipped
            }
        }
    }
}

impl<S: Session> Default for SessionSlot<S> {
    fn default() -> Self {
        Self::new()
    }
}
