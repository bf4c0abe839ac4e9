//! # Presence Agent Library
//!
//! This library keeps a single player account connected to a multiplayer game
//! server around the clock. It looks busy enough to dodge idle-kick rules,
//! answers a handful of chat triggers, hides itself while other players are
//! online and reconnects on its own whenever the session ends.
//!
//! ## Architecture Overview
//!
//! The agent is a single-task, event-driven state machine. One
//! [`lifecycle::Controller`] owns the current session handle, both idle
//! drivers, the reconnect counter and the presence count. Its `run` loop waits
//! on whichever comes first: a session event, the next idle-motion tick, the
//! next idle-chat tick or the pending reconnect deadline. Because every
//! mutation happens inside that loop there is no shared state and no locking.
//!
//! ### Session Lifecycle
//! `Connecting → Live` on spawn; any disconnect, kick or transient network
//! error tears the session down, stops both idle drivers and schedules one
//! reconnect. Ordinary disconnects back off linearly up to a ceiling, kicks
//! always wait a fixed delay.
//!
//! ### Defensive Session Access
//! Nothing talks to a session directly. [`session::SessionSlot`] checks that a
//! session exists and is still open before every operation and swallows
//! failures, so a late timer tick against a dead connection is a no-op.
//!
//! ## Module Organization
//!
//! ### Session Module (`session`)
//! The contract every protocol client implements: `Connector`, `Session`,
//! `SessionEvent`, plus the safe-call `SessionSlot`.
//!
//! ### Network Module (`network`)
//! A UDP implementation of that contract speaking the workspace's own packet
//! format, used for local runs against the development server.
//!
//! ### Idle Behavior (`motion`, `chatter`)
//! Randomized movement flags and facing every few seconds, and a keep-alive
//! chat line every few minutes. Each driver holds a tokio `Interval` only
//! while started, so a stopped driver never wakes the run loop.
//!
//! ### Reactions (`responder`, `presence`)
//! Chat trigger replies and the player counter that toggles hidden mode.
//!
//! ### Policy (`backoff`, `config`)
//! Reconnect delays and the server address, identity and timing settings.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use agent::config::{AgentConfig, ServerAddress};
//! use agent::lifecycle::Controller;
//! use agent::network::UdpConnector;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = ServerAddress::first_of("127.0.0.1:25565")?;
//!     let config = AgentConfig::new(server, "PresenceBot");
//!
//!     let mut controller = Controller::new(config, UdpConnector::new(), StdRng::from_entropy());
//!     controller.run().await;
//!     Ok(())
//! }
//! ```

pub mod backoff;
pub mod chatter;
pub mod config;
pub mod lifecycle;
pub mod motion;
pub mod network;
pub mod presence;
pub mod responder;
pub mod session;
