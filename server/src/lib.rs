//! # Lobby Server Library
//!
//! A small development server speaking the workspace's UDP protocol. It gives
//! the presence agent something real to connect to: players join and leave,
//! chat is relayed, silent clients are dropped and idle players are kicked the
//! way a production game server would.
//!
//! ## Core Responsibilities
//!
//! ### Roster
//! Tracks connected players by address and username. Newcomers receive a
//! `Spawned` packet followed by one `PlayerJoined` per visible player, and
//! everyone else hears about the newcomer.
//!
//! ### Chat and Commands
//! Plain chat lines are relayed to every player, including the sender. Lines
//! starting with `/` are commands; `/vanish on|off` toggles the sender's
//! hidden flag and is answered with a system chat line.
//!
//! ### Housekeeping
//! Once per second the server drops clients that have been silent for five
//! seconds and kicks players that sent no movement or look packet within the
//! idle timeout, using a structured JSON kick reason.
//!
//! ## Architecture Design
//!
//! ### Single Event Loop
//! All roster decisions happen on one loop fed by an mpsc channel. Helper
//! tasks receive datagrams, drain the outgoing packet queue and run
//! housekeeping; they share the roster through an `Arc<RwLock<_>>`.
//!
//! ## Module Organization
//!
//! ### Client Manager Module (`client_manager`)
//! Connection tracking, username uniqueness, keep-alive and idle timing.
//!
//! ### Network Module (`network`)
//! Socket tasks, packet handling and the main loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new("127.0.0.1:25565", 20, Duration::from_secs(300)).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod network;
