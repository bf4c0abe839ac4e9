//! Player roster for the lobby server
//!
//! This module tracks everyone currently connected to the lobby:
//! - Connection lifecycle (join, leave, keep-alive timeout)
//! - Username uniqueness and address lookup for incoming packets
//! - Movement activity used to enforce the idle-kick rule
//! - Hidden (vanished) players, who are left out of roster announcements
//!
//! All timing is based on `std::time::Instant`; the server's housekeeping
//! task calls the `check_*` methods once per second.

use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Seconds of silence after which a client is considered gone.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Represents a connected player
#[derive(Debug)]
pub struct Client {
    /// Unique client identifier, also used as the entity id
    pub id: u32,
    /// Network address for sending responses
    pub addr: SocketAddr,
    pub username: String,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
    /// Last time the client sent a movement or look packet
    pub last_moved: Instant,
    /// Whether the player has vanished from other players' view
    pub hidden: bool,
}

impl Client {
    pub fn new(id: u32, addr: SocketAddr, username: impl Into<String>) -> Self {
        let now = Instant::now();
        Self {
            id,
            addr,
            username: username.into(),
            last_seen: now,
            last_moved: now,
            hidden: false,
        }
    }

    /// Returns true if no packet arrived within `timeout`.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }

    /// Returns true if the player has not moved or looked around within `timeout`.
    pub fn is_idle(&self, timeout: Duration) -> bool {
        self.last_moved.elapsed() > timeout
    }
}

/// Why a player could not be admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    ServerFull,
    DuplicateUsername,
}

/// Manages all connected players
///
/// The ClientManager enforces the capacity limit and unique usernames, and
/// hands back the removed `Client` whenever someone leaves so the caller can
/// announce the departure.
pub struct ClientManager {
    /// Connected clients indexed by their unique ID
    clients: HashMap<u32, Client>,
    /// Next available client ID for new connections
    next_client_id: u32,
    /// Maximum number of concurrent clients allowed
    max_clients: usize,
}

impl ClientManager {
    /// Creates an empty roster. Client IDs start from 1.
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Admits a new player.
    ///
    /// Returns the assigned client ID, or the reason the player was refused.
    pub fn add_client(&mut self, addr: SocketAddr, username: &str) -> Result<u32, JoinError> {
        if self.find_by_username(username).is_some() {
            return Err(JoinError::DuplicateUsername);
        }
        if self.clients.len() >= self.max_clients {
            return Err(JoinError::ServerFull);
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} ({}) connected from {}", client_id, username, addr);
        self.clients
            .insert(client_id, Client::new(client_id, addr, username));

        Ok(client_id)
    }

    /// Removes a player and returns their record, if they were still here.
    pub fn remove_client(&mut self, client_id: u32) -> Option<Client> {
        let client = self.clients.remove(&client_id)?;
        info!("Client {} ({}) disconnected", client.id, client.username);
        Some(client)
    }

    pub fn get(&self, client_id: u32) -> Option<&Client> {
        self.clients.get(&client_id)
    }

    /// Finds a client ID by network address
    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn find_by_username(&self, username: &str) -> Option<u32> {
        self.clients
            .iter()
            .find(|(_, client)| client.username == username)
            .map(|(id, _)| *id)
    }

    /// Refreshes the keep-alive clock of the client at `addr`.
    ///
    /// Returns the client ID so callers can avoid a second lookup.
    pub fn touch(&mut self, addr: SocketAddr) -> Option<u32> {
        let client = self.clients.values_mut().find(|c| c.addr == addr)?;
        client.last_seen = Instant::now();
        Some(client.id)
    }

    pub fn record_motion(&mut self, client_id: u32) {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.last_moved = Instant::now();
        }
    }

    /// Sets the hidden flag; returns true if it actually changed.
    pub fn set_hidden(&mut self, client_id: u32, hidden: bool) -> bool {
        match self.clients.get_mut(&client_id) {
            Some(client) if client.hidden != hidden => {
                client.hidden = hidden;
                true
            }
            _ => false,
        }
    }

    /// Removes and returns clients that stopped sending packets
    pub fn check_timeouts(&mut self, timeout: Duration) -> Vec<Client> {
        self.remove_where(|client| client.is_timed_out(timeout))
    }

    /// Removes and returns clients that have not moved within `idle_timeout`
    pub fn check_idle(&mut self, idle_timeout: Duration) -> Vec<Client> {
        self.remove_where(|client| client.is_idle(idle_timeout))
    }

    fn remove_where(&mut self, predicate: impl Fn(&Client) -> bool) -> Vec<Client> {
        let ids: Vec<u32> = self
            .clients
            .values()
            .filter(|client| predicate(client))
            .map(|client| client.id)
            .collect();

        ids.into_iter()
            .filter_map(|id| self.remove_client(id))
            .collect()
    }

    /// Usernames of visible players, excluding `except`
    pub fn visible_usernames(&self, except: u32) -> Vec<String> {
        let mut names: Vec<String> = self
            .clients
            .values()
            .filter(|client| client.id != except && !client.hidden)
            .map(|client| client.username.clone())
            .collect();
        names.sort();
        names
    }

    /// Gets all client IDs and their network addresses for broadcasting
    pub fn get_client_addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.addr))
            .collect()
    }

    /// Returns the number of currently connected clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
