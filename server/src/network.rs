//! Lobby server network layer handling UDP communications and the event loop

use crate::client_manager::{Client, ClientManager, JoinError, CLIENT_TIMEOUT};
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{KickReason, Packet, MAX_PACKET_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};

/// Speaker name used for replies generated by the server itself.
pub const SYSTEM_SPEAKER: &str = "Server";

/// Structured kick reason sent to idle players.
pub const IDLE_KICK_REASON: &str = r#"{"translate":"multiplayer.disconnect.idling"}"#;

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    ClientTimeout { client: Client },
    ClientIdle { client: Client },
}

/// Messages sent from the main loop to the sender task
#[derive(Debug)]
pub enum OutboundMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
        exclude: Option<u32>,
    },
}

/// Lobby server relaying chat and presence between connected players
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    idle_timeout: Duration,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    outbound_tx: mpsc::UnboundedSender<OutboundMessage>,
    outbound_rx: mpsc::UnboundedReceiver<OutboundMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        max_clients: usize,
        idle_timeout: Duration,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(max_clients))),
            idle_timeout,
            server_tx,
            server_rx,
            outbound_tx,
            outbound_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; MAX_PACKET_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        // ICMP port-unreachable from a departed client shows up here
                        debug!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut outbound_rx =
            std::mem::replace(&mut self.outbound_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                match message {
                    OutboundMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    OutboundMessage::BroadcastPacket { packet, exclude } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.get_client_addrs()
                        };

                        for (client_id, addr) in client_addrs {
                            if Some(client_id) == exclude {
                                continue;
                            }

                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that drops silent clients and kicks idle ones
    fn spawn_housekeeping(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();
        let idle_timeout = self.idle_timeout;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let (timed_out, idle) = {
                    let mut clients_guard = clients.write().await;
                    (
                        clients_guard.check_timeouts(CLIENT_TIMEOUT),
                        clients_guard.check_idle(idle_timeout),
                    )
                };

                let messages = timed_out
                    .into_iter()
                    .map(|client| ServerMessage::ClientTimeout { client })
                    .chain(
                        idle.into_iter()
                            .map(|client| ServerMessage::ClientIdle { client }),
                    );

                for message in messages {
                    if let Err(e) = server_tx.send(message) {
                        error!("Failed to send housekeeping message: {}", e);
                        return;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self
            .outbound_tx
            .send(OutboundMessage::SendPacket { packet, addr })
        {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn broadcast_packet(&self, packet: Packet, exclude: Option<u32>) {
        if let Err(e) = self
            .outbound_tx
            .send(OutboundMessage::BroadcastPacket { packet, exclude })
        {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    fn system_reply(&self, text: impl Into<String>, addr: SocketAddr) {
        self.send_packet(
            Packet::ChatMessage {
                speaker: SYSTEM_SPEAKER.to_string(),
                text: text.into(),
            },
            addr,
        );
    }

    fn announce_leave(&self, client: &Client) {
        if !client.hidden {
            self.broadcast_packet(
                Packet::PlayerLeft {
                    username: client.username.clone(),
                },
                None,
            );
        }
    }

    async fn handle_connect(
        &mut self,
        addr: SocketAddr,
        protocol_version: u32,
        username: String,
        auth_mode: String,
    ) {
        info!(
            "{} connecting from {} (protocol {}, auth {})",
            username, addr, protocol_version, auth_mode
        );

        if protocol_version != PROTOCOL_VERSION {
            self.send_packet(
                Packet::Disconnected {
                    reason: "Protocol version mismatch".to_string(),
                },
                addr,
            );
            return;
        }

        // A reconnect from the same address replaces the old session
        let replaced = {
            let mut clients = self.clients.write().await;
            clients
                .find_client_by_addr(addr)
                .and_then(|id| clients.remove_client(id))
        };
        if let Some(old) = replaced {
            info!("Replacing existing client {} from {}", old.id, addr);
            self.announce_leave(&old);
        }

        let (joined, roster) = {
            let mut clients = self.clients.write().await;
            let joined = clients.add_client(addr, &username);
            let roster = match joined {
                Ok(id) => clients.visible_usernames(id),
                Err(_) => Vec::new(),
            };
            (joined, roster)
        };

        match joined {
            Ok(client_id) => {
                self.send_packet(
                    Packet::Spawned {
                        entity_id: client_id,
                    },
                    addr,
                );
                for existing in roster {
                    self.send_packet(Packet::PlayerJoined { username: existing }, addr);
                }
                self.broadcast_packet(Packet::PlayerJoined { username }, Some(client_id));
            }
            Err(JoinError::DuplicateUsername) => {
                warn!("Refusing duplicate login for {}", username);
                self.send_packet(
                    Packet::Kicked {
                        reason: KickReason::Text(
                            "You are already connected to this server".to_string(),
                        ),
                    },
                    addr,
                );
            }
            Err(JoinError::ServerFull) => {
                self.send_packet(
                    Packet::Disconnected {
                        reason: "Server full".to_string(),
                    },
                    addr,
                );
            }
        }
    }

    async fn handle_command(&mut self, client_id: u32, addr: SocketAddr, command: &str) {
        let hidden = match command.trim() {
            "/vanish on" => true,
            "/vanish off" => false,
            other => {
                self.system_reply(format!("Unknown command: {}", other), addr);
                return;
            }
        };

        let (changed, username) = {
            let mut clients = self.clients.write().await;
            let changed = clients.set_hidden(client_id, hidden);
            let username = clients.get(client_id).map(|c| c.username.clone());
            (changed, username)
        };
        let Some(username) = username else {
            return;
        };

        if changed {
            info!(
                "{} is now {}",
                username,
                if hidden { "hidden" } else { "visible" }
            );
            let packet = if hidden {
                Packet::PlayerLeft { username }
            } else {
                Packet::PlayerJoined { username }
            };
            self.broadcast_packet(packet, Some(client_id));
        }

        self.system_reply(
            if hidden {
                "Vanish enabled"
            } else {
                "Vanish disabled"
            },
            addr,
        );
    }

    /// Processes one incoming packet
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        if let Packet::Connect {
            protocol_version,
            username,
            auth_mode,
        } = packet
        {
            self.handle_connect(addr, protocol_version, username, auth_mode)
                .await;
            return;
        }

        let client_id = {
            let mut clients = self.clients.write().await;
            clients.touch(addr)
        };
        let Some(client_id) = client_id else {
            debug!("Ignoring {:?} from unknown address {}", packet, addr);
            return;
        };

        match packet {
            Packet::KeepAlive { timestamp } => {
                self.send_packet(Packet::KeepAliveAck { timestamp }, addr);
            }

            Packet::Chat { text } => {
                if text.starts_with('/') {
                    self.handle_command(client_id, addr, &text).await;
                    return;
                }

                let speaker = {
                    let clients = self.clients.read().await;
                    clients.get(client_id).map(|c| c.username.clone())
                };
                if let Some(speaker) = speaker {
                    info!("<{}> {}", speaker, text);
                    self.broadcast_packet(Packet::ChatMessage { speaker, text }, None);
                }
            }

            Packet::Control { .. } | Packet::Look { .. } => {
                let mut clients = self.clients.write().await;
                clients.record_motion(client_id);
            }

            Packet::Disconnect => {
                let removed = {
                    let mut clients = self.clients.write().await;
                    clients.remove_client(client_id)
                };
                if let Some(client) = removed {
                    self.announce_leave(&client);
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    /// Main server loop
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_housekeeping();

        info!(
            "Server started successfully (idle timeout {}s)",
            self.idle_timeout.as_secs()
        );

        while let Some(message) = self.server_rx.recv().await {
            match message {
                ServerMessage::PacketReceived { packet, addr } => {
                    self.handle_packet(packet, addr).await;
                }
                ServerMessage::ClientTimeout { client } => {
                    info!("Client {} ({}) timed out", client.id, client.username);
                    self.announce_leave(&client);
                }
                ServerMessage::ClientIdle { client } => {
                    info!("Kicking {} for idling", client.username);
                    self.send_packet(
                        Packet::Kicked {
                            reason: KickReason::Json(IDLE_KICK_REASON.to_string()),
                        },
                        client.addr,
                    );
                    self.announce_leave(&client);
                }
            }
        }

        info!("Server shutting down");
        Ok(())
    }
}
