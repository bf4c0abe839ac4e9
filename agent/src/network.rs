//! UDP transport implementing the session contract
//!
//! Each session owns one connected UDP socket driven by a spawned task. The
//! controller-facing [`UdpSession`] only encodes packets and queues them for
//! that task, so no session operation ever blocks the event loop.

use crate::session::{
    ConnectTarget, Connector, ErrorCode, EventSender, Session, SessionError, SessionEvent,
};
use bincode::{deserialize, serialize};
use log::{debug, info, warn};
use shared::{MotionFlag, Packet, KEEPALIVE_INTERVAL_MS, MAX_PACKET_SIZE, PROTOCOL_VERSION};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::{lookup_host, UdpSocket};
use tokio::sync::mpsc;
use tokio::time::{interval, Instant, MissedTickBehavior};

pub const SERVER_SILENCE_TIMEOUT: Duration = Duration::from_secs(30);

/// Opens [`UdpSession`]s against servers speaking [`shared::Packet`].
#[derive(Debug, Clone)]
pub struct UdpConnector {
    silence_timeout: Duration,
}

impl UdpConnector {
    pub fn new() -> Self {
        Self {
            silence_timeout: SERVER_SILENCE_TIMEOUT,
        }
    }

    /// Sets how long the server may stay silent before the session reports
    /// a timeout.
    pub fn with_silence_timeout(mut self, timeout: Duration) -> Self {
        self.silence_timeout = timeout;
        self
    }
}

impl Default for UdpConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for UdpConnector {
    type Session = UdpSession;

    fn connect(
        &mut self,
        target: &ConnectTarget,
        events: EventSender,
    ) -> Result<UdpSession, SessionError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SessionError::Io(io::Error::new(io::ErrorKind::Other, e)))?;

        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(true));

        runtime.spawn(drive_session(
            target.clone(),
            outgoing_rx,
            events,
            Arc::clone(&open),
            self.silence_timeout,
        ));

        Ok(UdpSession {
            outgoing: Some(outgoing_tx),
            open,
        })
    }
}

pub struct UdpSession {
    outgoing: Option<mpsc::UnboundedSender<Vec<u8>>>,
    open: Arc<AtomicBool>,
}

impl UdpSession {
    fn send_packet(&self, packet: &Packet) -> Result<(), SessionError> {
        if !self.is_open() {
            return Err(SessionError::Closed);
        }
        let outgoing = self.outgoing.as_ref().ok_or(SessionError::Closed)?;
        let data = serialize(packet)?;
        outgoing
            .send(data)
            .map_err(|_| SessionError::ChannelClosed)
    }
}

impl Session for UdpSession {
    fn is_open(&self) -> bool {
        self.outgoing.is_some() && self.open.load(Ordering::Acquire)
    }

    fn send_chat(&mut self, text: &str) -> Result<(), SessionError> {
        self.send_packet(&Packet::Chat {
            text: text.to_string(),
        })
    }

    fn set_motion_flag(&mut self, flag: MotionFlag, state: bool) -> Result<(), SessionError> {
        self.send_packet(&Packet::Control { flag, state })
    }

    fn set_orientation(&mut self, yaw: f32, pitch: f32) -> Result<(), SessionError> {
        self.send_packet(&Packet::Look { yaw, pitch })
    }

    fn close(&mut self) {
        // Dropping the sender lets the I/O task flush the goodbye and exit.
        if let Some(outgoing) = self.outgoing.take() {
            if self.open.swap(false, Ordering::AcqRel) {
                if let Ok(data) = serialize(&Packet::Disconnect) {
                    let _ = outgoing.send(data);
                }
            }
        }
    }
}

impl Drop for UdpSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// What the I/O task does after handling one server packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    End,
}

/// Translates a server packet into the session event it carries.
pub fn event_for_packet(packet: Packet) -> (Option<SessionEvent>, Flow) {
    match packet {
        Packet::Spawned { entity_id } => {
            debug!("Spawned as entity {}", entity_id);
            (Some(SessionEvent::Spawned), Flow::Continue)
        }
        Packet::KeepAliveAck { .. } => (None, Flow::Continue),
        Packet::ChatMessage { speaker, text } => {
            (Some(SessionEvent::Chat { speaker, text }), Flow::Continue)
        }
        Packet::PlayerJoined { username } => {
            (Some(SessionEvent::PlayerJoined(username)), Flow::Continue)
        }
        Packet::PlayerLeft { username } => {
            (Some(SessionEvent::PlayerLeft(username)), Flow::Continue)
        }
        Packet::Kicked { reason } => (Some(SessionEvent::Kicked(reason)), Flow::End),
        Packet::Disconnected { reason } => {
            info!("Server closed the connection: {}", reason);
            (None, Flow::End)
        }
        other => {
            warn!("Unexpected packet from server: {:?}", other);
            (None, Flow::Continue)
        }
    }
}

fn timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

fn report_io_error(events: &EventSender, e: &io::Error) {
    let _ = events.send(SessionEvent::Error {
        code: ErrorCode::from_io_kind(e.kind()),
        message: e.to_string(),
    });
}

async fn open_socket(target: &ConnectTarget) -> io::Result<UdpSocket> {
    let addr = lookup_host((target.host.as_str(), target.port))
        .await?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "host has no addresses"))?;

    let local = if addr.is_ipv4() {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
    } else {
        SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
    };
    let socket = UdpSocket::bind(local).await?;
    socket.connect(addr).await?;
    Ok(socket)
}

async fn drive_session(
    target: ConnectTarget,
    mut outgoing: mpsc::UnboundedReceiver<Vec<u8>>,
    events: EventSender,
    open: Arc<AtomicBool>,
    silence_timeout: Duration,
) {
    let socket = match open_socket(&target).await {
        Ok(socket) => socket,
        Err(e) => {
            report_io_error(&events, &e);
            open.store(false, Ordering::Release);
            let _ = events.send(SessionEvent::Disconnected);
            return;
        }
    };

    let hello = Packet::Connect {
        protocol_version: PROTOCOL_VERSION,
        username: target.identity.clone(),
        auth_mode: target.auth_mode.clone(),
    };
    let sent = match serialize(&hello) {
        Ok(data) => socket.send(&data).await.map(|_| ()),
        Err(e) => Err(io::Error::new(io::ErrorKind::InvalidData, e)),
    };
    if let Err(e) = sent {
        report_io_error(&events, &e);
        open.store(false, Ordering::Release);
        let _ = events.send(SessionEvent::Disconnected);
        return;
    }

    let mut keepalive = interval(Duration::from_millis(KEEPALIVE_INTERVAL_MS));
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_heard = Instant::now();
    let mut buffer = [0u8; MAX_PACKET_SIZE];

    loop {
        tokio::select! {
            result = socket.recv(&mut buffer) => {
                match result {
                    Ok(len) => {
                        last_heard = Instant::now();
                        match deserialize::<Packet>(&buffer[..len]) {
                            Ok(packet) => {
                                let (event, flow) = event_for_packet(packet);
                                if let Some(event) = event {
                                    let _ = events.send(event);
                                }
                                if flow == Flow::End {
                                    break;
                                }
                            }
                            Err(e) => warn!("Malformed packet from server: {}", e),
                        }
                    }
                    Err(e) => {
                        report_io_error(&events, &e);
                        break;
                    }
                }
            },

            data = outgoing.recv() => {
                match data {
                    Some(data) => {
                        if let Err(e) = socket.send(&data).await {
                            report_io_error(&events, &e);
                            break;
                        }
                    }
                    None => {
                        // Closed locally; the controller has stopped listening.
                        open.store(false, Ordering::Release);
                        return;
                    }
                }
            },

            _ = keepalive.tick() => {
                if last_heard.elapsed() > silence_timeout {
                    let _ = events.send(SessionEvent::Error {
                        code: ErrorCode::TimedOut,
                        message: format!(
                            "no packets from server for {}s",
                            silence_timeout.as_secs()
                        ),
                    });
                    break;
                }
                if let Ok(data) = serialize(&Packet::KeepAlive { timestamp: timestamp_ms() }) {
                    let _ = socket.send(&data).await;
                }
            },
        }
    }

    open.store(false, Ordering::Release);
    let _ = events.send(SessionEvent::Disconnected);
}
