//! Session lifecycle controller
//!
//! Owns the one session handle the agent may hold, keeps the idle drivers
//! running exactly while that session is live, and schedules reconnects.
//!
//! ```text
//!  Idle ──connect──▶ Connecting ──spawned──▶ Live
//!                        │                    │
//!                        └──── disconnected / kicked / transient error
//!                                             ▼
//!                                      Disconnected(reason)
//!                                             │ schedule
//!                                             ▼
//!                                      AwaitingRetry ──due──▶ Connecting
//! ```
//!
//! All transitions happen on the single task running [`Controller::run`], so
//! the controller is plain owned state with no locking.

use crate::backoff::RetryState;
use crate::chatter::IdleChat;
use crate::config::AgentConfig;
use crate::motion::IdleMotion;
use crate::presence::PresenceTracker;
use crate::responder::{ChatResponder, Reply};
use crate::session::{Connector, ErrorCode, EventReceiver, SessionEvent, SessionSlot};
use log::{debug, info, warn};
use rand::Rng;
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

#[derive(Debug, Clone, PartialEq)]
pub enum DisconnectReason {
    Normal,
    Kicked(String),
    NetworkError(ErrorCode),
    ConnectFailed(String),
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::Normal => f.write_str("connection ended"),
            DisconnectReason::Kicked(reason) => write!(f, "kicked: {}", reason),
            DisconnectReason::NetworkError(code) => write!(f, "network error {}", code),
            DisconnectReason::ConnectFailed(e) => write!(f, "connect failed: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleState {
    Idle,
    Connecting,
    Live,
    Disconnected(DisconnectReason),
    AwaitingRetry {
        reason: DisconnectReason,
        delay: Duration,
        due: Instant,
    },
}

pub struct Controller<C: Connector, R: Rng> {
    config: AgentConfig,
    connector: C,
    rng: R,
    session: SessionSlot<C::Session>,
    events: Option<EventReceiver>,
    state: LifecycleState,
    retry: RetryState,
    presence: PresenceTracker,
    responder: ChatResponder,
    motion: IdleMotion,
    chatter: IdleChat,
}

impl<C: Connector, R: Rng> Controller<C, R> {
    pub fn new(config: AgentConfig, connector: C, rng: R) -> Self {
        let presence = PresenceTracker::new(config.identity.clone());
        let responder = ChatResponder::new(config.identity.clone());
        let motion = IdleMotion::new(config.timing.motion_period);
        let chatter = IdleChat::new(config.timing.chat_period);

        Self {
            config,
            connector,
            rng,
            session: SessionSlot::new(),
            events: None,
            state: LifecycleState::Idle,
            retry: RetryState::default(),
            presence,
            responder,
            motion,
            chatter,
        }
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    pub fn retry(&self) -> &RetryState {
        &self.retry
    }

    pub fn presence_count(&self) -> u32 {
        self.presence.count()
    }

    /// Activity of the (motion, chat) drivers.
    pub fn drivers_active(&self) -> (bool, bool) {
        (self.motion.is_active(), self.chatter.is_active())
    }

    pub fn is_live(&self) -> bool {
        self.state == LifecycleState::Live
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn retry_due(&self) -> Option<Instant> {
        match self.state {
            LifecycleState::AwaitingRetry { due, .. } => Some(due),
            _ => None,
        }
    }

    fn has_session(&self) -> bool {
        matches!(self.state, LifecycleState::Connecting | LifecycleState::Live)
    }

    /// Starts a fresh connection attempt.
    pub fn connect(&mut self, now: Instant) {
        if self.has_session() {
            debug!("Connect requested while a session is active; ignoring");
            return;
        }

        let target = self.config.target();
        info!(
            "Connecting to {}:{} as {} ({})...",
            target.host, target.port, target.identity, target.auth_mode
        );

        // Each attempt gets its own channel; dropping the receiver later
        // silences anything the old session still emits.
        let (tx, rx) = mpsc::unbounded_channel();
        self.presence.reset();

        match self.connector.connect(&target, tx) {
            Ok(session) => {
                self.session.install(session);
                self.events = Some(rx);
                self.state = LifecycleState::Connecting;
            }
            Err(e) => {
                warn!("Connection attempt failed: {}", e);
                self.terminate(DisconnectReason::ConnectFailed(e.to_string()), now);
            }
        }
    }

    pub fn handle_event(&mut self, event: SessionEvent, now: Instant) {
        if !self.has_session() {
            debug!("Ignoring {:?} with no active session", event);
            return;
        }

        match event {
            SessionEvent::Spawned => self.on_spawned(now),
            SessionEvent::Chat { speaker, text } => self.on_chat(&speaker, &text),
            SessionEvent::PlayerJoined(identity) => self.on_player_joined(&identity),
            SessionEvent::PlayerLeft(identity) => self.on_player_left(&identity),
            SessionEvent::Error { code, message } => {
                warn!("Error: {} ({})", message, code);
                if code.is_transient() {
                    info!("Network error, reconnecting...");
                    self.terminate(DisconnectReason::NetworkError(code), now);
                }
            }
            SessionEvent::Disconnected => self.terminate(DisconnectReason::Normal, now),
            SessionEvent::Kicked(reason) => {
                let reason = reason.display_text();
                warn!("Kicked: {}", reason);
                self.terminate(DisconnectReason::Kicked(reason), now);
            }
        }
    }

    pub fn on_motion_due(&mut self) {
        if self.is_live() && self.motion.is_active() {
            self.motion.tick(&mut self.session, &mut self.rng);
        }
    }

    pub fn on_chat_due(&mut self) {
        if self.is_live() && self.chatter.is_active() {
            self.chatter.tick(&mut self.session, &mut self.rng);
        }
    }

    pub fn on_retry_due(&mut self, now: Instant) {
        match self.retry_due() {
            Some(due) if due <= now => self.connect(now),
            _ => {}
        }
    }

    fn on_spawned(&mut self, now: Instant) {
        if self.is_live() {
            debug!("Respawned");
            return;
        }

        info!("Joined {}", self.config.server);
        self.retry.reset();
        self.motion.start(now);
        self.chatter.start(now);
        self.state = LifecycleState::Live;
    }

    fn on_chat(&mut self, speaker: &str, text: &str) {
        for reply in self.responder.respond(speaker, text) {
            if let Reply::Command(command) = &reply {
                info!("{} asked for {}", speaker, command);
            }
            self.session.chat(reply.line());
        }
    }

    fn on_player_joined(&mut self, identity: &str) {
        if identity == self.config.identity {
            return;
        }
        info!("Player joined: {}", identity);
        if let Some(command) = self.presence.on_join(identity) {
            info!("Someone is online, sending {}", command);
            self.session.chat(command.as_chat());
        }
    }

    fn on_player_left(&mut self, identity: &str) {
        if identity == self.config.identity {
            return;
        }
        info!("Player left: {}", identity);
        if let Some(command) = self.presence.on_leave(identity) {
            info!("World is empty, sending {}", command);
            self.session.chat(command.as_chat());
        }
    }

    /// Tears the current session down and moves to `Disconnected`.
    fn terminate(&mut self, reason: DisconnectReason, now: Instant) {
        self.motion.stop(&mut self.session);
        self.chatter.stop();
        self.session.close();
        self.events = None;
        self.retry.record_failure();

        self.state = LifecycleState::Disconnected(reason);
        self.schedule_retry(now);
    }

    fn schedule_retry(&mut self, now: Instant) {
        let reason = match std::mem::replace(&mut self.state, LifecycleState::Idle) {
            LifecycleState::Disconnected(reason) => reason,
            other => {
                self.state = other;
                return;
            }
        };

        let backoff = self.config.timing.backoff;
        let delay = match &reason {
            DisconnectReason::Kicked(_) => backoff.kick_delay(),
            _ => backoff.delay_for(self.retry.attempts),
        };
        self.retry.last_delay = delay;

        info!(
            "Disconnected ({}), reconnecting in {}s...",
            reason,
            delay.as_secs_f32()
        );
        self.state = LifecycleState::AwaitingRetry {
            reason,
            delay,
            due: now + delay,
        };
    }

    /// Runs the agent until the surrounding task is dropped.
    pub async fn run(&mut self) {
        self.connect(Instant::now());

        loop {
            let retry_due = self.retry_due();

            tokio::select! {
                event = next_event(&mut self.events) => {
                    // A closed channel means the session task is gone.
                    let event = event.unwrap_or(SessionEvent::Disconnected);
                    self.handle_event(event, Instant::now());
                },

                _ = self.motion.next_tick() => {
                    self.on_motion_due();
                },

                _ = self.chatter.next_tick() => {
                    self.on_chat_due();
                },

                _ = wait_until(retry_due) => {
                    self.on_retry_due(Instant::now());
                },
            }
        }
    }
}

async fn next_event(events: &mut Option<EventReceiver>) -> Option<SessionEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn wait_until(due: Option<Instant>) {
    match due {
        Some(due) => sleep_until(due).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::Backoff;
    use crate::config::ServerAddress;
    use crate::session::testing::{MockConnector, Op};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::{KickReason, MotionFlag};

    const BOT: &str = "PresenceBot";

    fn controller() -> Controller<MockConnector, StdRng> {
        controller_with(MockConnector::default())
    }

    fn controller_with(connector: MockConnector) -> Controller<MockConnector, StdRng> {
        let config = AgentConfig::new(ServerAddress::first_of("example.com").unwrap(), BOT);
        Controller::new(config, connector, StdRng::seed_from_u64(5))
    }

    fn live(now: Instant) -> Controller<MockConnector, StdRng> {
        let mut c = controller();
        c.connect(now);
        c.handle_event(SessionEvent::Spawned, now);
        c.connector().recorder.take();
        c
    }

    fn pending_delay(c: &Controller<MockConnector, StdRng>) -> Duration {
        match c.state() {
            LifecycleState::AwaitingRetry { delay, .. } => *delay,
            other => panic!("expected AwaitingRetry, got {:?}", other),
        }
    }

    fn assert_drivers_match_liveness(c: &Controller<MockConnector, StdRng>) {
        let (motion, chat) = c.drivers_active();
        assert_eq!(motion, c.is_live());
        assert_eq!(chat, c.is_live());
    }

    #[test]
    fn test_connect_enters_connecting() {
        let mut c = controller();
        c.connect(Instant::now());

        assert_eq!(c.state(), &LifecycleState::Connecting);
        assert_eq!(c.connector().attempts.len(), 1);
        assert_eq!(c.connector().attempts[0].identity, BOT);
        assert_eq!(c.drivers_active(), (false, false));
    }

    #[test]
    fn test_connect_while_active_is_ignored() {
        let mut c = controller();
        let now = Instant::now();
        c.connect(now);
        c.connect(now);
        assert_eq!(c.connector().attempts.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_starts_drivers_and_resets_attempts() {
        let now = Instant::now();
        let mut c = controller();
        c.connect(now);
        c.handle_event(SessionEvent::Disconnected, now);
        assert_eq!(c.retry().attempts, 1);

        c.on_retry_due(now + Duration::from_secs(20));
        c.handle_event(SessionEvent::Spawned, now + Duration::from_secs(21));

        assert!(c.is_live());
        assert_eq!(c.retry().attempts, 0);
        assert_eq!(c.drivers_active(), (true, true));
    }

    #[test]
    fn test_three_disconnects_back_off_linearly() {
        let mut now = Instant::now();
        let mut c = controller();
        c.connect(now);

        let mut delays = Vec::new();
        for _ in 0..3 {
            c.handle_event(SessionEvent::Disconnected, now);
            let delay = pending_delay(&c);
            delays.push(delay.as_millis());
            now += delay;
            c.on_retry_due(now);
        }

        assert_eq!(delays, vec![20_000, 40_000, 60_000]);
        assert_eq!(c.retry().last_delay, Duration::from_millis(60_000));
        assert_eq!(c.connector().attempts.len(), 4);
    }

    #[test]
    fn test_backoff_hits_ceiling() {
        let mut now = Instant::now();
        let mut c = controller();
        c.connect(now);

        for _ in 0..20 {
            c.handle_event(SessionEvent::Disconnected, now);
            now += pending_delay(&c);
            c.on_retry_due(now);
        }
        c.handle_event(SessionEvent::Disconnected, now);
        assert_eq!(pending_delay(&c), Duration::from_millis(300_000));
    }

    #[test]
    fn test_kick_uses_fixed_delay() {
        let mut now = Instant::now();
        let mut c = controller();
        c.connect(now);
        for _ in 0..6 {
            c.handle_event(SessionEvent::Disconnected, now);
            now += pending_delay(&c);
            c.on_retry_due(now);
        }

        c.handle_event(
            SessionEvent::Kicked(KickReason::Text("Idle too long".to_string())),
            now,
        );

        assert_eq!(pending_delay(&c), Duration::from_millis(20_000));
        assert_eq!(c.retry().attempts, 7);
        match c.state() {
            LifecycleState::AwaitingRetry { reason, .. } => {
                assert_eq!(reason, &DisconnectReason::Kicked("Idle too long".to_string()))
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_kick_with_bad_json_uses_placeholder() {
        let now = Instant::now();
        let mut c = live(now);
        c.handle_event(SessionEvent::Kicked(KickReason::Json("{".to_string())), now);
        match c.state() {
            LifecycleState::AwaitingRetry { reason, .. } => assert_eq!(
                reason,
                &DisconnectReason::Kicked(shared::UNKNOWN_KICK_REASON.to_string())
            ),
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_stops_drivers_and_releases_flags() {
        let now = Instant::now();
        let mut c = live(now);
        let open = c.connector().last_open.clone().unwrap();

        c.handle_event(SessionEvent::Disconnected, now);

        assert_eq!(c.drivers_active(), (false, false));
        let ops = c.connector().recorder.take();
        let mut expected: Vec<Op> = MotionFlag::ALL
            .iter()
            .map(|flag| Op::Control(*flag, false))
            .collect();
        expected.push(Op::Close);
        assert_eq!(ops, expected);
        assert!(!*open.borrow());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_error_closes_session_and_retries() {
        let now = Instant::now();
        let mut c = live(now);
        let open = c.connector().last_open.clone().unwrap();

        c.handle_event(
            SessionEvent::Error {
                code: ErrorCode::ConnectionReset,
                message: "read: connection reset by peer".to_string(),
            },
            now,
        );

        assert!(!*open.borrow());
        assert_eq!(c.retry().attempts, 1);
        assert_eq!(pending_delay(&c), Duration::from_millis(20_000));
        assert_drivers_match_liveness(&c);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_errors_only_log() {
        let now = Instant::now();
        let mut c = live(now);

        c.handle_event(
            SessionEvent::Error {
                code: ErrorCode::Other("EPROTO".to_string()),
                message: "bad packet".to_string(),
            },
            now,
        );

        assert!(c.is_live());
        assert_eq!(c.retry().attempts, 0);
        assert_eq!(c.drivers_active(), (true, true));
    }

    #[test]
    fn test_disconnect_before_spawn_backs_off() {
        let now = Instant::now();
        let mut c = controller();
        c.connect(now);
        c.handle_event(SessionEvent::Disconnected, now);
        assert_eq!(pending_delay(&c), Duration::from_millis(20_000));
        assert_drivers_match_liveness(&c);
    }

    #[test]
    fn test_refused_connect_schedules_retry() {
        let now = Instant::now();
        let mut c = controller_with(MockConnector {
            refuse: true,
            ..MockConnector::default()
        });
        c.connect(now);

        assert_eq!(c.retry().attempts, 1);
        assert!(matches!(
            c.state(),
            LifecycleState::AwaitingRetry {
                reason: DisconnectReason::ConnectFailed(_),
                ..
            }
        ));
    }

    #[test]
    fn test_retry_not_due_yet_does_nothing() {
        let now = Instant::now();
        let mut c = controller();
        c.connect(now);
        c.handle_event(SessionEvent::Disconnected, now);

        c.on_retry_due(now + Duration::from_secs(19));
        assert_eq!(c.connector().attempts.len(), 1);
        c.on_retry_due(now + Duration::from_secs(20));
        assert_eq!(c.connector().attempts.len(), 2);
        assert_eq!(c.state(), &LifecycleState::Connecting);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_after_termination_are_ignored() {
        let now = Instant::now();
        let mut c = live(now);
        c.handle_event(
            SessionEvent::Kicked(KickReason::Text("bye".to_string())),
            now,
        );
        let before = c.state().clone();

        c.handle_event(SessionEvent::Disconnected, now);
        c.handle_event(SessionEvent::Spawned, now);

        assert_eq!(c.state(), &before);
        assert_eq!(c.retry().attempts, 1);
        assert_eq!(c.drivers_active(), (false, false));
    }

    #[tokio::test(start_paused = true)]
    async fn test_respawn_keeps_driver_schedule() {
        let start = Instant::now();
        let mut c = live(start);

        tokio::time::advance(Duration::from_secs(3)).await;
        c.handle_event(SessionEvent::Spawned, Instant::now());

        assert_eq!(c.motion.next_tick().await, start + Duration::from_secs(5));
        assert_eq!(c.chatter.next_tick().await, start + Duration::from_secs(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_motion_ticks_only_while_live() {
        let now = Instant::now();
        let mut c = live(now);
        c.on_motion_due();
        assert_eq!(c.connector().recorder.take().len(), 6);

        c.handle_event(SessionEvent::Disconnected, now + Duration::from_secs(6));
        c.connector().recorder.take();
        c.on_motion_due();
        c.on_chat_due();
        assert!(c.connector().recorder.take().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_chat_due_sends_idle_line() {
        let now = Instant::now();
        let mut c = live(now);
        c.on_chat_due();
        let sent = c.connector().recorder.chats();
        assert_eq!(sent.len(), 1);
        assert!(crate::chatter::IDLE_MESSAGES.contains(&sent[0].as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_greeting_reply() {
        let now = Instant::now();
        let mut c = live(now);
        c.handle_event(
            SessionEvent::Chat {
                speaker: "Alice".to_string(),
                text: "hi bot".to_string(),
            },
            now,
        );
        assert_eq!(c.connector().recorder.chats(), vec!["Hello Alice! 👋"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_presence_hides_once() {
        let now = Instant::now();
        let mut c = live(now);
        c.handle_event(SessionEvent::PlayerJoined("Alice".to_string()), now);
        c.handle_event(SessionEvent::PlayerJoined("Bob".to_string()), now);

        assert_eq!(c.presence_count(), 2);
        assert_eq!(c.connector().recorder.chats(), vec!["/vanish on"]);

        c.handle_event(SessionEvent::PlayerLeft("Alice".to_string()), now);
        c.handle_event(SessionEvent::PlayerLeft("Bob".to_string()), now);
        c.handle_event(SessionEvent::PlayerLeft("Bob".to_string()), now);
        assert_eq!(c.presence_count(), 0);
        assert_eq!(
            c.connector().recorder.chats(),
            vec!["/vanish on", "/vanish off", "/vanish off"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_self_events_have_no_side_effects() {
        let now = Instant::now();
        let mut c = live(now);
        c.handle_event(
            SessionEvent::Chat {
                speaker: BOT.to_string(),
                text: "hi bot !state afk".to_string(),
            },
            now,
        );
        c.handle_event(SessionEvent::PlayerJoined(BOT.to_string()), now);
        c.handle_event(SessionEvent::PlayerLeft(BOT.to_string()), now);

        assert_eq!(c.presence_count(), 0);
        assert!(c.connector().recorder.take().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_presence_resets_on_new_session() {
        let now = Instant::now();
        let mut c = live(now);
        c.handle_event(SessionEvent::PlayerJoined("Alice".to_string()), now);
        c.handle_event(SessionEvent::Disconnected, now);
        c.on_retry_due(now + Duration::from_secs(20));
        assert_eq!(c.presence_count(), 0);
    }

    #[test]
    fn test_custom_backoff_from_config() {
        let mut config = AgentConfig::new("localhost:1".parse().unwrap(), BOT);
        config.timing.backoff = Backoff {
            step: Duration::from_millis(100),
            ceiling: Duration::from_millis(250),
            kick_delay: Duration::from_millis(50),
        };
        let mut c = Controller::new(config, MockConnector::default(), StdRng::seed_from_u64(1));
        let mut now = Instant::now();
        c.connect(now);

        let mut delays = Vec::new();
        for _ in 0..4 {
            c.handle_event(SessionEvent::Disconnected, now);
            let delay = pending_delay(&c);
            delays.push(delay.as_millis());
            now += delay;
            c.on_retry_due(now);
        }
        assert_eq!(delays, vec![100, 200, 250, 250]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drivers_track_liveness_under_random_events() {
        use rand::Rng;

        let mut rng = StdRng::seed_from_u64(77);
        let mut now = Instant::now();
        let mut c = controller();
        c.connect(now);

        for _ in 0..2_000 {
            let event = match rng.gen_range(0..7) {
                0 => SessionEvent::Spawned,
                1 => SessionEvent::Disconnected,
                2 => SessionEvent::Kicked(KickReason::Text("x".to_string())),
                3 => SessionEvent::Error {
                    code: ErrorCode::TimedOut,
                    message: "timeout".to_string(),
                },
                4 => SessionEvent::Error {
                    code: ErrorCode::Other("EPIPE".to_string()),
                    message: "pipe".to_string(),
                },
                5 => SessionEvent::PlayerJoined("Alice".to_string()),
                _ => SessionEvent::PlayerLeft("Alice".to_string()),
            };
            c.handle_event(event, now);
            assert_drivers_match_liveness(&c);

            now += Duration::from_secs(rng.gen_range(1..400));
            c.on_motion_due();
            c.on_chat_due();
            c.on_retry_due(now);
            assert_drivers_match_liveness(&c);
        }
    }

    fn scripted(script: Vec<SessionEvent>) -> Controller<MockConnector, StdRng> {
        let mut config = AgentConfig::new("example.com".parse().unwrap(), BOT);
        config.timing.motion_period = Duration::from_secs(5);
        let connector = MockConnector {
            script,
            ..MockConnector::default()
        };
        Controller::new(config, connector, StdRng::seed_from_u64(2))
    }

    #[test]
    fn test_waits_without_deadline_stay_pending() {
        let mut idle = tokio_test::task::spawn(wait_until(None));
        tokio_test::assert_pending!(idle.poll());

        let mut no_session: Option<EventReceiver> = None;
        let mut quiet = tokio_test::task::spawn(next_event(&mut no_session));
        tokio_test::assert_pending!(quiet.poll());
    }

    #[tokio::test]
    async fn test_closed_channel_reads_as_end_of_session() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut events = Some(rx);
        drop(tx);
        assert_eq!(next_event(&mut events).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_loop_drives_idle_motion() {
        let mut c = scripted(vec![SessionEvent::Spawned]);

        let _ = tokio::time::timeout(Duration::from_secs(12), c.run()).await;

        assert!(c.is_live());
        let looks = c
            .connector()
            .recorder
            .take()
            .into_iter()
            .filter(|op| matches!(op, Op::Look(_, _)))
            .count();
        assert_eq!(looks, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_loop_reconnects_with_backoff() {
        let mut c = scripted(vec![SessionEvent::Disconnected]);

        // Attempts at 0s, 20s and 60s; the next one is due at 120s.
        let _ = tokio::time::timeout(Duration::from_secs(65), c.run()).await;

        assert_eq!(c.connector().attempts.len(), 3);
        assert_eq!(c.retry().attempts, 3);
        assert_eq!(pending_delay(&c), Duration::from_millis(60_000));
    }
}
