//! Idle chat: a keep-alive line in public chat every few minutes

use crate::session::{OpOutcome, Session, SessionSlot};
use log::info;
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

pub const CHAT_PERIOD: Duration = Duration::from_secs(10 * 60);

pub const IDLE_MESSAGES: [&str; 5] = [
    "Keeping the server alive!",
    "AFK but online 😎",
    "Hello everyone!",
    "I'm a bot 🤖",
    "Ping me if you need me!",
];

pub struct IdleChat {
    period: Duration,
    interval: Option<Interval>,
}

impl IdleChat {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    pub fn start(&mut self, now: Instant) {
        let mut interval = interval_at(now + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.interval = Some(interval);
    }

    pub fn stop(&mut self) {
        self.interval = None;
    }

    pub fn is_active(&self) -> bool {
        self.interval.is_some()
    }

    pub async fn next_tick(&mut self) -> Instant {
        match self.interval.as_mut() {
            Some(interval) => interval.tick().await,
            None => std::future::pending().await,
        }
    }

    pub fn pick<R: Rng>(rng: &mut R) -> &'static str {
        IDLE_MESSAGES.choose(rng).copied().unwrap_or(IDLE_MESSAGES[0])
    }

    pub fn tick<S: Session, R: Rng>(&self, session: &mut SessionSlot<S>, rng: &mut R) {
        let message = Self::pick(rng);
        if session.chat(message) == OpOutcome::Applied {
            info!("Idle chat: {}", message);
        }
    }
}

impl Default for IdleChat {
    fn default() -> Self {
        Self::new(CHAT_PERIOD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::{MockSession, Recorder};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_pick_covers_every_message() {
        let mut rng = StdRng::seed_from_u64(3);
        let seen: HashSet<&str> = (0..500).map(|_| IdleChat::pick(&mut rng)).collect();
        assert_eq!(seen.len(), IDLE_MESSAGES.len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_sends_one_message() {
        let recorder = Recorder::default();
        let mut slot = SessionSlot::new();
        slot.install(MockSession::new(recorder.clone()));
        let mut rng = StdRng::seed_from_u64(9);
        let now = Instant::now();

        let mut chat = IdleChat::default();
        chat.start(now);
        assert_eq!(chat.next_tick().await, now + CHAT_PERIOD);
        chat.tick(&mut slot, &mut rng);

        let sent = recorder.chats();
        assert_eq!(sent.len(), 1);
        assert!(IDLE_MESSAGES.contains(&sent[0].as_str()));
        assert_eq!(chat.next_tick().await, now + CHAT_PERIOD * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_twice_is_harmless() {
        let mut chat = IdleChat::default();
        chat.start(Instant::now());
        chat.stop();
        chat.stop();
        assert!(!chat.is_active());

        let mut next = tokio_test::task::spawn(chat.next_tick());
        tokio_test::assert_pending!(next.poll());
    }
}
