//! Idle motion: random movement flags and facing to look like a player

use crate::session::{Session, SessionSlot};
use log::debug;
use rand::Rng;
use shared::MotionFlag;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

pub const MOTION_PERIOD: Duration = Duration::from_secs(5);

/// Flags sampled on every tick and the chance each one is held.
pub const FLAG_PROBABILITIES: [(MotionFlag, f64); 5] = [
    (MotionFlag::Forward, 0.7),
    (MotionFlag::Left, 0.5),
    (MotionFlag::Right, 0.5),
    (MotionFlag::Jump, 0.3),
    (MotionFlag::Sneak, 0.2),
];

/// One tick worth of motion.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionSample {
    pub flags: [(MotionFlag, bool); 5],
    pub yaw: f32,
    pub pitch: f32,
}

impl MotionSample {
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let flags = FLAG_PROBABILITIES.map(|(flag, p)| (flag, rng.gen_bool(p)));
        Self {
            flags,
            yaw: rng.gen_range(0.0..360.0),
            pitch: rng.gen_range(-90.0..90.0),
        }
    }
}

pub struct IdleMotion {
    period: Duration,
    interval: Option<Interval>,
}

impl IdleMotion {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    /// Schedules the first tick one period after `now`.
    pub fn start(&mut self, now: Instant) {
        let mut interval = interval_at(now + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.interval = Some(interval);
    }

    /// Stops ticking and releases every movement flag.
    pub fn stop<S: Session>(&mut self, session: &mut SessionSlot<S>) {
        self.interval = None;
        for flag in MotionFlag::ALL {
            session.set_motion_flag(flag, false);
        }
    }

    pub fn is_active(&self) -> bool {
        self.interval.is_some()
    }

    /// Resolves at the next scheduled tick; never resolves while stopped.
    pub async fn next_tick(&mut self) -> Instant {
        match self.interval.as_mut() {
            Some(interval) => interval.tick().await,
            None => std::future::pending().await,
        }
    }

    pub fn tick<S: Session, R: Rng>(&self, session: &mut SessionSlot<S>, rng: &mut R) {
        if !session.is_open() {
            return;
        }

        let sample = MotionSample::random(rng);
        for (flag, state) in sample.flags {
            session.set_motion_flag(flag, state);
        }
        session.set_orientation(sample.yaw, sample.pitch);
        debug!(
            "Idle motion: {:?} yaw {:.1} pitch {:.1}",
            sample
                .flags
                .iter()
                .filter(|(_, held)| *held)
                .map(|(flag, _)| flag.as_str())
                .collect::<Vec<_>>(),
            sample.yaw,
            sample.pitch
        );
    }
}

impl Default for IdleMotion {
    fn default() -> Self {
        Self::new(MOTION_PERIOD)
    }
}
