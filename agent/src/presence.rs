//! Counts other players to decide when the agent hides itself

use crate::responder::ServerCommand;

/// Tracks how many other participants are in the world.
///
/// The agent hides as soon as someone else is around and reveals itself
/// again once the world is empty.
#[derive(Debug)]
pub struct PresenceTracker {
    own_identity: String,
    count: u32,
}

impl PresenceTracker {
    pub fn new(own_identity: impl Into<String>) -> Self {
        Self {
            own_identity: own_identity.into(),
            count: 0,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Forgets everyone, e.g. before a new session re-announces the roster.
    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Returns the hide command on the 0 → 1 transition.
    pub fn on_join(&mut self, identity: &str) -> Option<ServerCommand> {
        if identity == self.own_identity {
            return None;
        }
        self.count = self.count.saturating_add(1);
        (self.count == 1).then_some(ServerCommand::VanishOn)
    }

    /// Returns the unhide command whenever a leave leaves the world empty,
    /// including a leave that arrives while the count is already zero.
    pub fn on_leave(&mut self, identity: &str) -> Option<ServerCommand> {
        if identity == self.own_identity {
            return None;
        }
        self.count = self.count.saturating_sub(1);
        (self.count == 0).then_some(ServerCommand::VanishOff)
    }
}
