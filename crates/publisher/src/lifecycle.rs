//! Connection state machine.
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// Transport open, registration not confirmed yet.
    Connected,
    /// Welcomed by the server; publishing is possible.
    Active,
    /// Terminal.
    Stopped,
}

/// Tracks the connection phase and when it was entered.
///
/// Only [`Phase::Disconnected`] may start a connection attempt, which keeps
/// attempts exclusive. Every transition out of [`Phase::Stopped`] is ignored.
#[derive(Debug)]
pub struct Lifecycle {
    phase: Phase,
    since: Instant,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self {
            phase: Phase::Disconnected,
            since: Instant::now(),
        }
    }
}

impl Lifecycle {
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Registered and able to publish.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.phase == Phase::Active
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.phase == Phase::Stopped
    }

    /// Time spent in the current phase.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.since.elapsed()
    }

    /// Claim the right to connect. `false` when an attempt is already in
    /// flight, a connection is up, or the engine is stopping.
    pub fn begin_connect(&mut self) -> bool {
        if self.phase != Phase::Disconnected {
            return false;
        }
        self.enter(Phase::Connecting);
        true
    }

    pub fn connected(&mut self) {
        if self.phase == Phase::Connecting {
            self.enter(Phase::Connected);
        }
    }

    pub fn welcomed(&mut self) {
        if matches!(self.phase, Phase::Connecting | Phase::Connected) {
            self.enter(Phase::Active);
        }
    }

    pub fn disconnected(&mut self) {
        if self.phase != Phase::Stopped {
            self.enter(Phase::Disconnected);
        }
    }

    /// Idempotent.
    pub fn stop(&mut self) {
        if self.phase != Phase::Stopped {
            self.enter(Phase::Stopped);
        }
    }

    fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        self.since = Instant::now();
    }
}
