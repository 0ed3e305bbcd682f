//! The audio clock
//!
//! All playback time comes from one logical audio clock. Platform policy may
//! keep that clock suspended until a user gesture, so activation is an
//! explicit, idempotent warm-up step that may complete asynchronously; every
//! transport operation must stay safe to call while the clock is suspended.

use std::time::Instant;

use thiserror::Error;

#[derive(Debug, Error)]
#[error("Audio clock unavailable: {0}")]
pub struct ClockError(pub String);

/// Activation state of the audio clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockState {
    /// Not yet activated; no sound can be produced
    #[default]
    Suspended,
    /// Activated and advancing
    Running,
}

pub trait AudioClock {
    /// Current time in seconds. Only meaningful while running.
    fn now(&self) -> f64;

    fn state(&self) -> ClockState;

    /// Request activation. Idempotent. The clock may stay [`ClockState::Suspended`]
    /// after a successful request and flip to running later; callers poll
    /// [`AudioClock::state`] rather than assuming.
    fn resume(&mut self) -> Result<(), ClockError>;
}

/// Monotonic wall-clock implementation. Suspended until the first resume, as
/// a real audio context would be.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
    state: ClockState,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: ClockState::Suspended,
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioClock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn state(&self) -> ClockState {
        self.state
    }

    fn resume(&mut self) -> Result<(), ClockError> {
        if self.state == ClockState::Suspended {
            self.origin = Instant::now();
            self.state = ClockState::Running;
        }
        Ok(())
    }
}
