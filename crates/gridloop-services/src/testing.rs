//! Test doubles for the engine: a hand-advanced clock and recording slots.
//!
//! Public so downstream collaborators (renderers, synth backends) can reuse
//! them when testing against the engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use gridloop_core::{InstrumentKind, TrackId, DRUM_ROWS};

use crate::clock::{AudioClock, ClockError, ClockState};
use crate::slots::{NoteLength, NoteSlot, SlotError, SlotFactory};

/// Maximum rows a melodic track can show; every melodic track allocates this
/// many slots so a scale change never needs a reallocation.
const MELODIC_SLOTS: usize = 8;

#[derive(Debug, Default)]
struct ManualClockInner {
    now: f64,
    state: ClockState,
    hold_resume: bool,
    resume_requested: bool,
    fail_resume: bool,
}

/// Hand-advanced clock. Clones share state, so tests keep a handle while the
/// sequencer owns the clock.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    inner: Arc<Mutex<ManualClockInner>>,
}

impl ManualClock {
    /// Suspended clock at t = 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock that is already warmed up
    pub fn running() -> Self {
        let clock = Self::new();
        clock.inner.lock().unwrap().state = ClockState::Running;
        clock
    }

    pub fn advance(&self, secs: f64) {
        self.inner.lock().unwrap().now += secs;
    }

    pub fn set(&self, now: f64) {
        self.inner.lock().unwrap().now = now;
    }

    /// Keep the clock suspended across resume requests, modelling a warm-up
    /// that has not completed yet
    pub fn hold_resume(&self, hold: bool) {
        self.inner.lock().unwrap().hold_resume = hold;
    }

    /// Complete a held warm-up: the clock starts running if a resume was
    /// requested while held
    pub fn complete_resume(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.resume_requested {
            inner.state = ClockState::Running;
        }
    }

    /// Make resume requests fail outright
    pub fn fail_resume(&self, fail: bool) {
        self.inner.lock().unwrap().fail_resume = fail;
    }
}

impl AudioClock for ManualClock {
    fn now(&self) -> f64 {
        self.inner.lock().unwrap().now
    }

    fn state(&self) -> ClockState {
        self.inner.lock().unwrap().state
    }

    fn resume(&mut self) -> Result<(), ClockError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_resume {
            return Err(ClockError("activation blocked".into()));
        }
        if inner.hold_resume {
            inner.resume_requested = true;
        } else {
            inner.state = ClockState::Running;
        }
        Ok(())
    }
}

/// Everything a slot was asked to do
#[derive(Debug, Clone, PartialEq)]
pub enum SlotEvent {
    Trigger {
        track: TrackId,
        row: usize,
        pitch: Option<String>,
        length: NoteLength,
        at: f64,
    },
    SetVolume {
        track: TrackId,
        row: usize,
        db: f32,
    },
    ReleaseAll {
        track: TrackId,
        row: usize,
    },
}

/// Shared, cloneable log of slot calls
#[derive(Debug, Clone, Default)]
pub struct SlotLog(Arc<Mutex<Vec<SlotEvent>>>);

impl SlotLog {
    pub fn events(&self) -> Vec<SlotEvent> {
        self.0.lock().unwrap().clone()
    }

    /// Only the trigger events, in order
    pub fn triggers(&self) -> Vec<SlotEvent> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, SlotEvent::Trigger { .. }))
            .collect()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    fn record(&self, event: SlotEvent) {
        self.0.lock().unwrap().push(event);
    }
}

/// Recording slot bound to one (track, row)
struct MemorySlot {
    track: TrackId,
    row: usize,
    log: SlotLog,
}

impl NoteSlot for MemorySlot {
    fn trigger(&mut self, pitch: Option<&str>, length: NoteLength, at: f64) {
        self.log.record(SlotEvent::Trigger {
            track: self.track,
            row: self.row,
            pitch: pitch.map(str::to_owned),
            length,
            at,
        });
    }

    fn set_volume(&mut self, db: f32) {
        self.log.record(SlotEvent::SetVolume {
            track: self.track,
            row: self.row,
            db,
        });
    }

    fn release_all(&mut self) {
        self.log.record(SlotEvent::ReleaseAll {
            track: self.track,
            row: self.row,
        });
    }
}

/// Factory producing recording slots; can be switched to fail for testing the
/// fatal rebuild path
#[derive(Debug, Clone, Default)]
pub struct MemoryFactory {
    log: SlotLog,
    fail: Arc<AtomicBool>,
}

impl MemoryFactory {
    pub fn new(log: SlotLog) -> Self {
        Self {
            log,
            fail: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl SlotFactory for MemoryFactory {
    fn build(
        &mut self,
        id: TrackId,
        kind: InstrumentKind,
    ) -> Result<Vec<Box<dyn NoteSlot>>, SlotError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SlotError("out of voices".into()));
        }
        let rows = match kind {
            InstrumentKind::Drums => DRUM_ROWS.len(),
            _ => MELODIC_SLOTS,
        };
        Ok((0..rows)
            .map(|row| {
                Box::new(MemorySlot {
                    track: id,
                    row,
                    log: self.log.clone(),
                }) as Box<dyn NoteSlot>
            })
            .collect())
    }
}
