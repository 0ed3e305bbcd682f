//! The transport scheduler
//!
//! Maps the running audio clock to discrete grid steps and decides, per step,
//! which rows of which tracks fire. One [`Schedule`] is one generation of the
//! step loop: built over a fixed (tracks, resolution, bars, key) shape and
//! torn down wholesale when any of those change. Replacing the schedule is
//! also the cancellation mechanism: ticks belong to a generation, and a
//! superseded generation has no state left to fire from.
//!
//! Tempo is not part of the shape. The step interval is re-read from the song
//! on every tick, so tempo changes take effect immediately without a rebuild.

use crossbeam_channel::Sender;
use gridloop_core::Song;
use tracing::trace;

use crate::slots::{NoteLength, SlotPool};

/// One playhead frame on the visual channel.
///
/// The channel is best-effort: draw commits may lag the audio event and the
/// renderer may coalesce frames, but frames always arrive in step order and
/// carry the audio-clock time they correspond to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayheadFrame {
    pub step: usize,
    /// Audio-clock time the step fired at
    pub at: f64,
    /// Schedule generation the frame belongs to
    pub generation: u64,
}

/// One generation of the repeating step sequence. Starts at step 0; steps fire
/// in increasing index order, exactly once each per loop iteration.
#[derive(Debug)]
pub struct Schedule {
    generation: u64,
    total_steps: usize,
    /// Next step index to fire
    step: usize,
    /// Clock time the next step is due
    next_due: f64,
}

impl Schedule {
    pub fn new(generation: u64, total_steps: usize, start: f64) -> Self {
        Self {
            generation,
            total_steps: total_steps.max(1),
            step: 0,
            next_due: start,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Move the whole timeline forward, e.g. across a pause
    pub fn shift(&mut self, delta: f64) {
        self.next_due += delta;
    }

    /// Fire every step due at `now`, in order, exactly once each.
    ///
    /// The song is read fresh on every tick, which is what keeps mute, solo,
    /// tempo and note edits live without a rebuild; structural changes replace
    /// the schedule instead of reaching this path. Returns the last step index
    /// fired, if any.
    pub fn run_due(
        &mut self,
        now: f64,
        song: &Song,
        pool: &mut SlotPool,
        playhead: &Sender<PlayheadFrame>,
    ) -> Option<usize> {
        let mut last = None;
        while self.next_due <= now {
            let at = self.next_due;
            let step = self.step;
            self.fire(step, at, song, pool, playhead);
            last = Some(step);
            self.step = (self.step + 1) % self.total_steps;
            self.next_due = at + song.settings.resolution.step_secs(song.settings.tempo);
        }
        last
    }

    /// One tick: publish the playhead frame, then trigger every audible row
    /// whose step set contains this position.
    fn fire(
        &self,
        step: usize,
        at: f64,
        song: &Song,
        pool: &mut SlotPool,
        playhead: &Sender<PlayheadFrame>,
    ) {
        let _ = playhead.send(PlayheadFrame {
            step,
            at,
            generation: self.generation,
        });

        // Position in bars from loop start; stored note positions use the
        // same measure
        let abs_pos = step as f64 / song.settings.resolution.steps_per_bar() as f64;
        let any_solo = song.has_solo();
        trace!(step, at, "tick");

        for track in &song.tracks {
            if !track.audible(any_solo) {
                continue;
            }
            for (row, set) in track.steps.iter().enumerate() {
                if !set.contains(abs_pos) {
                    continue;
                }
                // Rows left over from a wider scale resolve to no pitch and
                // stay silent
                let Some(pitch) = song.row_pitch(track, row) else {
                    continue;
                };
                pool.trigger(track.id, row, Some(pitch), NoteLength::Eighth, at);
            }
        }
    }
}
