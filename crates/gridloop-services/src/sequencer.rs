//! The sequencer facade
//!
//! Owns the track store, the slot pool, the audio clock and the current
//! schedule generation, and exposes the event surface a renderer drives:
//! grid edits, track updates, transport commands, settings changes, undo and
//! song load/share. Structural changes (track list, resolution, bars, key)
//! tear the schedule down and install a fresh generation; mute, solo, volume
//! and tempo are picked up live by the running schedule instead.

use crossbeam_channel::{unbounded, Receiver, Sender};
use gridloop_core::{
    decode_song, encode_song, GridloopError, History, InstrumentKind, Key, Resolution, Scale,
    Song, SongSettings, StepToggle, Track, TrackId, TrackUpdate,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::clock::{AudioClock, ClockError, ClockState};
use crate::scheduler::{PlayheadFrame, Schedule};
use crate::slots::{NoteLength, SlotError, SlotFactory, SlotPool};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Audio clock error: {0}")]
    Clock(#[from] ClockError),
    #[error("Schedule rebuild failed: {0}")]
    Rebuild(#[from] SlotError),
    #[error(transparent)]
    Core(#[from] GridloopError),
}

/// Transport state. Pause holds the playhead; only stop clears it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// The engine facade over one song
pub struct Sequencer<C: AudioClock, F: SlotFactory> {
    song: Song,
    history: History<Vec<Track>>,
    pool: SlotPool,
    factory: F,
    clock: C,
    state: PlayState,
    /// Play was requested while the clock warm-up was still pending
    pending_play: bool,
    schedule: Option<Schedule>,
    generation: u64,
    paused_at: f64,
    current_step: Option<usize>,
    playhead_tx: Sender<PlayheadFrame>,
    playhead_rx: Receiver<PlayheadFrame>,
}

impl<C: AudioClock, F: SlotFactory> Sequencer<C, F> {
    /// Engine over the default song (one empty drum track)
    pub fn new(clock: C, factory: F) -> Result<Self, EngineError> {
        let (playhead_tx, playhead_rx) = unbounded();
        let mut sequencer = Self {
            song: Song::default_song(),
            history: History::new(),
            pool: SlotPool::new(),
            factory,
            clock,
            state: PlayState::Stopped,
            pending_play: false,
            schedule: None,
            generation: 0,
            paused_at: 0.0,
            current_step: None,
            playhead_tx,
            playhead_rx,
        };
        sequencer.sync_pool()?;
        Ok(sequencer)
    }

    // ── Observable state ────────────────────────────────────────────

    pub fn song(&self) -> &Song {
        &self.song
    }

    pub fn tracks(&self) -> &[Track] {
        &self.song.tracks
    }

    pub fn settings(&self) -> &SongSettings {
        &self.song.settings
    }

    pub fn current_step(&self) -> Option<usize> {
        self.current_step
    }

    pub fn play_state(&self) -> PlayState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayState::Playing
    }

    /// Best-effort visual channel: playhead frames in step order
    pub fn playhead(&self) -> Receiver<PlayheadFrame> {
        self.playhead_rx.clone()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ── Grid and track edits ────────────────────────────────────────

    /// Toggle one grid cell. Newly inserted steps preview once for immediate
    /// feedback. Stale rows and unknown tracks are silent no-ops.
    pub fn toggle_step(&mut self, id: TrackId, row: usize, pos: f64) -> StepToggle {
        // The first edit gesture may be what warms the clock up
        if let Err(e) = self.clock.resume() {
            warn!(error = %e, "audio clock resume failed");
        }
        let snapshot = self.song.tracks.clone();
        let outcome = self.song.toggle_step(id, row, pos);
        match outcome {
            StepToggle::Added => {
                self.history.push(snapshot);
                self.preview(id, row);
                self.rebuild();
            }
            StepToggle::Removed => {
                self.history.push(snapshot);
                self.rebuild();
            }
            StepToggle::Ignored => {}
        }
        outcome
    }

    pub fn add_track(&mut self, kind: InstrumentKind) -> Result<TrackId, EngineError> {
        self.history.push(self.song.tracks.clone());
        let id = self.song.add_track(kind);
        if let Err(e) = self.pool.ensure(&mut self.factory, id, kind) {
            self.fail_playback();
            return Err(EngineError::Rebuild(e));
        }
        self.rebuild();
        info!(track = %id, ?kind, "track added");
        Ok(id)
    }

    pub fn remove_track(&mut self, id: TrackId) -> Option<Track> {
        self.song.get_track(id)?;
        self.history.push(self.song.tracks.clone());
        let removed = self.song.remove_track(id);
        self.pool.release(id);
        self.rebuild();
        info!(track = %id, "track removed");
        removed
    }

    /// Merge volume/mute/solo changes. Volume reaches the live slots
    /// synchronously; the running schedule reads mute and solo fresh on every
    /// tick, so no rebuild is needed here.
    pub fn update_track(&mut self, id: TrackId, update: TrackUpdate) -> Result<(), EngineError> {
        if update.muted.is_some() || update.solo.is_some() {
            self.history.push(self.song.tracks.clone());
        }
        self.song.update_track(id, update)?;
        if update.volume.is_some() {
            if let Some(track) = self.song.get_track(id) {
                self.pool.set_volume(id, track.volume as f32);
            }
        }
        Ok(())
    }

    // ── Settings ────────────────────────────────────────────────────

    /// Applied immediately to the live step interval; no rebuild
    pub fn set_tempo(&mut self, bpm: u16) {
        self.song.set_tempo(bpm);
    }

    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.song.set_resolution(resolution);
        self.rebuild();
    }

    pub fn set_bars(&mut self, bars: u8) {
        self.song.set_bars(bars);
        self.rebuild();
    }

    pub fn apply_global_scale_key(&mut self, scale: Scale, key: Key) {
        self.history.push(self.song.tracks.clone());
        self.song.apply_global_scale_key(scale, key);
        self.rebuild();
        info!(?scale, ?key, "global scale/key applied");
    }

    // ── History ─────────────────────────────────────────────────────

    pub fn undo(&mut self) -> Result<bool, EngineError> {
        let Some(previous) = self.history.undo(self.song.tracks.clone()) else {
            return Ok(false);
        };
        self.song.tracks = previous;
        self.sync_pool()?;
        self.rebuild();
        Ok(true)
    }

    pub fn redo(&mut self) -> Result<bool, EngineError> {
        let Some(next) = self.history.redo(self.song.tracks.clone()) else {
            return Ok(false);
        };
        self.song.tracks = next;
        self.sync_pool()?;
        self.rebuild();
        Ok(true)
    }

    // ── Persistence ─────────────────────────────────────────────────

    pub fn encode(&self) -> Result<String, EngineError> {
        Ok(encode_song(&self.song)?)
    }

    /// Replace the song with a decoded share string. On decode failure the
    /// current song is left untouched.
    pub fn load_encoded(&mut self, encoded: &str) -> Result<(), EngineError> {
        let song = decode_song(encoded)?;
        self.install_song(song)
    }

    /// Like [`Sequencer::load_encoded`], but undecodable input falls back to
    /// the default song instead of failing
    pub fn load_or_default(&mut self, encoded: &str) -> Result<(), EngineError> {
        match decode_song(encoded) {
            Ok(song) => self.install_song(song),
            Err(e) => {
                warn!(error = %e, "undecodable song string, loading default");
                self.install_song(Song::default_song())
            }
        }
    }

    fn install_song(&mut self, song: Song) -> Result<(), EngineError> {
        self.stop();
        self.song = song;
        self.history.clear();
        // The one place the side table is rebuilt from scratch
        self.pool.clear();
        self.sync_pool()?;
        Ok(())
    }

    // ── Transport ───────────────────────────────────────────────────

    /// Start playback. If the audio clock is still warming up, the intent is
    /// queued and playback begins transparently once the clock runs.
    pub fn play(&mut self) -> Result<(), EngineError> {
        self.clock.resume()?;
        if self.clock.state() != ClockState::Running {
            debug!("clock warm-up pending, queueing playback intent");
            self.pending_play = true;
            return Ok(());
        }
        self.begin_playback();
        Ok(())
    }

    /// Halt and hold the playhead; sounding notes are released
    pub fn pause(&mut self) {
        if self.state != PlayState::Playing {
            return;
        }
        self.paused_at = self.clock.now();
        self.state = PlayState::Paused;
        self.pool.release_all();
        info!("transport paused");
    }

    /// Halt, clear the playhead and silence everything
    pub fn stop(&mut self) {
        self.state = PlayState::Stopped;
        self.pending_play = false;
        self.schedule = None;
        self.current_step = None;
        self.pool.release_all();
        info!("transport stopped");
    }

    pub fn toggle(&mut self) -> Result<(), EngineError> {
        if self.state == PlayState::Playing {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Cooperative pump, called by the host at frame or callback rate. Fires
    /// every due tick in order and completes a queued play intent once the
    /// clock is warm.
    pub fn process(&mut self) {
        if self.pending_play && self.clock.state() == ClockState::Running {
            self.pending_play = false;
            self.begin_playback();
        }
        if self.state != PlayState::Playing {
            return;
        }
        let now = self.clock.now();
        let Some(schedule) = self.schedule.as_mut() else {
            return;
        };
        if let Some(step) = schedule.run_due(now, &self.song, &mut self.pool, &self.playhead_tx) {
            self.current_step = Some(step);
        }
    }

    // ── Internals ───────────────────────────────────────────────────

    fn begin_playback(&mut self) {
        if self.state == PlayState::Playing {
            return;
        }
        let now = self.clock.now();
        match self.state {
            PlayState::Paused if self.schedule.is_some() => {
                let delta = now - self.paused_at;
                if let Some(schedule) = self.schedule.as_mut() {
                    schedule.shift(delta);
                }
            }
            _ => self.install_schedule(now),
        }
        self.state = PlayState::Playing;
        info!("transport playing");
    }

    fn install_schedule(&mut self, start: f64) {
        self.generation += 1;
        self.schedule = Some(Schedule::new(self.generation, self.song.total_steps(), start));
        debug!(generation = self.generation, "schedule installed");
    }

    /// Tear down the current generation and start a fresh one over the
    /// updated song shape. Pending ticks of the old generation die with it;
    /// the loop restarts at step 0 rather than resuming mid-phase.
    fn rebuild(&mut self) {
        if self.schedule.is_none() {
            return;
        }
        let now = self.clock.now();
        self.install_schedule(now);
        if self.state == PlayState::Paused {
            self.paused_at = now;
        }
    }

    fn sync_pool(&mut self) -> Result<(), EngineError> {
        if let Err(e) = self.pool.sync(&mut self.factory, &self.song.tracks) {
            self.fail_playback();
            return Err(EngineError::Rebuild(e));
        }
        Ok(())
    }

    fn fail_playback(&mut self) {
        error!("slot allocation failed, stopping playback");
        self.stop();
    }

    /// Sound a row once for immediate edit feedback
    fn preview(&mut self, id: TrackId, row: usize) {
        if self.clock.state() != ClockState::Running {
            return;
        }
        let Some(track) = self.song.get_track(id) else {
            return;
        };
        let Some(pitch) = self.song.row_pitch(track, row) else {
            return;
        };
        let now = self.clock.now();
        self.pool
            .trigger(id, row, Some(pitch), NoteLength::Sixteenth, now);
    }
}
