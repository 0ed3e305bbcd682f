//! Song settings and the track store

use serde::{Deserialize, Serialize};

use crate::error::{GridloopError, Result};
use crate::pitch::{pitches, InstrumentKind, Key, Scale, DRUM_ROWS, DRUM_TRIGGER_PITCH};
use crate::track::{Track, TrackId};

/// Grid resolution: the note value one step represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "4n")]
    Quarter,
    #[default]
    #[serde(rename = "8n")]
    Eighth,
    #[serde(rename = "16n")]
    Sixteenth,
}

impl Resolution {
    /// Steps in one 4/4 bar at this resolution
    pub fn steps_per_bar(&self) -> usize {
        match self {
            Self::Quarter => 4,
            Self::Eighth => 8,
            Self::Sixteenth => 16,
        }
    }

    /// Length of one step in seconds at the given tempo
    pub fn step_secs(&self, tempo_bpm: u16) -> f64 {
        let bar = 4.0 * 60.0 / tempo_bpm as f64;
        bar / self.steps_per_bar() as f64
    }
}

/// Global song parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SongSettings {
    /// Tempo in BPM, 60 to 180
    pub tempo: u16,
    pub resolution: Resolution,
    /// Loop length in bars, 1 to 8
    pub bars: u8,
    /// Applied uniformly at trigger time; never stored per track
    pub key: Key,
    /// Applied to newly added and globally-reset melodic tracks
    pub scale: Scale,
}

impl Default for SongSettings {
    fn default() -> Self {
        Self {
            tempo: 110,
            resolution: Resolution::Eighth,
            bars: 2,
            key: Key::C,
            scale: Scale::Pentatonic,
        }
    }
}

impl SongSettings {
    /// Clamp every numeric field into its legal range
    pub fn sanitize(&mut self) {
        self.tempo = self.tempo.clamp(60, 180);
        self.bars = self.bars.clamp(1, 8);
    }
}

/// Outcome of a step toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepToggle {
    /// The position was inserted; callers preview-trigger the row once
    Added,
    /// The position was removed
    Removed,
    /// Unknown track or stale row index; nothing changed
    Ignored,
}

/// Partial track update, merged field by field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackUpdate {
    pub volume: Option<i32>,
    pub muted: Option<bool>,
    pub solo: Option<bool>,
}

/// The track store: single source of truth for what should play
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    pub settings: SongSettings,
    pub tracks: Vec<Track>,
    next_track_id: u64,
}

impl Song {
    pub fn new(settings: SongSettings) -> Self {
        Self {
            settings,
            tracks: Vec::new(),
            next_track_id: 1,
        }
    }

    /// The fallback song: one empty drum track
    pub fn default_song() -> Self {
        let mut song = Self::new(SongSettings::default());
        song.add_track(InstrumentKind::Drums);
        song
    }

    /// Rebuild a song from decoded parts, reseeding the id counter past every
    /// existing track id
    pub fn from_parts(mut settings: SongSettings, tracks: Vec<Track>) -> Self {
        settings.sanitize();
        let next_track_id = tracks.iter().map(|t| t.id.0).max().map_or(1, |m| m + 1);
        Self {
            settings,
            tracks,
            next_track_id,
        }
    }

    pub fn add_track(&mut self, kind: InstrumentKind) -> TrackId {
        let id = TrackId(self.next_track_id);
        self.next_track_id += 1;
        self.tracks.push(Track::new(id, kind, self.settings.scale));
        id
    }

    pub fn remove_track(&mut self, id: TrackId) -> Option<Track> {
        let pos = self.tracks.iter().position(|t| t.id == id)?;
        Some(self.tracks.remove(pos))
    }

    pub fn get_track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn get_track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    pub fn has_solo(&self) -> bool {
        self.tracks.iter().any(|t| t.solo)
    }

    pub fn should_play(&self, track: &Track) -> bool {
        track.audible(self.has_solo())
    }

    /// Toggle one grid cell. Unknown ids and stale row indices are no-ops, not
    /// errors; they are expected under grid-resize races with the UI.
    pub fn toggle_step(&mut self, id: TrackId, row: usize, pos: f64) -> StepToggle {
        let Some(track) = self.get_track_mut(id) else {
            return StepToggle::Ignored;
        };
        let Some(set) = track.steps.get_mut(row) else {
            return StepToggle::Ignored;
        };
        if set.toggle(pos) {
            StepToggle::Added
        } else {
            StepToggle::Removed
        }
    }

    /// Merge a partial update into a track. Volume is clamped to -40..=5 dB.
    pub fn update_track(&mut self, id: TrackId, update: TrackUpdate) -> Result<()> {
        let track = self
            .get_track_mut(id)
            .ok_or(GridloopError::TrackNotFound(id))?;
        if let Some(db) = update.volume {
            track.volume = db.clamp(-40, 5);
        }
        if let Some(muted) = update.muted {
            track.muted = muted;
        }
        if let Some(solo) = update.solo {
            track.solo = solo;
        }
        Ok(())
    }

    /// Change the global scale and key. Every melodic track is re-laid-out
    /// under the new scale with its notes cleared: the rows mean different
    /// pitches afterwards, so keeping placements would be misleading.
    pub fn apply_global_scale_key(&mut self, scale: Scale, key: Key) {
        self.settings.scale = scale;
        self.settings.key = key;
        for track in &mut self.tracks {
            if track.kind.is_melodic() {
                track.reset_rows(scale);
            }
        }
    }

    /// Pitch for one row of a track under the current global key, if the row
    /// is currently mapped. Drum rows resolve to the fixed percussion trigger
    /// pitch; rows beyond the active pitch table resolve to nothing.
    pub fn row_pitch(&self, track: &Track, row: usize) -> Option<&'static str> {
        match track.kind {
            InstrumentKind::Drums => (row < DRUM_ROWS.len()).then_some(DRUM_TRIGGER_PITCH),
            _ => pitches(track.kind, track.scale, self.settings.key)
                .get(row)
                .copied(),
        }
    }

    /// Steps in one full loop
    pub fn total_steps(&self) -> usize {
        self.settings.bars as usize * self.settings.resolution.steps_per_bar()
    }

    pub fn set_tempo(&mut self, bpm: u16) {
        self.settings.tempo = bpm.clamp(60, 180);
    }

    pub fn set_bars(&mut self, bars: u8) {
        self.settings.bars = bars.clamp(1, 8);
    }

    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.settings.resolution = resolution;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_steps_is_bars_times_steps_per_bar() {
        let mut song = Song::new(SongSettings::default());
        song.set_resolution(Resolution::Quarter);
        song.set_bars(1);
        assert_eq!(song.total_steps(), 4);
        song.set_resolution(Resolution::Sixteenth);
        song.set_bars(8);
        assert_eq!(song.total_steps(), 128);
    }

    #[test]
    fn step_secs_follows_tempo() {
        // 120 BPM: a bar is two seconds
        assert_eq!(Resolution::Quarter.step_secs(120), 0.5);
        assert_eq!(Resolution::Eighth.step_secs(120), 0.25);
        assert_eq!(Resolution::Sixteenth.step_secs(120), 0.125);
    }

    #[test]
    fn added_tracks_follow_global_scale() {
        let mut song = Song::new(SongSettings::default());
        let id = song.add_track(InstrumentKind::Guitar);
        assert_eq!(song.get_track(id).unwrap().row_count(), 5);

        song.apply_global_scale_key(Scale::Whole, Key::G);
        let id = song.add_track(InstrumentKind::Bass);
        assert_eq!(song.get_track(id).unwrap().row_count(), 8);
    }

    #[test]
    fn toggle_step_is_idempotent_and_guarded() {
        let mut song = Song::default_song();
        let id = song.tracks[0].id;

        assert_eq!(song.toggle_step(id, 0, 0.5), StepToggle::Added);
        assert_eq!(song.toggle_step(id, 0, 0.5), StepToggle::Removed);
        assert!(song.tracks[0].steps[0].is_empty());

        // Stale row index and unknown track are no-ops
        assert_eq!(song.toggle_step(id, 99, 0.0), StepToggle::Ignored);
        assert_eq!(song.toggle_step(TrackId(999), 0, 0.0), StepToggle::Ignored);
    }

    #[test]
    fn update_track_clamps_volume() {
        let mut song = Song::default_song();
        let id = song.tracks[0].id;

        song.update_track(
            id,
            TrackUpdate {
                volume: Some(40),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(song.get_track(id).unwrap().volume, 5);

        song.update_track(
            id,
            TrackUpdate {
                volume: Some(-80),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(song.get_track(id).unwrap().volume, -40);

        assert!(song.update_track(TrackId(999), TrackUpdate::default()).is_err());
    }

    #[test]
    fn solo_restricts_playback_to_unmuted_solo_tracks() {
        let mut song = Song::new(SongSettings::default());
        let a = song.add_track(InstrumentKind::Drums);
        let b = song.add_track(InstrumentKind::Bass);
        let c = song.add_track(InstrumentKind::Guitar);

        song.update_track(a, TrackUpdate { solo: Some(true), ..Default::default() }).unwrap();
        song.update_track(
            c,
            TrackUpdate {
                solo: Some(true),
                muted: Some(true),
                ..Default::default()
            },
        )
        .unwrap();

        let get = |song: &Song, id| song.should_play(song.get_track(id).unwrap());
        assert!(get(&song, a));
        assert!(!get(&song, b));
        assert!(!get(&song, c));
    }

    #[test]
    fn scale_key_change_clears_melodic_tracks_only() {
        let mut song = Song::new(SongSettings::default());
        let drums = song.add_track(InstrumentKind::Drums);
        let bass = song.add_track(InstrumentKind::Bass);
        song.toggle_step(drums, 0, 0.0);
        song.toggle_step(bass, 2, 0.25);

        song.apply_global_scale_key(Scale::Whole, Key::G);

        let bass = song.get_track(bass).unwrap();
        assert_eq!(bass.row_count(), 8);
        assert!(bass.steps.iter().all(|s| s.is_empty()));
        assert_eq!(bass.scale, Scale::Whole);

        // Drum placements survive
        assert_eq!(song.get_track(drums).unwrap().steps[0].len(), 1);
    }

    #[test]
    fn row_pitch_resolves_per_kind() {
        let mut song = Song::new(SongSettings::default());
        let drums = song.add_track(InstrumentKind::Drums);
        let bass = song.add_track(InstrumentKind::Bass);

        let drums = song.get_track(drums).unwrap().clone();
        let bass = song.get_track(bass).unwrap().clone();

        assert_eq!(song.row_pitch(&drums, 0), Some(DRUM_TRIGGER_PITCH));
        assert_eq!(song.row_pitch(&drums, 6), Some(DRUM_TRIGGER_PITCH));
        assert_eq!(song.row_pitch(&drums, 7), None);
        assert_eq!(song.row_pitch(&bass, 0), Some("C2"));
        // Stale rows past the pitch table stay silent
        assert_eq!(song.row_pitch(&bass, 5), None);
    }

    #[test]
    fn from_parts_reseeds_ids_and_sanitizes() {
        let tracks = vec![Track::new(TrackId(7), InstrumentKind::Drums, Scale::Pentatonic)];
        let mut settings = SongSettings::default();
        settings.tempo = 999;
        settings.bars = 0;

        let mut song = Song::from_parts(settings, tracks);
        assert_eq!(song.settings.tempo, 180);
        assert_eq!(song.settings.bars, 1);
        assert_eq!(song.add_track(InstrumentKind::Bass), TrackId(8));
    }
}
