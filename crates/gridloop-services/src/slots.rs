//! Note slots: the capability boundary to instrument synthesis
//!
//! The engine never synthesizes sound. Each grid row of each track is bound to
//! one [`NoteSlot`], and [`SlotPool`] is the only holder of those slots: an
//! explicit side table keyed by track id, filled when a track appears and
//! drained when it goes away. Percussion slot implementations ignore the pitch
//! argument, which unifies the trigger interface across instrument kinds.

use std::collections::{HashMap, HashSet};

use gridloop_core::{InstrumentKind, Track, TrackId};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
#[error("Slot allocation failed: {0}")]
pub struct SlotError(pub String);

/// Duration token for triggered notes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteLength {
    /// Scheduled grid hits: shorter than any step interval
    Eighth,
    /// Preview hits from direct edits: shorter still
    Sixteenth,
}

impl NoteLength {
    /// Concrete length in seconds at the given tempo
    pub fn secs(&self, tempo_bpm: u16) -> f64 {
        let beat = 60.0 / tempo_bpm as f64;
        match self {
            Self::Eighth => beat / 2.0,
            Self::Sixteenth => beat / 4.0,
        }
    }
}

/// One addressable sound-producing unit, bound to a single grid row of a
/// single track. Disposal is ownership drop.
pub trait NoteSlot: Send {
    /// Sound the slot at `at` (audio-clock seconds). Percussion ignores
    /// `pitch`; melodic slots stay silent when it is absent.
    fn trigger(&mut self, pitch: Option<&str>, length: NoteLength, at: f64);

    fn set_volume(&mut self, db: f32);

    /// Force-release anything still sounding
    fn release_all(&mut self);
}

/// Builds the per-row slots for one track
pub trait SlotFactory {
    fn build(
        &mut self,
        id: TrackId,
        kind: InstrumentKind,
    ) -> Result<Vec<Box<dyn NoteSlot>>, SlotError>;
}

/// Side table of live slots, keyed by track id. Lifecycle-bound to track
/// existence: entries appear on add/load and are released on removal, never
/// rebuilt wholesale except through [`SlotPool::sync`] on a full song swap.
#[derive(Default)]
pub struct SlotPool {
    entries: HashMap<TrackId, Vec<Box<dyn NoteSlot>>>,
}

impl SlotPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate slots for a track unless it already has some
    pub fn ensure(
        &mut self,
        factory: &mut dyn SlotFactory,
        id: TrackId,
        kind: InstrumentKind,
    ) -> Result<(), SlotError> {
        if !self.entries.contains_key(&id) {
            self.entries.insert(id, factory.build(id, kind)?);
            debug!(track = %id, "slot entry allocated");
        }
        Ok(())
    }

    /// Silence and drop a track's slots
    pub fn release(&mut self, id: TrackId) {
        if let Some(mut slots) = self.entries.remove(&id) {
            for slot in &mut slots {
                slot.release_all();
            }
            debug!(track = %id, "slot entry released");
        }
    }

    /// Align the pool with a track list: allocate missing entries, release
    /// orphaned ones. Used after undo/redo and song loads.
    pub fn sync(&mut self, factory: &mut dyn SlotFactory, tracks: &[Track]) -> Result<(), SlotError> {
        let live: HashSet<TrackId> = tracks.iter().map(|t| t.id).collect();
        let orphaned: Vec<TrackId> = self
            .entries
            .keys()
            .filter(|id| !live.contains(id))
            .copied()
            .collect();
        for id in orphaned {
            self.release(id);
        }
        for track in tracks {
            self.ensure(factory, track.id, track.kind)?;
        }
        Ok(())
    }

    pub fn trigger(
        &mut self,
        id: TrackId,
        row: usize,
        pitch: Option<&str>,
        length: NoteLength,
        at: f64,
    ) {
        if let Some(slot) = self.entries.get_mut(&id).and_then(|slots| slots.get_mut(row)) {
            slot.trigger(pitch, length, at);
        }
    }

    /// Propagate a volume change to every slot of a track
    pub fn set_volume(&mut self, id: TrackId, db: f32) {
        if let Some(slots) = self.entries.get_mut(&id) {
            for slot in slots {
                slot.set_volume(db);
            }
        }
    }

    /// Release every entry, ahead of a full song swap
    pub fn clear(&mut self) {
        let ids: Vec<TrackId> = self.entries.keys().copied().collect();
        for id in ids {
            self.release(id);
        }
    }

    /// Panic button: silence every slot of every track
    pub fn release_all(&mut self) {
        for slots in self.entries.values_mut() {
            for slot in slots {
                slot.release_all();
            }
        }
    }

    pub fn contains(&self, id: TrackId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryFactory, SlotEvent, SlotLog};
    use gridloop_core::{Scale, Track};

    #[test]
    fn ensure_is_idempotent_and_release_silences() {
        let log = SlotLog::default();
        let mut factory = MemoryFactory::new(log.clone());
        let mut pool = SlotPool::new();
        let id = TrackId(1);

        pool.ensure(&mut factory, id, InstrumentKind::Drums).unwrap();
        pool.ensure(&mut factory, id, InstrumentKind::Drums).unwrap();
        assert_eq!(pool.len(), 1);

        pool.release(id);
        assert!(pool.is_empty());
        let releases = log
            .events()
            .iter()
            .filter(|e| matches!(e, SlotEvent::ReleaseAll { .. }))
            .count();
        // One release per drum row
        assert_eq!(releases, 7);
    }

    #[test]
    fn trigger_routes_to_the_right_row() {
        let log = SlotLog::default();
        let mut factory = MemoryFactory::new(log.clone());
        let mut pool = SlotPool::new();
        let id = TrackId(3);
        pool.ensure(&mut factory, id, InstrumentKind::Bass).unwrap();

        pool.trigger(id, 2, Some("E2"), NoteLength::Eighth, 1.5);
        // Unknown rows and tracks are silent no-ops
        pool.trigger(id, 99, Some("E2"), NoteLength::Eighth, 1.5);
        pool.trigger(TrackId(9), 0, Some("E2"), NoteLength::Eighth, 1.5);

        let events = log.events();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0],
            SlotEvent::Trigger {
                track: id,
                row: 2,
                pitch: Some("E2".into()),
                length: NoteLength::Eighth,
                at: 1.5,
            }
        );
    }

    #[test]
    fn volume_reaches_every_slot_of_the_track() {
        let log = SlotLog::default();
        let mut factory = MemoryFactory::new(log.clone());
        let mut pool = SlotPool::new();
        let id = TrackId(1);
        pool.ensure(&mut factory, id, InstrumentKind::Guitar).unwrap();

        pool.set_volume(id, -12.0);
        let volumes = log
            .events()
            .iter()
            .filter(|e| matches!(e, SlotEvent::SetVolume { db, .. } if *db == -12.0))
            .count();
        // Melodic tracks allocate the whole-scale maximum of eight slots
        assert_eq!(volumes, 8);
    }

    #[test]
    fn sync_aligns_pool_with_track_list() {
        let log = SlotLog::default();
        let mut factory = MemoryFactory::new(log.clone());
        let mut pool = SlotPool::new();
        pool.ensure(&mut factory, TrackId(1), InstrumentKind::Drums).unwrap();
        pool.ensure(&mut factory, TrackId(2), InstrumentKind::Bass).unwrap();

        let tracks = vec![
            Track::new(TrackId(2), InstrumentKind::Bass, Scale::Pentatonic),
            Track::new(TrackId(5), InstrumentKind::Keyboard, Scale::Pentatonic),
        ];
        pool.sync(&mut factory, &tracks).unwrap();

        assert!(!pool.contains(TrackId(1)));
        assert!(pool.contains(TrackId(2)));
        assert!(pool.contains(TrackId(5)));
        assert_eq!(pool.len(), 2);
    }
}
