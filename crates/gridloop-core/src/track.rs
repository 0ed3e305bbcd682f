//! Track representation

use serde::{Deserialize, Serialize};

use crate::pitch::{row_count, InstrumentKind, Scale};

/// Unique identifier for tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(pub u64);

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Active positions within one grid row, measured in bars from loop start.
///
/// Positions are bar-relative rather than step-relative, so a resolution change
/// never moves or drops notes. Membership is tolerant: two positions closer
/// than [`StepSet::TOLERANCE`] count as the same step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepSet(Vec<f64>);

impl StepSet {
    /// Two positions closer than this are the same step. Kept at exactly 1e-3
    /// so persisted songs keep matching their own positions.
    pub const TOLERANCE: f64 = 1e-3;

    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn contains(&self, pos: f64) -> bool {
        self.0.iter().any(|&p| (p - pos).abs() < Self::TOLERANCE)
    }

    /// Insert `pos` unless an equivalent position is already present. Returns
    /// true if the set changed.
    pub fn insert(&mut self, pos: f64) -> bool {
        if self.contains(pos) {
            return false;
        }
        self.0.push(pos);
        true
    }

    /// Remove the position equivalent to `pos`, if any. Returns true if the
    /// set changed.
    pub fn remove(&mut self, pos: f64) -> bool {
        match self.0.iter().position(|&p| (p - pos).abs() < Self::TOLERANCE) {
            Some(idx) => {
                self.0.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Toggle membership; returns true if the position was inserted.
    pub fn toggle(&mut self, pos: f64) -> bool {
        if self.remove(pos) {
            false
        } else {
            self.0.push(pos);
            true
        }
    }

    pub fn positions(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A track in the grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    #[serde(rename = "type")]
    pub kind: InstrumentKind,
    /// Per-track scale. Kept as an independent override for older songs; new
    /// and globally-reset tracks copy the global scale.
    pub scale: Scale,
    /// Volume in dB, -40 to +5
    pub volume: i32,
    pub muted: bool,
    pub solo: bool,
    /// One step set per grid row
    #[serde(rename = "activeSteps")]
    pub steps: Vec<StepSet>,
}

impl Track {
    pub fn new(id: TrackId, kind: InstrumentKind, scale: Scale) -> Self {
        Self {
            id,
            kind,
            scale,
            volume: 0,
            muted: false,
            solo: false,
            steps: (0..row_count(kind, scale)).map(|_| StepSet::new()).collect(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.steps.len()
    }

    /// Re-lay the grid out under a new scale. Rows map to different pitches
    /// afterwards, so all placed notes are dropped rather than remapped.
    pub fn reset_rows(&mut self, scale: Scale) {
        self.scale = scale;
        self.steps = (0..row_count(self.kind, scale)).map(|_| StepSet::new()).collect();
    }

    /// Mute/solo routing: while any track is soloed, only unmuted solo tracks
    /// sound; otherwise every unmuted track sounds.
    pub fn audible(&self, any_solo: bool) -> bool {
        if any_solo {
            self.solo && !self.muted
        } else {
            !self.muted
        }
    }
}
