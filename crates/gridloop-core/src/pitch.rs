//! Keys, scales and the pitch tables behind the grid rows

use serde::{Deserialize, Serialize};

/// Instrument assigned to a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentKind {
    Drums,
    Bass,
    Guitar,
    Keyboard,
}

impl InstrumentKind {
    pub fn is_melodic(&self) -> bool {
        !matches!(self, Self::Drums)
    }
}

/// Scale used for melodic rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    #[default]
    Pentatonic,
    /// The full scale: all seven degrees plus the octave. Minor keys use the
    /// harmonic spelling.
    Whole,
}

impl Scale {
    /// Melodic rows per track under this scale
    pub fn degrees(&self) -> usize {
        match self {
            Self::Pentatonic => 5,
            Self::Whole => 8,
        }
    }
}

/// The eight supported keys: four major, four minor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Key {
    #[default]
    C,
    F,
    G,
    D,
    Am,
    Dm,
    Em,
    /// B minor (German note naming)
    Hm,
}

/// Row legend for drum tracks, bottom row first
pub const DRUM_ROWS: [&str; 7] = ["BASS", "SNARE", "HI-HAT", "TOM", "TOM", "TOM", "CRASH"];

/// Pitch handed to percussion slots; they ignore it
pub const DRUM_TRIGGER_PITCH: &str = "C2";

/// Ordered pitch list for one track's rows.
///
/// Total over the enum domain: every `(kind, scale, key)` combination maps to a
/// fixed table. Drums have no pitched rows and return an empty slice; bass
/// tables sit one to two octaves below the melody tables. Minor keys under
/// [`Scale::Whole`] use the harmonic-minor spelling.
pub fn pitches(kind: InstrumentKind, scale: Scale, key: Key) -> &'static [&'static str] {
    use InstrumentKind::*;
    use Key::*;
    use Scale::*;

    let bass = matches!(kind, Bass);
    match kind {
        Drums => &[],
        _ => match (key, scale) {
            (C, Pentatonic) if bass => &["C2", "D2", "E2", "G2", "A2"],
            (C, Pentatonic) => &["C3", "D3", "E3", "G3", "A3"],
            (C, Whole) if bass => &["C2", "D2", "E2", "F2", "G2", "A2", "B2", "C3"],
            (C, Whole) => &["C3", "D3", "E3", "F3", "G3", "A3", "B3", "C4"],

            (F, Pentatonic) if bass => &["F1", "G1", "A1", "C2", "D2"],
            (F, Pentatonic) => &["F3", "G3", "A3", "C4", "D4"],
            (F, Whole) if bass => &["F1", "G1", "A1", "Bb1", "C2", "D2", "E2", "F2"],
            (F, Whole) => &["F3", "G3", "A3", "Bb3", "C4", "D4", "E4", "F4"],

            (G, Pentatonic) if bass => &["G1", "A1", "B1", "D2", "E2"],
            (G, Pentatonic) => &["G3", "A3", "B3", "D4", "E4"],
            (G, Whole) if bass => &["G1", "A1", "B1", "C2", "D2", "E2", "F#2", "G2"],
            (G, Whole) => &["G3", "A3", "B3", "C4", "D4", "E4", "F#4", "G4"],

            (D, Pentatonic) if bass => &["D2", "E2", "F#2", "A2", "B2"],
            (D, Pentatonic) => &["D3", "E3", "F#3", "A3", "B3"],
            (D, Whole) if bass => &["D2", "E2", "F#2", "G2", "A2", "B2", "C#3", "D3"],
            (D, Whole) => &["D3", "E3", "F#3", "G3", "A3", "B3", "C#4", "D4"],

            (Am, Pentatonic) if bass => &["A1", "C2", "D2", "E2", "G2"],
            (Am, Pentatonic) => &["A3", "C4", "D4", "E4", "G4"],
            (Am, Whole) if bass => &["A1", "B1", "C2", "D2", "E2", "F2", "G#2", "A2"],
            (Am, Whole) => &["A3", "B3", "C4", "D4", "E4", "F4", "G#4", "A4"],

            (Dm, Pentatonic) if bass => &["D2", "F2", "G2", "A2", "C3"],
            (Dm, Pentatonic) => &["D3", "F3", "G3", "A3", "C4"],
            (Dm, Whole) if bass => &["D2", "E2", "F2", "G2", "A2", "Bb2", "C#3", "D3"],
            (Dm, Whole) => &["D3", "E3", "F3", "G3", "A3", "Bb3", "C#4", "D4"],

            (Em, Pentatonic) if bass => &["E1", "G1", "A1", "B1", "D2"],
            (Em, Pentatonic) => &["E3", "G3", "A3", "B3", "D4"],
            (Em, Whole) if bass => &["E1", "F#1", "G1", "A1", "B1", "C2", "D#2", "E2"],
            (Em, Whole) => &["E3", "F#3", "G3", "A3", "B3", "C4", "D#4", "E4"],

            (Hm, Pentatonic) if bass => &["B1", "D2", "E2", "F#2", "A2"],
            (Hm, Pentatonic) => &["B3", "D4", "E4", "F#4", "A4"],
            (Hm, Whole) if bass => &["B1", "C#2", "D2", "E2", "F#2", "G2", "A#2", "B2"],
            (Hm, Whole) => &["B3", "C#4", "D4", "E4", "F#4", "G4", "A#4", "B4"],
        },
    }
}

/// Number of grid rows for a track of the given kind and scale
pub fn row_count(kind: InstrumentKind, scale: Scale) -> usize {
    match kind {
        InstrumentKind::Drums => DRUM_ROWS.len(),
        _ => scale.degrees(),
    }
}
