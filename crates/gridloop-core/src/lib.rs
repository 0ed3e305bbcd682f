//! gridloop-core: Domain types for the gridloop step sequencer

mod codec;
mod error;
mod history;
mod pitch;
mod song;
mod track;

pub use codec::{decode_song, encode_song};
pub use error::{GridloopError, Result};
pub use history::History;
pub use pitch::{pitches, row_count, InstrumentKind, Key, Scale, DRUM_ROWS, DRUM_TRIGGER_PITCH};
pub use song::{Resolution, Song, SongSettings, StepToggle, TrackUpdate};
pub use track::{StepSet, Track, TrackId};
