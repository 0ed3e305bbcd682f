//! gridloop-services: playback engine for the gridloop step sequencer

mod clock;
mod scheduler;
mod sequencer;
mod slots;
pub mod testing;

pub use clock::{AudioClock, ClockError, ClockState, SystemClock};
pub use scheduler::{PlayheadFrame, Schedule};
pub use sequencer::{EngineError, PlayState, Sequencer};
pub use slots::{NoteLength, NoteSlot, SlotError, SlotFactory, SlotPool};
