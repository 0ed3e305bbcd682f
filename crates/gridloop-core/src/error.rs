//! Error types for gridloop

use thiserror::Error;

use crate::track::TrackId;

#[derive(Debug, Error)]
pub enum GridloopError {
    #[error("Track not found: {0}")]
    TrackNotFound(TrackId),
    #[error("Song encode failed: {0}")]
    Encode(String),
    #[error("Undecodable song string: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, GridloopError>;
