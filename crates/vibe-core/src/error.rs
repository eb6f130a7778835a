//! Error types for the vibe engine

use thiserror::Error;

use crate::voice::Voice;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Unknown style: {0}")]
    UnknownStyle(String),
    #[error("Unknown scale: {0}")]
    UnknownScale(String),
    #[error("Unknown bass rhythm: {0}")]
    UnknownBassRhythm(String),
    #[error("Unknown voice: {0}")]
    UnknownVoice(String),
    #[error("Invalid generation input: {0}")]
    InvalidGenerationInput(String),
    #[error("Voice {0} is already bound to a pattern")]
    SchedulingConflict(Voice),
    #[error("Invalid tempo: {0} bpm")]
    InvalidTempo(f64),
    #[error("Invalid volume: {0}")]
    InvalidVolume(f32),
}

pub type Result<T> = std::result::Result<T, EngineError>;
