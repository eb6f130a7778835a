//! vibe-core: procedural music generation and transport scheduling

pub mod algorithms;
mod backend;
mod config;
mod engine;
mod error;
mod gain;
pub mod markov;
pub mod pattern;
mod state;
pub mod style;
mod transport;
mod voice;

pub use algorithms::{euclidean_rhythm, DiatonicScales, Pitch, Scale, ScaleMode, ScaleResolver};
pub use backend::AudioBackend;
pub use config::EngineConfig;
pub use engine::{Engine, EngineSnapshot, StyleSelection, VoiceSnapshot};
pub use error::{EngineError, Result};
pub use gain::{GainEnvelope, GainEnvelopeController, GainTarget, Ramp};
pub use markov::MarkovChain;
pub use pattern::{Event, Pattern, PatternGenerator, Subdivision, PPQ};
pub use state::{EngineState, VoiceSettings, MAX_BPM, MIN_BPM};
pub use style::{ArpStyle, BassRhythm, DrumPreset, Style, StyleCatalog, DRUM_PRESETS};
pub use transport::{BindingId, BindingState, FiredStep, TransportScheduler, TransportState};
pub use voice::{Voice, VoiceMap};
