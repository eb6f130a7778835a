//! vibe-services: audio backends, the realtime runner and offline rendering

pub mod backends;
pub mod command;
pub mod render;
pub mod runner;

pub use backends::{EventLog, RampRecord, RecordingBackend, TracingBackend, TriggerRecord};
pub use command::{Command, CommandParseError};
pub use render::{render, render_to_file, RenderError};
pub use runner::{EngineRunner, Reply, RunnerError};
