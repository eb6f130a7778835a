//! Offline rendering: drive a fresh engine for a fixed span of time and
//! capture everything it asks the backend to do

use std::path::Path;

use thiserror::Error;
use tracing::info;
use vibe_core::{Engine, EngineConfig, EngineError};

use crate::backends::{EventLog, RecordingBackend};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid render length: {0} s")]
    InvalidDuration(f64),
}

/// Start playback and advance in `tick_interval_ms` increments for `seconds`
pub fn render(config: EngineConfig, seconds: f64) -> Result<EventLog, RenderError> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(RenderError::InvalidDuration(seconds));
    }
    let step = config.tick_interval_ms.max(1) as f64 / 1000.0;
    let mut engine = Engine::new(config, RecordingBackend::new())?;
    engine.start()?;

    let steps = (seconds / step).ceil() as u64;
    for i in 0..steps {
        engine.advance(step.min(seconds - i as f64 * step));
    }

    let log = engine.into_backend().into_log();
    info!(seconds, triggers = log.triggers.len(), ramps = log.ramps.len(), "Render finished");
    Ok(log)
}

/// Render and write the event log as JSON
pub fn render_to_file(config: EngineConfig, seconds: f64, path: &Path) -> Result<EventLog, RenderError> {
    let log = render(config, seconds)?;
    std::fs::write(path, log.to_json()?)?;
    info!(path = %path.display(), "Event log written");
    Ok(log)
}
