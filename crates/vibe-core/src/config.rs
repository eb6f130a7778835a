//! Engine configuration

use serde::{Deserialize, Serialize};

/// Tunables for the engine and its runner. Every field falls back to its
/// default when missing from a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds for stem fade in/out on start, stop and toggle
    pub fade_time: f64,
    /// Seconds for volume slider ramps
    pub volume_ramp_time: f64,
    /// Initial per-voice volume (0..1)
    pub default_volume: f32,
    /// Initial master volume (0..1)
    pub master_volume: f32,
    pub initial_scale: String,
    pub initial_style: String,
    /// Seed for all stochastic choices; random when absent
    pub seed: Option<u64>,
    pub euclidean_pulses: u32,
    pub euclidean_steps: u32,
    /// Wall-clock interval between runner ticks
    pub tick_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fade_time: 2.0,
            volume_ramp_time: 0.1,
            default_volume: 0.8,
            master_volume: 1.0,
            initial_scale: "C major".to_string(),
            initial_style: "lofi".to_string(),
            seed: None,
            euclidean_pulses: 4,
            euclidean_steps: 16,
            tick_interval_ms: 10,
        }
    }
}
