//! Engine state: everything the generators read and the setters write

use crate::algorithms::{validate_euclidean_steps, DiatonicScales, Scale, ScaleResolver};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::style::{BassRhythm, DrumPreset, Style, StyleCatalog, DRUM_PRESETS};
use crate::voice::VoiceMap;

/// Lowest accepted tempo
pub const MIN_BPM: f64 = 20.0;
/// Highest accepted tempo
pub const MAX_BPM: f64 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceSettings {
    pub enabled: bool,
    /// Level the voice fades in to (0..1)
    pub volume: f32,
}

#[derive(Debug, Clone)]
pub struct EngineState {
    pub scale: Scale,
    pub style: &'static Style,
    pub bpm: f64,
    pub is_playing: bool,
    pub voices: VoiceMap<VoiceSettings>,
    pub master_volume: f32,
    pub bass_rhythm_override: Option<BassRhythm>,
    pub use_markov_chain: bool,
    pub use_euclidean_rhythm: bool,
    pub euclidean_pulses: u32,
    pub euclidean_steps: u32,
    pub drum_pattern_index: usize,
    pub drum_pitch_offset: i32,
}

impl EngineState {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Self::with_resolver(config, &DiatonicScales)
    }

    pub fn with_resolver(config: &EngineConfig, resolver: &dyn ScaleResolver) -> Result<Self> {
        let scale = resolver.resolve(&config.initial_scale)?;
        let style = StyleCatalog.get(&config.initial_style)?;
        validate_euclidean_steps(config.euclidean_steps)?;
        let durations = [("fade_time", config.fade_time), ("volume_ramp_time", config.volume_ramp_time)];
        for (name, seconds) in durations {
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(EngineError::InvalidGenerationInput(format!(
                    "{} must be a finite, non-negative duration",
                    name
                )));
            }
        }

        let bpm = (*style.tempo_range.start() + *style.tempo_range.end()) as f64 / 2.0;
        let volume = validate_volume(config.default_volume)?;

        Ok(Self {
            scale,
            style,
            bpm,
            is_playing: false,
            voices: VoiceMap::from_fn(|_| VoiceSettings { enabled: true, volume }),
            master_volume: validate_volume(config.master_volume)?,
            bass_rhythm_override: None,
            use_markov_chain: false,
            use_euclidean_rhythm: false,
            euclidean_pulses: config.euclidean_pulses,
            euclidean_steps: config.euclidean_steps,
            drum_pattern_index: style.drum_patterns[0],
            drum_pitch_offset: 0,
        })
    }

    /// Currently selected fixed drum preset
    pub fn drum_preset(&self) -> &'static DrumPreset {
        &DRUM_PRESETS[self.drum_pattern_index % DRUM_PRESETS.len()]
    }
}

/// Reject non-finite or out-of-range tempos
pub fn validate_bpm(bpm: f64) -> Result<f64> {
    if bpm.is_finite() && (MIN_BPM..=MAX_BPM).contains(&bpm) {
        Ok(bpm)
    } else {
        Err(EngineError::InvalidTempo(bpm))
    }
}

/// Reject non-finite levels; finite ones are clamped to 0..1
pub fn validate_volume(volume: f32) -> Result<f32> {
    if volume.is_finite() {
        Ok(volume.clamp(0.0, 1.0))
    } else {
        Err(EngineError::InvalidVolume(volume))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let state = EngineState::new(&EngineConfig::default()).unwrap();
        assert_eq!(state.scale.name, "C major");
        assert_eq!(state.style.name, "lofi");
        assert!(state.style.tempo_range.contains(&(state.bpm as u32)));
        assert!(!state.is_playing);
        assert!(state.voices.iter().all(|(_, v)| v.enabled && v.volume == 0.8));
        assert_eq!(state.drum_preset().name, "Boom Bap");
    }

    #[test]
    fn test_bad_config_is_rejected() {
        let config = EngineConfig { initial_style: "polka".to_string(), ..Default::default() };
        assert!(matches!(EngineState::new(&config), Err(EngineError::UnknownStyle(_))));

        let config = EngineConfig { initial_scale: "Q lydian".to_string(), ..Default::default() };
        assert!(matches!(EngineState::new(&config), Err(EngineError::UnknownScale(_))));

        let config = EngineConfig { euclidean_steps: 0, ..Default::default() };
        assert!(matches!(EngineState::new(&config), Err(EngineError::InvalidGenerationInput(_))));

        let config = EngineConfig { euclidean_steps: 1_000_000, ..Default::default() };
        assert!(matches!(EngineState::new(&config), Err(EngineError::InvalidGenerationInput(_))));

        let config = EngineConfig { fade_time: f64::NAN, ..Default::default() };
        assert!(matches!(EngineState::new(&config), Err(EngineError::InvalidGenerationInput(_))));

        let config = EngineConfig { master_volume: f32::NAN, ..Default::default() };
        assert!(matches!(EngineState::new(&config), Err(EngineError::InvalidVolume(_))));
    }

    #[test]
    fn test_validate_volume() {
        assert_eq!(validate_volume(0.5), Ok(0.5));
        assert_eq!(validate_volume(3.0), Ok(1.0));
        assert_eq!(validate_volume(-1.0), Ok(0.0));
        assert!(validate_volume(f32::NAN).is_err());
        assert!(validate_volume(f32::INFINITY).is_err());
    }

    #[test]
    fn test_validate_bpm() {
        assert_eq!(validate_bpm(128.0), Ok(128.0));
        assert!(validate_bpm(0.0).is_err());
        assert!(validate_bpm(f64::NAN).is_err());
        assert!(validate_bpm(1000.0).is_err());
    }
}
