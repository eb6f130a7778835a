//! The engine: state, generators, transport and gain stages behind the public
//! operations a front end calls.
//!
//! Everything runs on one logical clock advanced by [`Engine::advance`].
//! Setters run to completion between advances, so no step of a disposed
//! pattern can fire and no generator ever sees a half-applied change.
//! Setters stage their change on a copy of the state and commit it only once
//! every affected pattern has been generated.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::algorithms::{validate_euclidean_steps, DiatonicScales, ScaleResolver};
use crate::backend::AudioBackend;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::gain::{GainEnvelopeController, GainTarget};
use crate::markov::MarkovChain;
use crate::pattern::{Pattern, PatternGenerator};
use crate::state::{validate_bpm, validate_volume, EngineState};
use crate::style::{BassRhythm, StyleCatalog, DRUM_PRESETS};
use crate::transport::{FiredStep, TransportScheduler};
use crate::voice::Voice;

const MELODIC: [Voice; 3] = [Voice::Bass, Voice::Pad, Voice::Arp];
/// Live drum transposition is limited to four octaves either way
const MAX_DRUM_OFFSET: i32 = 48;

/// Result of a style change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyleSelection {
    pub style_name: String,
    pub bpm: f64,
    pub drum_pattern_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceSnapshot {
    pub voice: Voice,
    pub enabled: bool,
    pub volume: f32,
    pub level: f32,
    pub pattern: Option<String>,
    pub steps: usize,
    pub subdivision: Option<&'static str>,
}

/// Read-only view of the engine for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineSnapshot {
    pub scale: String,
    pub style: String,
    pub bpm: f64,
    pub playing: bool,
    pub position: String,
    pub master_volume: f32,
    pub master_level: f32,
    pub voices: Vec<VoiceSnapshot>,
    pub bass_rhythm: Option<String>,
    pub drum_pattern: String,
    pub drum_pitch_offset: i32,
    pub markov_chain: bool,
    pub euclidean_rhythm: bool,
    pub euclidean_pulses: u32,
    pub euclidean_steps: u32,
}

pub struct Engine<B: AudioBackend> {
    config: EngineConfig,
    state: EngineState,
    resolver: Box<dyn ScaleResolver>,
    generator: PatternGenerator,
    transport: TransportScheduler,
    gains: GainEnvelopeController,
    backend: B,
    rng: fastrand::Rng,
    /// Context time in seconds; always advancing, independent of the transport
    now: f64,
    /// When a stop's fade completes and the bindings are disposed
    pending_teardown: Option<f64>,
}

impl<B: AudioBackend> Engine<B> {
    pub fn new(config: EngineConfig, backend: B) -> Result<Self> {
        Self::with_resolver(config, backend, Box::new(DiatonicScales))
    }

    pub fn with_resolver(config: EngineConfig, mut backend: B, resolver: Box<dyn ScaleResolver>) -> Result<Self> {
        let state = EngineState::with_resolver(&config, resolver.as_ref())?;

        let markov = MarkovChain::learn(&StyleCatalog.progressions());
        if markov.is_empty() {
            return Err(EngineError::InvalidGenerationInput(
                "no chord progressions to learn from".to_string(),
            ));
        }

        let rng = match config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };

        let mut gains = GainEnvelopeController::new(state.master_volume, config.fade_time);
        let ramp = gains.ramp(GainTarget::Master, state.master_volume, 0.0, 0.0);
        backend.ramp_gain(GainTarget::Master, &ramp);

        info!(
            scale = %state.scale.name,
            style = state.style.name,
            bpm = state.bpm,
            "Engine created"
        );

        Ok(Self {
            transport: TransportScheduler::new(state.bpm),
            config,
            state,
            resolver,
            generator: PatternGenerator::new(markov),
            gains,
            backend,
            rng,
            now: 0.0,
            pending_teardown: None,
        })
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn transport(&self) -> &TransportScheduler {
        &self.transport
    }

    pub fn gains(&self) -> &GainEnvelopeController {
        &self.gains
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Context time in seconds
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing
    }

    /// Pattern currently bound to a voice
    pub fn pattern(&self, voice: Voice) -> Option<&Pattern> {
        self.transport.pattern(voice)
    }

    /// Whether a stop's fade-out is still waiting to dispose the transport
    pub fn teardown_pending(&self) -> bool {
        self.pending_teardown.is_some()
    }

    // ------------------------------------------------------------------
    // Clock
    // ------------------------------------------------------------------

    /// Advance context time by `seconds`, firing every step that comes due.
    /// Returns the number of events triggered.
    pub fn advance(&mut self, seconds: f64) -> usize {
        if !seconds.is_finite() || seconds <= 0.0 {
            return 0;
        }
        let target = self.now + seconds;
        let mut triggered = 0;

        if let Some(at) = self.pending_teardown {
            if at <= target {
                triggered += self.run_until(at);
                self.teardown();
            }
        }

        triggered + self.run_until(target)
    }

    fn run_until(&mut self, time: f64) -> usize {
        let elapsed = time - self.now;
        if elapsed <= 0.0 {
            return 0;
        }
        let start_tick = self.transport.position();
        let start_time = self.now;
        let fired = self.transport.advance_seconds(elapsed);

        let mut triggered = 0;
        for step in fired {
            let at = start_time + self.transport.ticks_to_seconds(step.tick - start_tick);
            if self.fire(step, at) {
                triggered += 1;
            }
        }

        self.now = time;
        self.gains.settle(time);
        triggered
    }

    fn fire(&mut self, step: FiredStep, time: f64) -> bool {
        if step.event.is_rest() || !self.state.voices[step.voice].enabled {
            return false;
        }
        let event = match step.voice {
            Voice::Drums => step.event.transposed(self.state.drum_pitch_offset),
            _ => step.event,
        };
        let duration = self.transport.ticks_to_seconds(step.duration_ticks);
        debug!(voice = %step.voice, step = step.step, tick = step.tick, ?event, "Trigger");
        self.backend.trigger(step.voice, &event, duration, time);
        true
    }

    fn teardown(&mut self) {
        self.pending_teardown = None;
        self.transport.stop();
        self.transport.dispose_all();
        info!("Transport stopped and disposed");
    }

    fn ramp(&mut self, target: GainTarget, level: f32, duration: f64) {
        let ramp = self.gains.ramp(target, level, duration, self.now);
        self.backend.ramp_gain(target, &ramp);
    }

    fn fade_in(&mut self, voice: Voice) {
        let volume = self.state.voices[voice].volume;
        let ramp = self.gains.fade_in(voice, volume, self.now);
        self.backend.ramp_gain(GainTarget::Voice(voice), &ramp);
    }

    fn fade_out(&mut self, voice: Voice) {
        let ramp = self.gains.fade_out(voice, self.now);
        self.backend.ramp_gain(GainTarget::Voice(voice), &ramp);
    }

    // ------------------------------------------------------------------
    // Regeneration
    // ------------------------------------------------------------------

    /// Commit a staged state. While playing, the listed voices are regenerated
    /// against it first; any generation failure leaves state and bindings as
    /// they were.
    fn commit(&mut self, staged: EngineState, voices: &[Voice]) -> Result<()> {
        if !staged.is_playing || voices.is_empty() {
            self.state = staged;
            return Ok(());
        }

        let patterns = voices
            .iter()
            .map(|&voice| self.generator.generate(voice, &staged, &mut self.rng))
            .collect::<Result<Vec<_>>>()?;

        self.state = staged;
        for pattern in patterns {
            debug!(voice = %pattern.voice, label = %pattern.label, steps = pattern.len(), "Rebinding");
            self.transport.rebind(pattern)?;
        }
        Ok(())
    }

    /// Regenerate every voice with the current settings; no-op when stopped
    pub fn regenerate(&mut self) -> Result<()> {
        if !self.state.is_playing {
            return Ok(());
        }
        self.commit(self.state.clone(), &Voice::ALL)?;
        info!("Regenerated all voices");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Playback
    // ------------------------------------------------------------------

    /// Generate and bind all four voices, start them on a shared zero and fade
    /// the enabled ones in, all within this call.
    pub fn start(&mut self) -> Result<()> {
        if self.state.is_playing {
            return Ok(());
        }

        let patterns = Voice::ALL
            .iter()
            .map(|&voice| self.generator.generate(voice, &self.state, &mut self.rng))
            .collect::<Result<Vec<_>>>()?;

        if self.pending_teardown.is_some() {
            debug!("Start during fade-out; disposing previous bindings now");
            self.teardown();
        }

        self.transport.stop();
        self.transport.dispose_all();
        self.transport.set_bpm(self.state.bpm);
        for pattern in patterns {
            self.transport.bind(pattern)?;
        }
        self.transport.start();
        self.state.is_playing = true;

        for voice in Voice::ALL {
            if self.state.voices[voice].enabled {
                self.fade_in(voice);
            } else {
                self.fade_out(voice);
            }
        }

        info!(style = self.state.style.name, bpm = self.state.bpm, "Playback started");
        Ok(())
    }

    /// Fade everything out; the transport is disposed once the fade finishes
    pub fn stop(&mut self) {
        if !self.state.is_playing {
            return;
        }
        self.state.is_playing = false;
        for voice in Voice::ALL {
            self.fade_out(voice);
        }
        self.pending_teardown = Some(self.now + self.gains.fade_time());
        info!("Playback stopping");
    }

    // ------------------------------------------------------------------
    // Setters
    // ------------------------------------------------------------------

    pub fn set_scale(&mut self, name: &str) -> Result<()> {
        let scale = self.resolver.resolve(name).inspect_err(|e| warn!("{}", e))?;
        let mut staged = self.state.clone();
        staged.scale = scale;
        self.commit(staged, &MELODIC)?;
        info!(scale = %self.state.scale.name, "Scale changed");
        Ok(())
    }

    /// Switch style, choosing a tempo and a compatible drum preset
    pub fn set_style(&mut self, name: &str) -> Result<StyleSelection> {
        let style = StyleCatalog.get(name).inspect_err(|e| warn!("{}", e))?;
        let bpm = style.pick_bpm(&mut self.rng) as f64;
        let drum_index = style.pick_drum_pattern(&mut self.rng);

        let mut staged = self.state.clone();
        staged.style = style;
        staged.bpm = bpm;
        staged.drum_pattern_index = drum_index;
        self.commit(staged, &Voice::ALL)?;
        self.transport.set_bpm(bpm);

        let selection = StyleSelection {
            style_name: style.name.to_string(),
            bpm,
            drum_pattern_name: DRUM_PRESETS[drum_index].name.to_string(),
        };
        info!(style = style.name, bpm, drums = %selection.drum_pattern_name, "Style changed");
        Ok(selection)
    }

    pub fn set_tempo(&mut self, bpm: f64) -> Result<()> {
        let bpm = validate_bpm(bpm).inspect_err(|e| warn!("{}", e))?;
        self.state.bpm = bpm;
        self.transport.set_bpm(bpm);
        info!(bpm, "Tempo changed");
        Ok(())
    }

    /// Mute or unmute a voice. Without playback only the flag is recorded.
    pub fn set_stem_enabled(&mut self, voice: Voice, enabled: bool) {
        self.state.voices[voice].enabled = enabled;
        info!(%voice, enabled, "Stem toggled");
        if !self.state.is_playing {
            return;
        }
        if enabled {
            self.fade_in(voice);
        } else {
            self.fade_out(voice);
        }
    }

    /// Set a voice's level. Zero mutes the voice; any level above zero
    /// unmutes it.
    pub fn set_stem_volume(&mut self, voice: Voice, volume: f32) -> Result<()> {
        let volume = validate_volume(volume).inspect_err(|e| warn!("{}", e))?;
        let settings = &mut self.state.voices[voice];
        settings.volume = volume;
        settings.enabled = volume > 0.0;
        let level = if settings.enabled { volume } else { 0.0 };

        if self.state.is_playing {
            self.ramp(GainTarget::Voice(voice), level, self.config.volume_ramp_time);
        }
        Ok(())
    }

    pub fn set_master_volume(&mut self, volume: f32) -> Result<()> {
        let volume = validate_volume(volume).inspect_err(|e| warn!("{}", e))?;
        self.state.master_volume = volume;
        self.ramp(GainTarget::Master, volume, self.config.volume_ramp_time);
        Ok(())
    }

    /// Force a bass rhythm template; "auto" hands the choice back to the style
    pub fn set_bass_rhythm(&mut self, name: &str) -> Result<()> {
        let rhythm = match name.trim().to_ascii_lowercase().as_str() {
            "auto" | "style" | "" => None,
            other => Some(other.parse::<BassRhythm>().inspect_err(|e| warn!("{}", e))?),
        };
        let mut staged = self.state.clone();
        staged.bass_rhythm_override = rhythm;
        self.commit(staged, &[Voice::Bass])?;
        info!(rhythm = rhythm.map_or("auto", |r| r.name()), "Bass rhythm changed");
        Ok(())
    }

    /// Transpose drum hits from the next step on, without regenerating
    pub fn set_drum_pitch_offset(&mut self, semitones: i32) {
        self.state.drum_pitch_offset = semitones.clamp(-MAX_DRUM_OFFSET, MAX_DRUM_OFFSET);
        info!(semitones = self.state.drum_pitch_offset, "Drum pitch offset changed");
    }

    /// Cycle to the next fixed drum preset and return its name
    pub fn next_drum_pattern(&mut self) -> Result<&'static str> {
        let mut staged = self.state.clone();
        staged.drum_pattern_index = (staged.drum_pattern_index + 1) % DRUM_PRESETS.len();
        let preset = staged.drum_preset();
        let voices: &[Voice] = if staged.use_euclidean_rhythm { &[] } else { &[Voice::Drums] };
        self.commit(staged, voices)?;
        info!(pattern = preset.name, "Drum pattern changed");
        Ok(preset.name)
    }

    pub fn set_euclidean_params(&mut self, pulses: u32, steps: u32) -> Result<()> {
        validate_euclidean_steps(steps).inspect_err(|e| warn!("{}", e))?;
        let mut staged = self.state.clone();
        staged.euclidean_pulses = pulses;
        staged.euclidean_steps = steps;
        let voices: &[Voice] = if staged.use_euclidean_rhythm { &[Voice::Drums] } else { &[] };
        self.commit(staged, voices)?;
        info!(pulses, steps, "Euclidean parameters changed");
        Ok(())
    }

    pub fn toggle_markov_chain(&mut self, enabled: bool) -> Result<()> {
        let mut staged = self.state.clone();
        staged.use_markov_chain = enabled;
        self.commit(staged, &[Voice::Pad])?;
        info!(enabled, "Markov chords toggled");
        Ok(())
    }

    pub fn toggle_euclidean_rhythm(&mut self, enabled: bool) -> Result<()> {
        let mut staged = self.state.clone();
        staged.use_euclidean_rhythm = enabled;
        self.commit(staged, &[Voice::Drums])?;
        info!(enabled, "Euclidean drums toggled");
        Ok(())
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let state = &self.state;
        let voices = Voice::ALL
            .iter()
            .map(|&voice| {
                let pattern = self.transport.pattern(voice);
                VoiceSnapshot {
                    voice,
                    enabled: state.voices[voice].enabled,
                    volume: state.voices[voice].volume,
                    level: self.gains.level(GainTarget::Voice(voice), self.now),
                    pattern: pattern.map(|p| p.label.clone()),
                    steps: pattern.map_or(0, |p| p.len()),
                    subdivision: pattern.map(|p| p.subdivision.label()),
                }
            })
            .collect();

        EngineSnapshot {
            scale: state.scale.name.clone(),
            style: state.style.name.to_string(),
            bpm: state.bpm,
            playing: state.is_playing,
            position: self.transport.format_position(),
            master_volume: state.master_volume,
            master_level: self.gains.level(GainTarget::Master, self.now),
            voices,
            bass_rhythm: state.bass_rhythm_override.map(|r| r.name().to_string()),
            drum_pattern: state.drum_preset().name.to_string(),
            drum_pitch_offset: state.drum_pitch_offset,
            markov_chain: state.use_markov_chain,
            euclidean_rhythm: state.use_euclidean_rhythm,
            euclidean_pulses: state.euclidean_pulses,
            euclidean_steps: state.euclidean_steps,
        }
    }
}
