//! Transport clock and per-voice pattern scheduling

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::pattern::{Event, Pattern, BEATS_PER_BAR, PPQ};
use crate::voice::{Voice, VoiceMap};

/// Transport playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
}

/// Lifecycle of a bound pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    /// Bound but not stepping
    Stopped,
    /// Stepping; step `k` falls on `origin + offset + k * subdivision`
    Running { offset: u64 },
}

/// Handle identifying one binding; never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(u64);

#[derive(Debug, Clone)]
struct Binding {
    id: BindingId,
    pattern: Pattern,
    state: BindingState,
}

/// A step that came due during an advance
#[derive(Debug, Clone, PartialEq)]
pub struct FiredStep {
    pub voice: Voice,
    pub binding: BindingId,
    /// Absolute transport tick
    pub tick: u64,
    /// Index into the pattern's events
    pub step: usize,
    pub event: Event,
    pub duration_ticks: u64,
}

/// Shared tempo clock driving one looping pattern per voice.
///
/// All running bindings are anchored to the same origin, so patterns of
/// different lengths and subdivisions keep a fixed phase relationship.
#[derive(Debug, Clone)]
pub struct TransportScheduler {
    state: TransportState,
    /// Current position in ticks
    position: u64,
    /// Shared zero reference set by `start`
    origin: u64,
    /// Tempo in BPM
    bpm: f64,
    /// Fractional ticks carried between advances
    remainder: f64,
    bindings: VoiceMap<Option<Binding>>,
    next_binding_id: u64,
}

impl TransportScheduler {
    pub fn new(bpm: f64) -> Self {
        Self {
            state: TransportState::Stopped,
            position: 0,
            origin: 0,
            bpm,
            remainder: 0.0,
            bindings: VoiceMap::default(),
            next_binding_id: 1,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Change tempo; positions are in ticks so phase is unaffected
    pub fn set_bpm(&mut self, bpm: f64) {
        self.bpm = bpm;
    }

    /// Current position in ticks
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Ticks elapsed since the shared start reference
    pub fn elapsed_ticks(&self) -> u64 {
        self.position - self.origin
    }

    pub fn ticks_to_seconds(&self, ticks: u64) -> f64 {
        ticks as f64 / PPQ as f64 * 60.0 / self.bpm
    }

    /// Current beat number since start (0-indexed)
    pub fn current_beat(&self) -> f64 {
        self.elapsed_ticks() as f64 / PPQ as f64
    }

    /// Position as bars:beats:sixteenths
    pub fn format_position(&self) -> String {
        let ticks = self.elapsed_ticks();
        let sixteenth = PPQ / 4;
        let bar = ticks / (PPQ * BEATS_PER_BAR);
        let beat = ticks / PPQ % BEATS_PER_BAR;
        let six = ticks % PPQ / sixteenth;
        format!("{}:{}:{}", bar, beat, six)
    }

    pub fn pattern(&self, voice: Voice) -> Option<&Pattern> {
        self.bindings[voice].as_ref().map(|b| &b.pattern)
    }

    pub fn binding_state(&self, voice: Voice) -> Option<BindingState> {
        self.bindings[voice].as_ref().map(|b| b.state)
    }

    pub fn binding_id(&self, voice: Voice) -> Option<BindingId> {
        self.bindings[voice].as_ref().map(|b| b.id)
    }

    /// Bind a pattern to an unbound voice. Binding over a live binding is a
    /// contract violation and fails with `SchedulingConflict`.
    pub fn bind(&mut self, pattern: Pattern) -> Result<BindingId> {
        let voice = pattern.voice;
        if self.bindings[voice].is_some() {
            return Err(EngineError::SchedulingConflict(voice));
        }
        if pattern.is_empty() {
            return Err(EngineError::InvalidGenerationInput(format!(
                "{} pattern has no steps",
                voice
            )));
        }

        let id = BindingId(self.next_binding_id);
        self.next_binding_id += 1;
        self.bindings[voice] = Some(Binding {
            id,
            pattern,
            state: BindingState::Stopped,
        });
        Ok(id)
    }

    /// Stop and dispose a voice's binding; none of its steps fire afterwards
    pub fn unbind(&mut self, voice: Voice) -> Option<Pattern> {
        self.bindings[voice].take().map(|b| b.pattern)
    }

    /// Replace a voice's pattern: dispose the old binding, bind the new one and,
    /// if the transport is running, restart it at position 0 of the shared grid.
    pub fn rebind(&mut self, pattern: Pattern) -> Result<BindingId> {
        let voice = pattern.voice;
        self.unbind(voice);
        let id = self.bind(pattern)?;
        if self.is_running() {
            self.start_voice(voice, 0);
        }
        Ok(id)
    }

    pub fn dispose_all(&mut self) {
        for (_, binding) in self.bindings.iter_mut() {
            *binding = None;
        }
    }

    /// Start the clock and every bound voice from the same zero reference
    pub fn start(&mut self) {
        self.state = TransportState::Playing;
        self.origin = self.position;
        self.remainder = 0.0;
        for voice in Voice::ALL {
            self.start_voice(voice, 0);
        }
    }

    /// Start one voice `offset` ticks after the shared origin. Steps already
    /// in the past are skipped, keeping the voice on the shared grid.
    pub fn start_voice(&mut self, voice: Voice, offset: u64) {
        if let Some(binding) = self.bindings[voice].as_mut() {
            binding.state = BindingState::Running { offset };
        }
    }

    pub fn stop_voice(&mut self, voice: Voice) {
        if let Some(binding) = self.bindings[voice].as_mut() {
            binding.state = BindingState::Stopped;
        }
    }

    /// Halt stepping and rewind; bindings stay bound but stopped
    pub fn stop(&mut self) {
        self.state = TransportState::Stopped;
        self.position = 0;
        self.origin = 0;
        self.remainder = 0.0;
        for voice in Voice::ALL {
            self.stop_voice(voice);
        }
    }

    /// Advance by wall time at the current tempo
    pub fn advance_seconds(&mut self, seconds: f64) -> Vec<FiredStep> {
        if !self.is_running() || !seconds.is_finite() || seconds <= 0.0 {
            return Vec::new();
        }
        let exact = seconds * self.bpm / 60.0 * PPQ as f64 + self.remainder;
        let whole = exact.floor();
        self.remainder = exact - whole;
        self.advance_ticks(whole as u64)
    }

    /// Advance the clock, returning every step due in `[position, position + ticks)`
    /// ordered by time, then by voice.
    pub fn advance_ticks(&mut self, ticks: u64) -> Vec<FiredStep> {
        if !self.is_running() {
            return Vec::new();
        }
        let start = self.position;
        let end = start + ticks;
        let mut fired = Vec::new();

        for (voice, binding) in self.bindings.iter() {
            let Some(binding) = binding else { continue };
            let BindingState::Running { offset } = binding.state else { continue };

            let anchor = self.origin + offset;
            let sub = binding.pattern.subdivision.ticks();
            let len = binding.pattern.len();
            let mut k = if start > anchor { (start - anchor).div_ceil(sub) } else { 0 };
            loop {
                let tick = anchor + k * sub;
                if tick >= end {
                    break;
                }
                let step = (k % len as u64) as usize;
                fired.push(FiredStep {
                    voice,
                    binding: binding.id,
                    tick,
                    step,
                    event: binding.pattern.events[step].clone(),
                    duration_ticks: sub,
                });
                k += 1;
            }
        }

        fired.sort_by_key(|s| (s.tick, s.voice));
        self.position = end;
        fired
    }
}
