//! Generated event sequences and the per-voice generators that build them

use serde::{Deserialize, Serialize};

use crate::algorithms::{euclidean_rhythm, Pitch, Scale};
use crate::error::Result;
use crate::markov::MarkovChain;
use crate::state::EngineState;
use crate::style::{ArpStyle, BassRhythm, Style, DRUM_PRESETS};
use crate::voice::Voice;

/// Transport ticks per quarter note
pub const PPQ: u64 = 480;
/// Quarter notes per bar (4/4)
pub const BEATS_PER_BAR: u64 = 4;

const BASS_OCTAVE: i8 = 2;
const PAD_OCTAVE: i8 = 3;
const ARP_OCTAVE: i8 = 4;
/// Pitch every drum onset is assigned before the live offset
pub const DRUM_PITCH: Pitch = Pitch { class: 0, octave: 1 };

/// Grid unit a pattern steps through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Subdivision {
    Measure,
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
}

impl Subdivision {
    pub fn ticks(&self) -> u64 {
        match self {
            Self::Measure => PPQ * BEATS_PER_BAR,
            Self::Whole => PPQ * 4,
            Self::Half => PPQ * 2,
            Self::Quarter => PPQ,
            Self::Eighth => PPQ / 2,
            Self::Sixteenth => PPQ / 4,
            Self::ThirtySecond => PPQ / 8,
        }
    }

    /// Duration in seconds at the given tempo
    pub fn seconds(&self, bpm: f64) -> f64 {
        self.ticks() as f64 / PPQ as f64 * 60.0 / bpm
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Measure => "1m",
            Self::Whole => "1n",
            Self::Half => "2n",
            Self::Quarter => "4n",
            Self::Eighth => "8n",
            Self::Sixteenth => "16n",
            Self::ThirtySecond => "32n",
        }
    }
}

/// One grid position of a pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    Rest,
    Note(Pitch),
    Chord(Vec<Pitch>),
}

impl Event {
    pub fn is_rest(&self) -> bool {
        matches!(self, Self::Rest)
    }

    pub fn pitches(&self) -> &[Pitch] {
        match self {
            Self::Rest => &[],
            Self::Note(p) => std::slice::from_ref(p),
            Self::Chord(ps) => ps,
        }
    }

    /// Shift every pitch by `semitones`
    pub fn transposed(&self, semitones: i32) -> Event {
        match self {
            Self::Rest => Self::Rest,
            Self::Note(p) => Self::Note(p.transpose(semitones)),
            Self::Chord(ps) => Self::Chord(ps.iter().map(|p| p.transpose(semitones)).collect()),
        }
    }
}

/// A looping event sequence for one voice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub voice: Voice,
    pub events: Vec<Event>,
    pub subdivision: Subdivision,
    /// Human-readable name of what was chosen (template, preset, progression)
    pub label: String,
}

impl Pattern {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Length of one loop in transport ticks
    pub fn cycle_ticks(&self) -> u64 {
        self.events.len() as u64 * self.subdivision.ticks()
    }

    pub fn onsets(&self) -> usize {
        self.events.iter().filter(|e| !e.is_rest()).count()
    }
}

// ============================================================================
// Templates
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BassSlot {
    Root,
    Fifth,
    Rest,
}

fn bass_template(rhythm: BassRhythm) -> (&'static [BassSlot], Subdivision) {
    use BassSlot::{Fifth as F, Rest as R, Root as T};
    match rhythm {
        BassRhythm::Whole => (&[T], Subdivision::Whole),
        BassRhythm::Half => (&[T, F], Subdivision::Half),
        BassRhythm::Quarter => (&[T, R, F, R], Subdivision::Quarter),
        BassRhythm::Syncopated => (&[T, R, R, T, R, R, F, R], Subdivision::Eighth),
        BassRhythm::Eighth => (&[T, R, T, F, T, R, F, T], Subdivision::Eighth),
        BassRhythm::Sixteenth => (
            &[T, R, T, T, F, R, T, R, T, R, T, T, F, R, F, R],
            Subdivision::Sixteenth,
        ),
        BassRhythm::ThirtySecond => (
            &[T, R, T, T, F, R, F, T, T, R, T, T, F, F, T, R],
            Subdivision::ThirtySecond,
        ),
    }
}

/// Scale-degree offsets (0, 2, 4, 5, 6) per step; `None` is a rest
fn arp_template(style: ArpStyle) -> [Option<i32>; 16] {
    const N: Option<i32> = None;
    match style {
        ArpStyle::Classic => [
            Some(0), Some(2), Some(4), Some(5), Some(6), Some(5), Some(4), Some(2),
            Some(0), Some(2), Some(4), Some(5), Some(6), Some(5), Some(4), Some(2),
        ],
        ArpStyle::Melodic => [
            Some(0), N, Some(2), Some(4), N, Some(5), Some(6), N,
            Some(6), N, Some(5), Some(4), N, Some(2), Some(0), N,
        ],
        ArpStyle::Stabs => [
            Some(0), N, N, Some(4), N, N, Some(0), N,
            N, N, Some(5), N, N, Some(4), N, N,
        ],
        ArpStyle::Atmospheric => [
            Some(0), N, N, N, N, N, Some(4), N,
            N, N, N, N, Some(6), N, N, N,
        ],
        ArpStyle::Rhythmic => [
            Some(0), N, Some(2), N, Some(4), N, Some(2), N,
            Some(0), N, Some(5), N, Some(4), N, Some(6), N,
        ],
    }
}

// ============================================================================
// Generators
// ============================================================================

/// Builds fresh patterns from the current engine state
#[derive(Debug, Clone)]
pub struct PatternGenerator {
    markov: MarkovChain,
}

impl PatternGenerator {
    pub fn new(markov: MarkovChain) -> Self {
        Self { markov }
    }

    pub fn generate(&self, voice: Voice, state: &EngineState, rng: &mut fastrand::Rng) -> Result<Pattern> {
        match voice {
            Voice::Bass => Ok(bass(&state.scale, state.style, state.bass_rhythm_override, rng)),
            Voice::Pad => self.pad(&state.scale, state.style, state.use_markov_chain, rng),
            Voice::Arp => Ok(arp(&state.scale, state.style.pick_arp_style(rng))),
            Voice::Drums => drums(state),
        }
    }

    /// One triad per bar, from a style progression or a fresh Markov walk
    pub fn pad(&self, scale: &Scale, style: &Style, use_markov: bool, rng: &mut fastrand::Rng) -> Result<Pattern> {
        let progression = if use_markov {
            self.markov.generate(0, 4, rng)?
        } else {
            style.pick_progression(rng).to_vec()
        };

        let events = progression
            .iter()
            .map(|&degree| Event::Chord(scale.triad(degree, PAD_OCTAVE).to_vec()))
            .collect();
        let label = progression
            .iter()
            .map(|d| d.rem_euclid(7).to_string())
            .collect::<Vec<_>>()
            .join("-");

        Ok(Pattern {
            voice: Voice::Pad,
            events,
            subdivision: Subdivision::Measure,
            label,
        })
    }
}

/// Root/fifth figure on the first chord of a style progression
pub fn bass(scale: &Scale, style: &Style, rhythm_override: Option<BassRhythm>, rng: &mut fastrand::Rng) -> Pattern {
    let root = style.pick_progression(rng)[0];
    let rhythm = rhythm_override.unwrap_or_else(|| style.pick_bass_rhythm(rng));
    let (slots, subdivision) = bass_template(rhythm);

    let root_pitch = scale.pitch(root, BASS_OCTAVE);
    let fifth_pitch = scale.pitch(root + 4, BASS_OCTAVE);
    let events = slots
        .iter()
        .map(|slot| match slot {
            BassSlot::Root => Event::Note(root_pitch),
            BassSlot::Fifth => Event::Note(fifth_pitch),
            BassSlot::Rest => Event::Rest,
        })
        .collect();

    Pattern {
        voice: Voice::Bass,
        events,
        subdivision,
        label: rhythm.name().to_string(),
    }
}

/// Sixteen-step melodic figure over the scale
pub fn arp(scale: &Scale, style: ArpStyle) -> Pattern {
    let events = arp_template(style)
        .iter()
        .map(|step| match step {
            Some(degree) => Event::Note(scale.pitch(*degree, ARP_OCTAVE)),
            None => Event::Rest,
        })
        .collect();

    Pattern {
        voice: Voice::Arp,
        events,
        subdivision: Subdivision::Sixteenth,
        label: style.name().to_string(),
    }
}

/// Drum onsets from the selected preset or a Euclidean rhythm. Pitch offset
/// is not applied here; it is added when a step fires.
pub fn drums(state: &EngineState) -> Result<Pattern> {
    let (onsets, subdivision, label) = if state.use_euclidean_rhythm {
        let onsets = euclidean_rhythm(state.euclidean_pulses, state.euclidean_steps)?;
        let label = format!("euclid({},{})", state.euclidean_pulses, state.euclidean_steps);
        (onsets, Subdivision::Sixteenth, label)
    } else {
        let preset = &DRUM_PRESETS[state.drum_pattern_index % DRUM_PRESETS.len()];
        (preset.onsets.to_vec(), Subdivision::Eighth, preset.name.to_string())
    };

    let events = onsets
        .into_iter()
        .map(|hit| if hit { Event::Note(DRUM_PITCH) } else { Event::Rest })
        .collect();

    Ok(Pattern {
        voice: Voice::Drums,
        events,
        subdivision,
        label,
    })
}
