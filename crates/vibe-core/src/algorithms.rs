//! Algorithmic composition tools (Euclidean rhythms, scales, triads)

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

// ============================================================================
// Euclidean Rhythm Generator
// ============================================================================

/// Longest accepted Euclidean pattern
pub const MAX_EUCLIDEAN_STEPS: u32 = 64;

/// Reject step counts outside `1..=MAX_EUCLIDEAN_STEPS`
pub fn validate_euclidean_steps(steps: u32) -> Result<u32> {
    if steps == 0 {
        return Err(EngineError::InvalidGenerationInput(
            "euclidean rhythm needs at least one step".to_string(),
        ));
    }
    if steps > MAX_EUCLIDEAN_STEPS {
        return Err(EngineError::InvalidGenerationInput(format!(
            "euclidean rhythm has {} steps; at most {} allowed",
            steps, MAX_EUCLIDEAN_STEPS
        )));
    }
    Ok(steps)
}

/// Generate a Euclidean rhythm pattern
///
/// # Arguments
/// * `pulses` - Number of onsets to distribute (clamped to `steps`)
/// * `steps` - Total number of steps in the pattern (1 to `MAX_EUCLIDEAN_STEPS`)
///
/// # Returns
/// Vec of bools where true = onset, false = rest
///
/// # Example
/// ```
/// use vibe_core::euclidean_rhythm;
/// let pattern = euclidean_rhythm(3, 8).unwrap();
/// assert_eq!(pattern, vec![true, false, false, true, false, false, true, false]);
/// ```
pub fn euclidean_rhythm(pulses: u32, steps: u32) -> Result<Vec<bool>> {
    let steps = validate_euclidean_steps(steps)?;

    let pulses = pulses.min(steps);
    let len = steps as usize;

    if pulses == 0 {
        return Ok(vec![false; len]);
    }

    if pulses == steps {
        return Ok(vec![true; len]);
    }

    // Bjorklund's algorithm
    let mut counts = vec![vec![true]; pulses as usize];
    let mut remainders = vec![vec![false]; (steps - pulses) as usize];

    loop {
        let pairs = counts.len().min(remainders.len());
        if counts.len() > pairs {
            // Surplus count groups become the new remainder
            let surplus = counts.split_off(pairs);
            for (count, remainder) in counts.iter_mut().zip(remainders.drain(..)) {
                count.extend(remainder);
            }
            remainders = surplus;
        } else {
            for (count, remainder) in counts.iter_mut().zip(remainders.drain(..pairs)) {
                count.extend(remainder);
            }
        }

        if remainders.len() <= 1 {
            break;
        }
    }

    let mut pattern: Vec<bool> = counts
        .into_iter()
        .chain(remainders)
        .flatten()
        .collect();
    pattern.resize(len, false);
    Ok(pattern)
}

// ============================================================================
// Pitches
// ============================================================================

const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// Parse a note letter with optional accidental into a pitch class (0-11)
pub fn parse_pitch_class(name: &str) -> Option<u8> {
    let mut chars = name.trim().chars();
    let base: i8 = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let accidental: i8 = match chars.as_str() {
        "" => 0,
        "#" | "s" | "sharp" => 1,
        "b" | "flat" => -1,
        _ => return None,
    };
    Some((base + accidental).rem_euclid(12) as u8)
}

/// A concrete pitch: pitch class plus an integer register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pitch {
    /// Pitch class, 0 = C
    pub class: u8,
    /// Octave number, 4 = the octave starting at middle C
    pub octave: i8,
}

impl Pitch {
    pub fn new(class: u8, octave: i8) -> Self {
        Self { class: class % 12, octave }
    }

    pub fn from_midi(note: i16) -> Self {
        let note = note.clamp(0, 127);
        Self {
            class: note.rem_euclid(12) as u8,
            octave: (note.div_euclid(12) - 1) as i8,
        }
    }

    /// MIDI note number (60 = middle C)
    pub fn midi(&self) -> i16 {
        (self.octave as i16 + 1) * 12 + self.class as i16
    }

    /// Shift by semitones, clamped to the MIDI range
    pub fn transpose(&self, semitones: i32) -> Self {
        let shifted = (self.midi() as i32 + semitones).clamp(0, 127);
        Self::from_midi(shifted as i16)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", NOTE_NAMES[self.class as usize], self.octave)
    }
}

// ============================================================================
// Scales
// ============================================================================

/// Seven-note modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleMode {
    Major,
    Minor,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Locrian,
    HarmonicMinor,
    MelodicMinor,
}

impl ScaleMode {
    pub const ALL: [ScaleMode; 9] = [
        Self::Major,
        Self::Minor,
        Self::Dorian,
        Self::Phrygian,
        Self::Lydian,
        Self::Mixolydian,
        Self::Locrian,
        Self::HarmonicMinor,
        Self::MelodicMinor,
    ];

    /// Get scale intervals (semitones from root)
    pub fn intervals(&self) -> [u8; 7] {
        match self {
            Self::Major => [0, 2, 4, 5, 7, 9, 11],
            Self::Minor => [0, 2, 3, 5, 7, 8, 10],
            Self::Dorian => [0, 2, 3, 5, 7, 9, 10],
            Self::Phrygian => [0, 1, 3, 5, 7, 8, 10],
            Self::Lydian => [0, 2, 4, 6, 7, 9, 11],
            Self::Mixolydian => [0, 2, 4, 5, 7, 9, 10],
            Self::Locrian => [0, 1, 3, 5, 6, 8, 10],
            Self::HarmonicMinor => [0, 2, 3, 5, 7, 8, 11],
            Self::MelodicMinor => [0, 2, 3, 5, 7, 9, 11],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Dorian => "dorian",
            Self::Phrygian => "phrygian",
            Self::Lydian => "lydian",
            Self::Mixolydian => "mixolydian",
            Self::Locrian => "locrian",
            Self::HarmonicMinor => "harmonic minor",
            Self::MelodicMinor => "melodic minor",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "" | "major" | "maj" | "ionian" => Some(Self::Major),
            "minor" | "min" | "m" | "aeolian" => Some(Self::Minor),
            "harmonic" | "harmonic-minor" => Some(Self::HarmonicMinor),
            "melodic" | "melodic-minor" => Some(Self::MelodicMinor),
            other => Self::ALL.into_iter().find(|m| m.name() == other),
        }
    }
}

/// A resolved diatonic scale: seven pitch classes indexed by degree 0-6
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scale {
    pub name: String,
    pub tonic: u8,
    pub mode: ScaleMode,
    notes: [u8; 7],
}

impl Scale {
    pub fn new(tonic: u8, mode: ScaleMode) -> Self {
        let tonic = tonic % 12;
        let notes = mode.intervals().map(|i| (tonic + i) % 12);
        Self {
            name: format!("{} {}", NOTE_NAMES[tonic as usize], mode.name()),
            tonic,
            mode,
            notes,
        }
    }

    /// Pitch classes in degree order
    pub fn notes(&self) -> &[u8; 7] {
        &self.notes
    }

    /// Pitch class of a degree; any integer is reduced modulo 7
    pub fn degree(&self, degree: i32) -> u8 {
        self.notes[degree.rem_euclid(7) as usize]
    }

    /// Concrete pitch of a degree in the register whose lowest scale tone is
    /// the tonic in `octave`
    pub fn pitch(&self, degree: i32, octave: i8) -> Pitch {
        let interval = self.mode.intervals()[degree.rem_euclid(7) as usize];
        let base = (octave as i16 + 1) * 12 + self.tonic as i16;
        Pitch::from_midi(base + interval as i16)
    }

    /// Root-position triad on `degree` (root, third, fifth). Chord tones that
    /// wrap past the seventh degree move up one register so the triad always
    /// ascends.
    pub fn triad(&self, degree: i32, octave: i8) -> [Pitch; 3] {
        let root = degree.rem_euclid(7);
        [0, 2, 4].map(|offset| {
            let raw = root + offset;
            self.pitch(raw % 7, octave + (raw / 7) as i8)
        })
    }
}

/// Maps a scale name to its seven pitch classes
pub trait ScaleResolver: Send {
    fn resolve(&self, name: &str) -> Result<Scale>;
}

/// Resolves "<tonic> <mode>" names such as "A minor", "f# dorian" or "c"
#[derive(Debug, Clone, Copy, Default)]
pub struct DiatonicScales;

impl ScaleResolver for DiatonicScales {
    fn resolve(&self, name: &str) -> Result<Scale> {
        let unknown = || EngineError::UnknownScale(name.to_string());
        let lowered = name.trim().to_ascii_lowercase();
        let (tonic, mode) = match lowered.split_once(char::is_whitespace) {
            Some((tonic, mode)) => (tonic, mode.trim()),
            None => (lowered.as_str(), ""),
        };
        let tonic = parse_pitch_class(tonic).ok_or_else(unknown)?;
        let mode = ScaleMode::parse(mode).ok_or_else(unknown)?;
        Ok(Scale::new(tonic, mode))
    }
}
