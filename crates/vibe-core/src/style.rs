//! Style presets, drum presets and the named rhythm/arp templates they draw from

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

// ============================================================================
// Drum presets
// ============================================================================

/// A fixed 8-step onset pattern (eighth-note grid)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrumPreset {
    pub name: &'static str,
    pub onsets: [bool; 8],
}

const X: bool = true;
const O: bool = false;

/// Global drum-pattern table; styles refer to entries by index
pub const DRUM_PRESETS: [DrumPreset; 7] = [
    DrumPreset { name: "4-on-Floor", onsets: [X, O, X, O, X, O, X, O] },
    DrumPreset { name: "1, 2, 3&, 4", onsets: [X, O, X, O, O, X, X, O] },
    DrumPreset { name: "Half-Time", onsets: [X, O, O, O, O, O, O, O] },
    DrumPreset { name: "Boom Bap", onsets: [X, O, O, X, O, O, X, O] },
    DrumPreset { name: "Breakbeat", onsets: [X, O, O, X, O, X, O, O] },
    DrumPreset { name: "Offbeat", onsets: [O, X, O, X, O, X, O, X] },
    DrumPreset { name: "Heartbeat", onsets: [X, X, O, O, X, X, O, O] },
];

// ============================================================================
// Bass rhythm templates
// ============================================================================

/// Named bass rhythm templates, ordered from sparse to dense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BassRhythm {
    Whole,
    Half,
    Quarter,
    Syncopated,
    Eighth,
    Sixteenth,
    ThirtySecond,
}

impl BassRhythm {
    pub const ALL: [BassRhythm; 7] = [
        Self::Whole,
        Self::Half,
        Self::Quarter,
        Self::Syncopated,
        Self::Eighth,
        Self::Sixteenth,
        Self::ThirtySecond,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Whole => "whole",
            Self::Half => "half",
            Self::Quarter => "quarter",
            Self::Syncopated => "syncopated",
            Self::Eighth => "eighth",
            Self::Sixteenth => "sixteenth",
            Self::ThirtySecond => "thirty-second",
        }
    }
}

impl fmt::Display for BassRhythm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BassRhythm {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let alias = match lowered.as_str() {
            "1n" | "1" => "whole",
            "2n" | "2" => "half",
            "4n" | "4" => "quarter",
            "8n" | "8" => "eighth",
            "16n" | "16" => "sixteenth",
            "32n" | "32" | "thirtysecond" => "thirty-second",
            other => other,
        };
        Self::ALL
            .into_iter()
            .find(|r| r.name() == alias)
            .ok_or_else(|| EngineError::UnknownBassRhythm(s.to_string()))
    }
}

// ============================================================================
// Arp styles
// ============================================================================

/// Arp pattern-style tags; each maps to one fixed 16-step template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArpStyle {
    /// Ascending then descending arpeggio, every step sounding
    Classic,
    /// Ascend-then-descend melodic line with breaths
    Melodic,
    /// Sparse stabs
    Stabs,
    /// Very sparse, long gaps
    Atmospheric,
    /// Default rhythmic figure
    Rhythmic,
}

impl ArpStyle {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Melodic => "melodic",
            Self::Stabs => "stabs",
            Self::Atmospheric => "atmospheric",
            Self::Rhythmic => "rhythmic",
        }
    }
}

// ============================================================================
// Styles
// ============================================================================

/// An immutable style preset
#[derive(Debug, Clone)]
pub struct Style {
    pub name: &'static str,
    pub tempo_range: RangeInclusive<u32>,
    pub chord_progressions: &'static [&'static [i32]],
    pub bass_rhythms: &'static [BassRhythm],
    pub arp_styles: &'static [ArpStyle],
    /// Indices into [`DRUM_PRESETS`]
    pub drum_patterns: &'static [usize],
}

impl Style {
    /// Pick a tempo inside the style's range
    pub fn pick_bpm(&self, rng: &mut fastrand::Rng) -> u32 {
        rng.u32(self.tempo_range.clone())
    }

    pub fn pick_progression(&self, rng: &mut fastrand::Rng) -> &'static [i32] {
        self.chord_progressions[rng.usize(..self.chord_progressions.len())]
    }

    pub fn pick_bass_rhythm(&self, rng: &mut fastrand::Rng) -> BassRhythm {
        self.bass_rhythms[rng.usize(..self.bass_rhythms.len())]
    }

    pub fn pick_arp_style(&self, rng: &mut fastrand::Rng) -> ArpStyle {
        self.arp_styles[rng.usize(..self.arp_styles.len())]
    }

    pub fn pick_drum_pattern(&self, rng: &mut fastrand::Rng) -> usize {
        self.drum_patterns[rng.usize(..self.drum_patterns.len())]
    }
}

static STYLES: [Style; 6] = [
    Style {
        name: "lofi",
        tempo_range: 70..=90,
        chord_progressions: &[&[1, 4, 0, 5], &[0, 5, 3, 4], &[3, 4, 2, 5], &[5, 3, 0, 4]],
        bass_rhythms: &[BassRhythm::Half, BassRhythm::Quarter, BassRhythm::Syncopated],
        arp_styles: &[ArpStyle::Melodic, ArpStyle::Atmospheric],
        drum_patterns: &[3, 4, 2],
    },
    Style {
        name: "techno",
        tempo_range: 125..=135,
        chord_progressions: &[&[0, 0, 5, 3], &[0, 6, 5, 6], &[0, 3, 0, 4]],
        bass_rhythms: &[BassRhythm::Eighth, BassRhythm::Sixteenth, BassRhythm::ThirtySecond],
        arp_styles: &[ArpStyle::Classic, ArpStyle::Rhythmic],
        drum_patterns: &[0, 1],
    },
    Style {
        name: "house",
        tempo_range: 118..=128,
        chord_progressions: &[&[0, 5, 3, 4], &[1, 4, 0, 0], &[0, 3, 5, 4]],
        bass_rhythms: &[BassRhythm::Syncopated, BassRhythm::Eighth],
        arp_styles: &[ArpStyle::Stabs, ArpStyle::Rhythmic],
        drum_patterns: &[0, 5],
    },
    Style {
        name: "ambient",
        tempo_range: 60..=80,
        chord_progressions: &[&[0, 3, 5, 3], &[0, 4, 5, 2], &[5, 3, 0, 0]],
        bass_rhythms: &[BassRhythm::Whole, BassRhythm::Half],
        arp_styles: &[ArpStyle::Atmospheric, ArpStyle::Melodic],
        drum_patterns: &[2, 6],
    },
    Style {
        name: "synthwave",
        tempo_range: 90..=110,
        chord_progressions: &[&[0, 5, 2, 6], &[5, 3, 0, 4], &[0, 6, 5, 4]],
        bass_rhythms: &[BassRhythm::Eighth, BassRhythm::Sixteenth],
        arp_styles: &[ArpStyle::Classic, ArpStyle::Melodic],
        drum_patterns: &[0, 1, 4],
    },
    Style {
        name: "trap",
        tempo_range: 130..=150,
        chord_progressions: &[&[0, 5, 2, 6], &[0, 0, 3, 4], &[5, 6, 0, 0]],
        bass_rhythms: &[BassRhythm::Whole, BassRhythm::Syncopated, BassRhythm::ThirtySecond],
        arp_styles: &[ArpStyle::Stabs, ArpStyle::Rhythmic],
        drum_patterns: &[2, 4, 6],
    },
];

/// Named style presets
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleCatalog;

impl StyleCatalog {
    pub fn styles(&self) -> &'static [Style] {
        &STYLES
    }

    pub fn get(&self, name: &str) -> Result<&'static Style, EngineError> {
        let name = name.trim();
        STYLES
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| EngineError::UnknownStyle(name.to_string()))
    }

    /// Every progression of every style; the Markov training corpus
    pub fn progressions(&self) -> Vec<&'static [i32]> {
        STYLES
            .iter()
            .flat_map(|s| s.chord_progressions.iter().copied())
            .collect()
    }
}
