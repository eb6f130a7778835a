//! The four generated voices and per-voice storage

use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A generated voice (stem)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Voice {
    Bass,
    Pad,
    Arp,
    Drums,
}

impl Voice {
    /// All voices in firing order for simultaneous steps
    pub const ALL: [Voice; 4] = [Voice::Bass, Voice::Pad, Voice::Arp, Voice::Drums];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Bass => "bass",
            Self::Pad => "pad",
            Self::Arp => "arp",
            Self::Drums => "drums",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Bass => 0,
            Self::Pad => 1,
            Self::Arp => 2,
            Self::Drums => 3,
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Voice {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bass" => Ok(Self::Bass),
            "pad" | "chords" => Ok(Self::Pad),
            "arp" => Ok(Self::Arp),
            "drums" | "drum" => Ok(Self::Drums),
            _ => Err(EngineError::UnknownVoice(s.to_string())),
        }
    }
}

/// Fixed-size map with one slot per voice
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceMap<T> {
    slots: [T; 4],
}

impl<T> VoiceMap<T> {
    pub fn from_fn(mut f: impl FnMut(Voice) -> T) -> Self {
        Self {
            slots: std::array::from_fn(|i| f(Voice::ALL[i])),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Voice, &T)> {
        Voice::ALL.into_iter().zip(self.slots.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Voice, &mut T)> {
        Voice::ALL.into_iter().zip(self.slots.iter_mut())
    }
}

impl<T> Index<Voice> for VoiceMap<T> {
    type Output = T;

    fn index(&self, voice: Voice) -> &T {
        &self.slots[voice.index()]
    }
}

impl<T> IndexMut<Voice> for VoiceMap<T> {
    fn index_mut(&mut self, voice: Voice) -> &mut T {
        &mut self.slots[voice.index()]
    }
}
