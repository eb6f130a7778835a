//! Linear gain ramps with cancel-and-replace semantics

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::voice::{Voice, VoiceMap};

/// Which gain stage a ramp applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GainTarget {
    Voice(Voice),
    Master,
}

/// A linear ramp anchored at the level it started from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ramp {
    pub start_time: f64,
    pub start_level: f32,
    pub target: f32,
    pub duration: f64,
}

impl Ramp {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    pub fn level_at(&self, time: f64) -> f32 {
        if self.duration <= 0.0 || time >= self.end_time() {
            return self.target;
        }
        if time <= self.start_time {
            return self.start_level;
        }
        let t = ((time - self.start_time) / self.duration) as f32;
        self.start_level + (self.target - self.start_level) * t
    }
}

/// One gain stage: a settled level plus at most one pending ramp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainEnvelope {
    level: f32,
    ramp: Option<Ramp>,
}

impl GainEnvelope {
    pub fn new(level: f32) -> Self {
        Self {
            level: level.clamp(0.0, 1.0),
            ramp: None,
        }
    }

    /// Actual level at `time`
    pub fn value_at(&self, time: f64) -> f32 {
        match &self.ramp {
            Some(ramp) => ramp.level_at(time),
            None => self.level,
        }
    }

    /// Level the envelope settles at once any ramp completes
    pub fn target(&self) -> f32 {
        self.ramp.map_or(self.level, |r| r.target)
    }

    pub fn pending_ramp(&self) -> Option<&Ramp> {
        self.ramp.as_ref()
    }

    pub fn is_ramping(&self, time: f64) -> bool {
        self.ramp.is_some_and(|r| time < r.end_time())
    }

    /// Cancel whatever is pending and ramp from the current actual level
    pub fn ramp_to(&mut self, target: f32, duration: f64, now: f64) -> Ramp {
        let ramp = Ramp {
            start_time: now,
            start_level: self.value_at(now),
            target: target.clamp(0.0, 1.0),
            duration: duration.max(0.0),
        };
        self.level = ramp.start_level;
        self.ramp = Some(ramp);
        ramp
    }

    /// Fold a finished ramp into the settled level
    pub fn settle(&mut self, now: f64) {
        if let Some(ramp) = self.ramp {
            if now >= ramp.end_time() {
                self.level = ramp.target;
                self.ramp = None;
            }
        }
    }
}

/// Per-voice and master gain stages
#[derive(Debug, Clone)]
pub struct GainEnvelopeController {
    master: GainEnvelope,
    voices: VoiceMap<GainEnvelope>,
    fade_time: f64,
}

impl GainEnvelopeController {
    /// Voices start silent
    pub fn new(master_level: f32, fade_time: f64) -> Self {
        Self {
            master: GainEnvelope::new(master_level),
            voices: VoiceMap::from_fn(|_| GainEnvelope::new(0.0)),
            fade_time,
        }
    }

    pub fn fade_time(&self) -> f64 {
        self.fade_time
    }

    pub fn envelope(&self, target: GainTarget) -> &GainEnvelope {
        match target {
            GainTarget::Voice(voice) => &self.voices[voice],
            GainTarget::Master => &self.master,
        }
    }

    fn envelope_mut(&mut self, target: GainTarget) -> &mut GainEnvelope {
        match target {
            GainTarget::Voice(voice) => &mut self.voices[voice],
            GainTarget::Master => &mut self.master,
        }
    }

    pub fn level(&self, target: GainTarget, now: f64) -> f32 {
        self.envelope(target).value_at(now)
    }

    pub fn ramp(&mut self, target: GainTarget, level: f32, duration: f64, now: f64) -> Ramp {
        let ramp = self.envelope_mut(target).ramp_to(level, duration, now);
        debug!(?target, from = ramp.start_level, to = ramp.target, duration, "Gain ramp");
        ramp
    }

    pub fn fade_in(&mut self, voice: Voice, volume: f32, now: f64) -> Ramp {
        self.ramp(GainTarget::Voice(voice), volume, self.fade_time, now)
    }

    /// Fade to silence; the voice's transport keeps stepping
    pub fn fade_out(&mut self, voice: Voice, now: f64) -> Ramp {
        self.ramp(GainTarget::Voice(voice), 0.0, self.fade_time, now)
    }

    pub fn settle(&mut self, now: f64) {
        self.master.settle(now);
        for (_, envelope) in self.voices.iter_mut() {
            envelope.settle(now);
        }
    }
}
