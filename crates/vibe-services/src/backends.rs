//! Audio backends that stand in for a synthesizer

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use vibe_core::{AudioBackend, Event, GainTarget, Ramp, Voice};

/// Logs every trigger and gain ramp through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingBackend;

impl AudioBackend for TracingBackend {
    fn trigger(&mut self, voice: Voice, event: &Event, duration: f64, time: f64) {
        let notes: Vec<String> = event.pitches().iter().map(|p| p.to_string()).collect();
        debug!(%voice, notes = %notes.join(" "), duration, time, "Note");
    }

    fn ramp_gain(&mut self, target: GainTarget, ramp: &Ramp) {
        trace!(?target, from = ramp.start_level, to = ramp.target, duration = ramp.duration, "Ramp");
    }
}

/// One sounded event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerRecord {
    pub voice: Voice,
    /// MIDI note numbers
    pub notes: Vec<i16>,
    pub duration: f64,
    pub time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RampRecord {
    pub target: GainTarget,
    pub ramp: Ramp,
}

/// Everything a backend was asked to do, in call order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    pub triggers: Vec<TriggerRecord>,
    pub ramps: Vec<RampRecord>,
}

impl EventLog {
    pub fn triggers_for(&self, voice: Voice) -> impl Iterator<Item = &TriggerRecord> {
        self.triggers.iter().filter(move |t| t.voice == voice)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Captures calls for inspection or export
#[derive(Debug, Default)]
pub struct RecordingBackend {
    log: EventLog,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn into_log(self) -> EventLog {
        self.log
    }

    pub fn clear(&mut self) {
        self.log = EventLog::default();
    }
}

impl AudioBackend for RecordingBackend {
    fn trigger(&mut self, voice: Voice, event: &Event, duration: f64, time: f64) {
        self.log.triggers.push(TriggerRecord {
            voice,
            notes: event.pitches().iter().map(|p| p.midi()).collect(),
            duration,
            time,
        });
    }

    fn ramp_gain(&mut self, target: GainTarget, ramp: &Ramp) {
        self.log.ramps.push(RampRecord { target, ramp: *ramp });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vibe_core::Pitch;

    #[test]
    fn test_recording_backend_captures_calls() {
        let mut backend = RecordingBackend::new();
        let chord = Event::Chord(vec![Pitch::new(0, 3), Pitch::new(4, 3), Pitch::new(7, 3)]);
        backend.trigger(Voice::Pad, &chord, 2.0, 0.5);
        backend.ramp_gain(
            GainTarget::Master,
            &Ramp {
                start_time: 0.0,
                start_level: 0.0,
                target: 1.0,
                duration: 0.1,
            },
        );

        let log = backend.log();
        assert_eq!(log.triggers.len(), 1);
        assert_eq!(log.triggers[0].notes, vec![48, 52, 55]);
        assert_eq!(log.ramps[0].target, GainTarget::Master);
        assert_eq!(log.triggers_for(Voice::Pad).count(), 1);
        assert_eq!(log.triggers_for(Voice::Bass).count(), 0);

        backend.clear();
        assert!(backend.log().triggers.is_empty());
    }

    #[test]
    fn test_event_log_json() {
        let mut backend = RecordingBackend::new();
        backend.trigger(Voice::Drums, &Event::Note(Pitch::new(0, 1)), 0.25, 1.0);
        let json = backend.log().to_json().unwrap();
        let parsed: EventLog = serde_json::from_str(&json).unwrap();
        assert_eq!(&parsed, backend.log());
        assert!(json.contains("\"Drums\""));
    }
}
