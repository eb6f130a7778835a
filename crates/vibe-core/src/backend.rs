//! Interface to the audio collaborator that actually makes sound

use crate::gain::{GainTarget, Ramp};
use crate::pattern::Event;
use crate::voice::Voice;

/// Sound-producing side of the engine. Calls are fire-and-forget.
pub trait AudioBackend {
    /// Sound `event` (never a rest) for `duration` seconds at `time`
    fn trigger(&mut self, voice: Voice, event: &Event, duration: f64, time: f64);

    /// Replace any pending automation on `target` with `ramp`
    fn ramp_gain(&mut self, target: GainTarget, ramp: &Ramp);
}

impl<B: AudioBackend + ?Sized> AudioBackend for Box<B> {
    fn trigger(&mut self, voice: Voice, event: &Event, duration: f64, time: f64) {
        (**self).trigger(voice, event, duration, time);
    }

    fn ramp_gain(&mut self, target: GainTarget, ramp: &Ramp) {
        (**self).ramp_gain(target, ramp);
    }
}
