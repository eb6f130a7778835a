//! Realtime driver: advances the engine from the wall clock and applies
//! commands between advances

use std::time::{Duration, Instant};

use crossbeam_channel::{select, tick, Receiver};
use thiserror::Error;
use tracing::{info, warn};
use vibe_core::{AudioBackend, Engine, EngineConfig, EngineError};

use crate::command::Command;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outcome of one command, for the front end to show
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Ok(String),
    Err(String),
}

pub struct EngineRunner<B: AudioBackend> {
    engine: Engine<B>,
    commands: Receiver<Command>,
    interval: Duration,
}

impl<B: AudioBackend> EngineRunner<B> {
    pub fn new(config: EngineConfig, backend: B, commands: Receiver<Command>) -> Result<Self, RunnerError> {
        let interval = Duration::from_millis(config.tick_interval_ms.max(1));
        let engine = Engine::new(config, backend)?;
        Ok(Self {
            engine,
            commands,
            interval,
        })
    }

    pub fn engine(&self) -> &Engine<B> {
        &self.engine
    }

    /// Apply one command and describe the result
    pub fn apply(&mut self, command: Command) -> Result<String, RunnerError> {
        let engine = &mut self.engine;
        let message = match command {
            Command::Start => {
                engine.start()?;
                "playing".to_string()
            }
            Command::Stop => {
                engine.stop();
                "stopping".to_string()
            }
            Command::Regenerate => {
                engine.regenerate()?;
                "regenerated".to_string()
            }
            Command::Scale(name) => {
                engine.set_scale(&name)?;
                format!("scale {}", engine.state().scale.name)
            }
            Command::Style(name) => {
                let selection = engine.set_style(&name)?;
                format!(
                    "style {} at {} bpm, drums {}",
                    selection.style_name, selection.bpm, selection.drum_pattern_name
                )
            }
            Command::Tempo(bpm) => {
                engine.set_tempo(bpm)?;
                format!("tempo {}", bpm)
            }
            Command::Enable(voice) => {
                engine.set_stem_enabled(voice, true);
                format!("{} on", voice)
            }
            Command::Disable(voice) => {
                engine.set_stem_enabled(voice, false);
                format!("{} off", voice)
            }
            Command::Volume(voice, level) => {
                engine.set_stem_volume(voice, level)?;
                format!("{} volume {}", voice, engine.state().voices[voice].volume)
            }
            Command::Master(level) => {
                engine.set_master_volume(level)?;
                format!("master {}", engine.state().master_volume)
            }
            Command::BassRhythm(name) => {
                engine.set_bass_rhythm(&name)?;
                let rhythm = engine.state().bass_rhythm_override;
                format!("bass {}", rhythm.map_or("auto", |r| r.name()))
            }
            Command::DrumOffset(semitones) => {
                engine.set_drum_pitch_offset(semitones);
                format!("drum offset {}", engine.state().drum_pitch_offset)
            }
            Command::NextDrums => format!("drums {}", engine.next_drum_pattern()?),
            Command::Euclid { pulses, steps } => {
                engine.set_euclidean_params(pulses, steps)?;
                format!("euclid({},{})", pulses, steps)
            }
            Command::Markov(enabled) => {
                engine.toggle_markov_chain(enabled)?;
                format!("markov {}", if enabled { "on" } else { "off" })
            }
            Command::EuclidMode(enabled) => {
                engine.toggle_euclidean_rhythm(enabled)?;
                format!("euclid-mode {}", if enabled { "on" } else { "off" })
            }
            Command::Status => serde_json::to_string_pretty(&engine.snapshot())?,
            Command::Quit => "bye".to_string(),
        };
        Ok(message)
    }

    /// Run until `quit` arrives or every command sender is dropped, then fade
    /// out and hand the engine back.
    pub fn run(mut self, mut report: impl FnMut(Reply)) -> Engine<B> {
        let commands = self.commands.clone();
        let ticker = tick(self.interval);
        let mut last = Instant::now();
        info!(interval_ms = self.interval.as_millis() as u64, "Runner started");

        loop {
            select! {
                recv(commands) -> msg => {
                    // Land the command at the current wall time
                    let now = Instant::now();
                    self.engine.advance(now.duration_since(last).as_secs_f64());
                    last = now;

                    let command = match msg {
                        Ok(Command::Quit) | Err(_) => break,
                        Ok(command) => command,
                    };
                    match self.apply(command) {
                        Ok(message) => report(Reply::Ok(message)),
                        Err(e) => {
                            warn!("{}", e);
                            report(Reply::Err(e.to_string()));
                        }
                    }
                }
                recv(ticker) -> _ => {
                    let now = Instant::now();
                    self.engine.advance(now.duration_since(last).as_secs_f64());
                    last = now;
                }
            }
        }

        // Keep the clock running until the fade-out teardown has happened
        self.engine.stop();
        while self.engine.teardown_pending() {
            if ticker.recv().is_err() {
                break;
            }
            let now = Instant::now();
            self.engine.advance(now.duration_since(last).as_secs_f64());
            last = now;
        }
        info!("Runner stopped");
        self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::RecordingBackend;
    use crossbeam_channel::unbounded;
    use vibe_core::Voice;

    fn config() -> EngineConfig {
        EngineConfig {
            seed: Some(11),
            fade_time: 0.05,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_apply_commands() {
        let (_tx, rx) = unbounded();
        let mut runner = EngineRunner::new(config(), RecordingBackend::new(), rx).unwrap();

        assert_eq!(runner.apply(Command::Scale("a minor".to_string())).unwrap(), "scale A minor");
        assert!(runner.apply(Command::Style("house".to_string())).unwrap().starts_with("style house"));
        assert_eq!(runner.apply(Command::Start).unwrap(), "playing");
        assert_eq!(runner.apply(Command::Volume(Voice::Arp, 0.0)).unwrap(), "arp volume 0");
        assert!(!runner.engine().state().voices[Voice::Arp].enabled);
        assert_eq!(runner.apply(Command::BassRhythm("8n".to_string())).unwrap(), "bass eighth");

        let status = runner.apply(Command::Status).unwrap();
        assert!(status.contains("\"playing\": true"));
        assert!(matches!(
            runner.apply(Command::Tempo(1000.0)),
            Err(RunnerError::Engine(EngineError::InvalidTempo(_)))
        ));
    }

    #[test]
    fn test_non_finite_volume_command_fails() {
        let (_tx, rx) = unbounded();
        let mut runner = EngineRunner::new(config(), RecordingBackend::new(), rx).unwrap();
        assert!(matches!(
            runner.apply(Command::Volume(Voice::Arp, f32::NAN)),
            Err(RunnerError::Engine(EngineError::InvalidVolume(_)))
        ));
        assert!(matches!(
            runner.apply(Command::Master(f32::INFINITY)),
            Err(RunnerError::Engine(EngineError::InvalidVolume(_)))
        ));
        assert_eq!(runner.engine().state().voices[Voice::Arp].volume, 0.8);
        assert_eq!(runner.engine().state().master_volume, 1.0);
    }

    #[test]
    fn test_run_until_quit() {
        let (tx, rx) = unbounded();
        let runner = EngineRunner::new(config(), RecordingBackend::new(), rx).unwrap();
        tx.send(Command::Start).unwrap();
        tx.send(Command::Style("nope".to_string())).unwrap();
        tx.send(Command::Quit).unwrap();
        tx.send(Command::Regenerate).unwrap();

        let mut replies = Vec::new();
        let engine = runner.run(|reply| replies.push(reply));

        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0], Reply::Ok("playing".to_string()));
        assert!(matches!(&replies[1], Reply::Err(msg) if msg.contains("nope")));
        assert!(!engine.is_playing());
        assert!(!engine.teardown_pending());
        assert!(!engine.transport().is_running());
    }

    #[test]
    fn test_run_ends_when_senders_drop() {
        let (tx, rx) = unbounded();
        let runner = EngineRunner::new(config(), RecordingBackend::new(), rx).unwrap();
        tx.send(Command::Start).unwrap();
        drop(tx);

        let engine = runner.run(|_| {});
        assert!(!engine.is_playing());
        assert!(!engine.teardown_pending());
        assert!(!engine.transport().is_running());
    }
}
