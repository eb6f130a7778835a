//! Textual commands accepted by the runner

use std::str::FromStr;

use thiserror::Error;
use vibe_core::Voice;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandParseError {
    #[error("Empty command")]
    Empty,
    #[error("Unknown command: {0}")]
    Unknown(String),
    #[error("{command}: missing {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error("{command}: not a number: {value}")]
    InvalidNumber { command: &'static str, value: String },
    #[error("{command}: expected on or off, got {value}")]
    InvalidSwitch { command: &'static str, value: String },
    #[error("Unknown voice: {0}")]
    UnknownVoice(String),
}

/// One engine operation, parsed from a line of input
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Stop,
    Regenerate,
    Scale(String),
    Style(String),
    Tempo(f64),
    Enable(Voice),
    Disable(Voice),
    Volume(Voice, f32),
    Master(f32),
    BassRhythm(String),
    DrumOffset(i32),
    NextDrums,
    Euclid { pulses: u32, steps: u32 },
    Markov(bool),
    EuclidMode(bool),
    Status,
    Quit,
}

impl Command {
    /// Usage text for interactive front ends
    pub const HELP: &'static str = "\
start | stop | regen | status | quit
scale <tonic> [mode]     style <name>        tempo <bpm>
on <voice> | off <voice> volume <voice> <0..1>  master <0..1>
bass <template|auto>     drum-offset <semitones>  next-drums
euclid <pulses> <steps>  markov on|off       euclid-mode on|off";
}

fn arg<'a>(
    args: &mut impl Iterator<Item = &'a str>,
    command: &'static str,
    argument: &'static str,
) -> Result<&'a str, CommandParseError> {
    args.next()
        .ok_or(CommandParseError::MissingArgument { command, argument })
}

fn number<T: FromStr>(value: &str, command: &'static str) -> Result<T, CommandParseError> {
    value.parse().map_err(|_| CommandParseError::InvalidNumber {
        command,
        value: value.to_string(),
    })
}

/// Levels must be finite; NaN and infinities never reach the engine
fn level(value: &str, command: &'static str) -> Result<f32, CommandParseError> {
    let level: f32 = number(value, command)?;
    if level.is_finite() {
        Ok(level)
    } else {
        Err(CommandParseError::InvalidNumber {
            command,
            value: value.to_string(),
        })
    }
}

fn voice(value: &str) -> Result<Voice, CommandParseError> {
    value
        .parse()
        .map_err(|_| CommandParseError::UnknownVoice(value.to_string()))
}

fn switch(value: &str, command: &'static str) -> Result<bool, CommandParseError> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(CommandParseError::InvalidSwitch {
            command,
            value: value.to_string(),
        }),
    }
}

impl FromStr for Command {
    type Err = CommandParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(CommandParseError::Empty);
        };

        let command = match head.to_ascii_lowercase().as_str() {
            "start" | "play" => Command::Start,
            "stop" => Command::Stop,
            "regen" | "regenerate" => Command::Regenerate,
            "status" => Command::Status,
            "quit" | "exit" => Command::Quit,
            "next-drums" => Command::NextDrums,
            "scale" => {
                let rest: Vec<&str> = words.by_ref().collect();
                if rest.is_empty() {
                    return Err(CommandParseError::MissingArgument {
                        command: "scale",
                        argument: "name",
                    });
                }
                Command::Scale(rest.join(" "))
            }
            "style" => Command::Style(arg(&mut words, "style", "name")?.to_string()),
            "tempo" | "bpm" => Command::Tempo(number(arg(&mut words, "tempo", "bpm")?, "tempo")?),
            "on" => Command::Enable(voice(arg(&mut words, "on", "voice")?)?),
            "off" => Command::Disable(voice(arg(&mut words, "off", "voice")?)?),
            "volume" => {
                let v = voice(arg(&mut words, "volume", "voice")?)?;
                Command::Volume(v, level(arg(&mut words, "volume", "level")?, "volume")?)
            }
            "master" => Command::Master(level(arg(&mut words, "master", "level")?, "master")?),
            "bass" => Command::BassRhythm(arg(&mut words, "bass", "template")?.to_string()),
            "drum-offset" => Command::DrumOffset(number(
                arg(&mut words, "drum-offset", "semitones")?,
                "drum-offset",
            )?),
            "euclid" => {
                let pulses = number(arg(&mut words, "euclid", "pulses")?, "euclid")?;
                let steps = number(arg(&mut words, "euclid", "steps")?, "euclid")?;
                Command::Euclid { pulses, steps }
            }
            "markov" => Command::Markov(switch(arg(&mut words, "markov", "on|off")?, "markov")?),
            "euclid-mode" => Command::EuclidMode(switch(
                arg(&mut words, "euclid-mode", "on|off")?,
                "euclid-mode",
            )?),
            other => return Err(CommandParseError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!("start".parse::<Command>().unwrap(), Command::Start);
        assert_eq!("  STOP ".parse::<Command>().unwrap(), Command::Stop);
        assert_eq!("regen".parse::<Command>().unwrap(), Command::Regenerate);
        assert_eq!("next-drums".parse::<Command>().unwrap(), Command::NextDrums);
        assert_eq!("quit".parse::<Command>().unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_arguments() {
        assert_eq!(
            "scale f# harmonic minor".parse::<Command>().unwrap(),
            Command::Scale("f# harmonic minor".to_string())
        );
        assert_eq!("tempo 128.5".parse::<Command>().unwrap(), Command::Tempo(128.5));
        assert_eq!("off pad".parse::<Command>().unwrap(), Command::Disable(Voice::Pad));
        assert_eq!(
            "volume drums 0.3".parse::<Command>().unwrap(),
            Command::Volume(Voice::Drums, 0.3)
        );
        assert_eq!("drum-offset -7".parse::<Command>().unwrap(), Command::DrumOffset(-7));
        assert_eq!(
            "euclid 5 8".parse::<Command>().unwrap(),
            Command::Euclid { pulses: 5, steps: 8 }
        );
        assert_eq!("markov on".parse::<Command>().unwrap(), Command::Markov(true));
        assert_eq!("euclid-mode off".parse::<Command>().unwrap(), Command::EuclidMode(false));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Command>().unwrap_err(), CommandParseError::Empty);
        assert_eq!(
            "dance".parse::<Command>().unwrap_err(),
            CommandParseError::Unknown("dance".to_string())
        );
        assert_eq!(
            "tempo".parse::<Command>().unwrap_err(),
            CommandParseError::MissingArgument {
                command: "tempo",
                argument: "bpm"
            }
        );
        assert!(matches!(
            "tempo fast".parse::<Command>(),
            Err(CommandParseError::InvalidNumber { .. })
        ));
        assert_eq!(
            "on kazoo".parse::<Command>().unwrap_err(),
            CommandParseError::UnknownVoice("kazoo".to_string())
        );
        assert_eq!(
            "volume arp NaN".parse::<Command>().unwrap_err(),
            CommandParseError::InvalidNumber {
                command: "volume",
                value: "NaN".to_string()
            }
        );
        assert!(matches!(
            "master inf".parse::<Command>(),
            Err(CommandParseError::InvalidNumber { command: "master", .. })
        ));
        assert!(matches!(
            "markov maybe".parse::<Command>(),
            Err(CommandParseError::InvalidSwitch { .. })
        ));
    }
}
