use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use tracing::warn;
use vibe_core::EngineConfig;

pub(crate) const USAGE: &str = "\
usage: vibe [--config=PATH] [--seed=N] [--render=SECONDS] [--output=PATH]

Without --render, reads commands from stdin and plays in real time.";

#[derive(Debug, Default, PartialEq)]
pub(crate) struct CliArgs {
    pub config: Option<PathBuf>,
    pub seed: Option<u64>,
    pub render: Option<f64>,
    pub output: Option<PathBuf>,
    pub help: bool,
}

pub(crate) fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<CliArgs> {
    let mut parsed = CliArgs::default();
    for arg in args {
        if arg == "-h" || arg == "--help" {
            parsed.help = true;
            continue;
        }
        let Some((key, value)) = arg.split_once('=') else {
            bail!("unexpected argument: {}\n{}", arg, USAGE);
        };
        match key {
            "--config" => parsed.config = Some(PathBuf::from(value)),
            "--seed" => parsed.seed = Some(value.parse().context("--seed expects an integer")?),
            "--render" => parsed.render = Some(value.parse().context("--render expects seconds")?),
            "--output" => parsed.output = Some(PathBuf::from(value)),
            _ => bail!("unknown option: {}\n{}", key, USAGE),
        }
    }
    Ok(parsed)
}

pub(crate) fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vibe")
        .join("config.toml")
}

/// Missing file means defaults; a file that does not parse is reported and
/// ignored
pub(crate) fn load_config(path: &Path) -> EngineConfig {
    let Ok(text) = std::fs::read_to_string(path) else {
        return EngineConfig::default();
    };
    toml::from_str(&text)
        .inspect_err(|e| warn!(path = %path.display(), "Ignoring invalid config: {}", e))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        let parsed = parse_args(args(&["--seed=9", "--render=12.5", "--output=out.json"])).unwrap();
        assert_eq!(parsed.seed, Some(9));
        assert_eq!(parsed.render, Some(12.5));
        assert_eq!(parsed.output, Some(PathBuf::from("out.json")));
        assert_eq!(parsed.config, None);
        assert!(!parsed.help);

        assert!(parse_args(args(&["--help"])).unwrap().help);
        assert_eq!(parse_args(Vec::new()).unwrap(), CliArgs::default());
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(parse_args(args(&["--seed=abc"])).is_err());
        assert!(parse_args(args(&["--volume=3"])).is_err());
        assert!(parse_args(args(&["render"])).is_err());
    }

    #[test]
    fn test_load_config() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("vibe-config-{}.toml", std::process::id()));

        assert_eq!(load_config(&path), EngineConfig::default());

        std::fs::write(&path, "initial_style = \"techno\"\nfade_time = 1.5\nseed = 4\n").unwrap();
        let config = load_config(&path);
        assert_eq!(config.initial_style, "techno");
        assert_eq!(config.fade_time, 1.5);
        assert_eq!(config.seed, Some(4));
        assert_eq!(config.initial_scale, "C major");

        std::fs::write(&path, "fade_time = \"slow\"").unwrap();
        assert_eq!(load_config(&path), EngineConfig::default());

        std::fs::remove_file(&path).unwrap();
    }
}
