//! vibe: generative music engine driven from the terminal

mod config;

use std::io::BufRead;
use std::path::PathBuf;
use std::thread;

use crossbeam_channel::{unbounded, Sender};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vibe_core::EngineConfig;
use vibe_services::{render_to_file, Command, EngineRunner, Reply, TracingBackend};

use config::{config_path, load_config, parse_args, USAGE};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("vibe=debug".parse()?))
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    if args.help {
        println!("{}", USAGE);
        return Ok(());
    }

    let path = args.config.unwrap_or_else(config_path);
    let mut config = load_config(&path);
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    if let Some(seconds) = args.render {
        let output = args.output.unwrap_or_else(|| PathBuf::from("vibe-render.json"));
        let log = render_to_file(config, seconds, &output)?;
        println!("{} events written to {}", log.triggers.len(), output.display());
        return Ok(());
    }

    play(config)
}

fn play(config: EngineConfig) -> anyhow::Result<()> {
    tracing::info!(style = %config.initial_style, scale = %config.initial_scale, "Starting vibe");

    let (tx, rx) = unbounded();
    let runner = EngineRunner::new(config, TracingBackend, rx)?;
    thread::spawn(move || read_commands(tx));

    println!("{}", Command::HELP);
    runner.run(|reply| match reply {
        Reply::Ok(message) => println!("{}", message),
        Reply::Err(message) => eprintln!("error: {}", message),
    });
    Ok(())
}

/// Forward stdin lines as commands until `quit` or end of input
fn read_commands(tx: Sender<Command>) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "help" {
            println!("{}", Command::HELP);
            continue;
        }
        match line.parse::<Command>() {
            Ok(command) => {
                let quit = command == Command::Quit;
                if tx.send(command).is_err() || quit {
                    break;
                }
            }
            Err(e) => eprintln!("error: {}", e),
        }
    }
}
