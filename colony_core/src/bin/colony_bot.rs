use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use colony_core::{load_engine_config, load_engine_config_from_env, BotSession, DeciderKind};

#[derive(Parser, Debug)]
#[command(author, version, about = "Colony bot speaking the line protocol on stdio", long_about = None)]
struct Args {
    /// Move source: `hedge` (learning ensemble), `brownian` or `navigator` (one goal per ant)
    #[arg(long, default_value = "hedge")]
    decider: DeciderKind,

    /// Engine config JSON (defaults to $COLONY_ENGINE_CONFIG_PATH, then the builtin)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_ref())?;

    let (config, metadata) = match &args.config {
        Some(path) => load_engine_config(Some(path.as_path())),
        None => load_engine_config_from_env(),
    };
    info!(
        target: "colony::session",
        decider = %args.decider,
        config = ?metadata.path(),
        "colony_bot starting"
    );

    let mut session = BotSession::new(args.decider, config);
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        let line = line.context("failed to read from stdin")?;
        let replies = match session.handle_line(&line) {
            Ok(replies) => replies,
            Err(err) => {
                warn!(target: "colony::session", error = %err, "message rejected");
                continue;
            }
        };
        if replies.is_empty() {
            if session.is_finished() {
                break;
            }
            continue;
        }
        for reply in replies {
            writeln!(out, "{reply}").context("failed to write to stdout")?;
        }
        out.flush().context("failed to flush stdout")?;
    }

    info!(target: "colony::session", turn = session.turn(), "colony_bot exiting");
    Ok(())
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
        }
    }
    Ok(())
}
