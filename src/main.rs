//! Stackway - A stacking window manager policy engine
//!
//! Drives the stacking policy core from a headless host: client windows,
//! outputs and input arrive as scripted host events, one per line.
//!
//! # Features
//! - Stacking window management with server-side decorations
//! - XWayland view adapter with pending move/resize reconciliation
//! - Action engine for key bindings, mouse bindings and menus
//! - Named workspaces with optional wrap-around
//! - Window cycling with an on-screen switcher model
//! - TOML configuration with runtime reload

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use stackway_backend_headless::{parse_host_event, HeadlessBackend};
use stackway_core::config::Config;

/// Stackway - A stacking window manager
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Run in debug mode with verbose logging
    #[arg(short, long)]
    debug: bool,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,

    /// Print default configuration to stdout
    #[arg(long)]
    print_default_config: bool,

    /// Host event script to replay; reads stdin when omitted
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Do not commit configured sizes on behalf of clients
    #[arg(long)]
    no_auto_ack: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Stackway v{} starting...", env!("CARGO_PKG_VERSION"));

    // Handle special commands
    if args.print_default_config {
        println!("{}", Config::default_config_string());
        return Ok(());
    }

    if args.validate {
        Config::load(args.config.as_deref())?;
        info!("Configuration is valid");
        return Ok(());
    }

    // Load configuration
    let config = match Config::load(args.config.as_deref()) {
        Ok(cfg) => {
            info!("Configuration loaded successfully");
            cfg
        }
        Err(e) => {
            warn!("Failed to load config: {:#}, using defaults", e);
            Config::default()
        }
    };

    let input: Box<dyn BufRead + Send> = match &args.script {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open script: {path:?}"))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let (sender, events) = calloop::channel::channel();
    std::thread::spawn(move || {
        for (number, line) in input.lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    error!("Failed to read host events: {}", e);
                    break;
                }
            };
            match parse_host_event(&line) {
                Ok(Some(event)) => {
                    if sender.send(event).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => error!("Line {}: {}", number + 1, e),
            }
        }
    });

    let mut backend = HeadlessBackend::new(config, args.config);
    backend.set_auto_ack(!args.no_auto_ack);
    backend.run(events)
}
