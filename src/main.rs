//! `myoloop` binary: runs one calibration or game session in a window.
//!
//! # Usage
//!
//! ```bash
//! myoloop --mode setup
//! myoloop --mode instructions --config session.yaml
//! myoloop --mode game --playback emg-example.txt --seed 7
//! ```

use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use tracing::{error, info, warn};

use myoloop::config::{SourceKind, ThresholdSource};
use myoloop::events::EventFilter;
use myoloop::export::session_path;
use myoloop::{
    run_session, source, AppConfig, CsvEventLog, EventController, Mode, Session, SystemClock,
    TracingEventSink,
};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "myoloop",
    version,
    about = "Closed-loop EMG biofeedback sessions",
    long_about = None
)]
struct Args {
    /// YAML or JSON configuration file. Defaults are used when omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Scene to run: setup, instructions or game.
    #[arg(long)]
    mode: Option<String>,

    /// Replay a recorded `<index> <value>` file instead of the synthetic source.
    #[arg(long, value_name = "FILE")]
    playback: Option<PathBuf>,

    /// Fixed threshold used by the setup scene and by `--fixed-threshold`.
    #[arg(long)]
    threshold: Option<f64>,

    /// Use the fixed threshold instead of calibrating from rest segments.
    #[arg(long, default_value_t = false)]
    fixed_threshold: bool,

    /// Open fullscreen.
    #[arg(long, default_value_t = false)]
    fullscreen: bool,

    /// Directory for recorded traces and event logs.
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Seed for the obstacle layout and the synthetic source.
    #[arg(long)]
    seed: Option<u64>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() {
    let args = Args::parse();

    let log_level_filter = args
        .log_level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .unwrap_or(tracing_subscriber::filter::LevelFilter::INFO);

    tracing_subscriber::fmt()
        .with_max_level(log_level_filter)
        .with_target(false)
        .init();

    let mut config = match args.config.as_deref() {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            match AppConfig::load(path) {
                Ok(cfg) => cfg,
                Err(e) => {
                    error!("Failed to load configuration: {e}");
                    std::process::exit(1);
                }
            }
        }
        None => AppConfig::default(),
    };

    // CLI overrides
    if let Some(mode) = args.mode.as_deref() {
        match Mode::from_str(mode) {
            Ok(m) => config.mode = m,
            Err(e) => {
                error!("{e}");
                std::process::exit(1);
            }
        }
    }
    if let Some(path) = args.playback {
        config.acquisition.source = SourceKind::Playback;
        config.acquisition.playback_path = path;
    }
    if let Some(t) = args.threshold {
        config.threshold.fixed = t;
    }
    if args.fixed_threshold {
        config.threshold.source = ThresholdSource::Fixed;
    }
    if args.fullscreen {
        config.window.fullscreen = true;
    }
    if let Some(dir) = args.log_dir {
        config.log_dir = dir;
    }
    if let Some(seed) = args.seed {
        config.level.seed = Some(seed);
        config.acquisition.seed = Some(seed);
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {e}");
        std::process::exit(1);
    }
    info!(
        mode = %config.mode,
        fs = config.filter.sampling_frequency,
        threshold = ?config.threshold.source,
        "configuration validated"
    );

    let source = match source::open_source(&config.acquisition, config.filter.sampling_frequency) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to open data source: {e}");
            std::process::exit(1);
        }
    };

    let events = EventController::new();
    events.attach(EventFilter::all(), Box::new(TracingEventSink));

    let session = match Session::new(&config, source, SystemClock::new(), events.clone()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to start session: {e}");
            std::process::exit(1);
        }
    };

    let log_path = session_path(&config.log_dir(), &session.stem(), "_events.csv");
    match CsvEventLog::create(&log_path) {
        Ok(log) => {
            info!("Logging events to {}", log_path.display());
            events.attach(EventFilter::all(), Box::new(log));
        }
        Err(e) => warn!("Event log disabled, cannot create {}: {e}", log_path.display()),
    }

    if let Err(e) = run_session(session, &config) {
        error!("Window error: {e}");
        std::process::exit(1);
    }
}
