//! Error types for configuration and data acquisition.
//!
//! The steady-state core (filtering, phase derivation, game stepping) never
//! fails; everything that can go wrong is caught at startup or when a data
//! source is opened.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal configuration problems, reported before the tick loop starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("sampling frequency must be positive, got {0} Hz")]
    SamplingFrequency(f64),

    #[error("invalid bandpass {low}..{high} Hz for sampling frequency {fs} Hz")]
    Bandpass { low: f64, high: f64, fs: f64 },

    #[error("bandpass order must be at least 1")]
    ZeroOrder,

    #[error("mean kernel size must be at least 1 sample")]
    ZeroKernel,

    #[error("baseline window `{name}` must be non-negative, got {secs} s")]
    BaselineWindow { name: &'static str, secs: f64 },

    #[error("attempt count must be at least 1")]
    ZeroAttempts,

    #[error("phase duration `{name}` must be positive, got {secs} s")]
    PhaseDuration { name: &'static str, secs: f64 },

    #[error("unknown mode `{0}` (expected 'setup', 'game' or 'instructions')")]
    UnknownMode(String),

    #[error("EMG channel {channel} out of range for a {available}-channel source")]
    Channel { channel: usize, available: usize },

    #[error("a level needs at least one obstacle")]
    NoObstacles,

    #[error("invalid level geometry: {0}")]
    Level(String),

    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Problems opening or decoding an acquisition source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read playback file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("playback line {line}: {reason}")]
    Parse { line: usize, reason: String },
}
