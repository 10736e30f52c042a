//! Acquisition sources polled once per tick.
//!
//! A source yields zero or more frames per poll; an empty poll is normal.
//! Frames are returned in acquisition order and the session pushes them
//! through the conditioner in that order.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::config::{AcquisitionConfig, SourceKind};
use crate::error::SourceError;
use crate::sink::{Frame, SampleCommand};

pub trait DataSource {
    /// Begin acquiring; frames before `now` are never produced.
    fn start(&mut self, _now: Duration) {}

    fn stop(&mut self) {}

    /// Frames acquired since the previous poll.
    fn poll(&mut self, now: Duration) -> Vec<Frame>;

    /// Nominal acquisition rate in Hz.
    fn sample_rate(&self) -> f64;

    fn channel_count(&self) -> usize;
}

/// Values of `channel` from each frame, in order. Frames too short to carry
/// the channel are skipped.
pub fn select_channel(frames: &[Frame], channel: usize) -> Vec<f64> {
    frames.iter().filter_map(|f| f.get(channel).copied()).collect()
}

/// Build the source named by the acquisition config.
pub fn open_source(cfg: &AcquisitionConfig, sample_rate: f64) -> Result<Box<dyn DataSource>, SourceError> {
    match cfg.source {
        SourceKind::Playback => Ok(Box::new(PlaybackSource::open(
            &cfg.playback_path,
            cfg.playback_scale,
            sample_rate,
        )?)),
        SourceKind::Synthetic => Ok(Box::new(SyntheticSource::new(
            sample_rate,
            cfg.channel_count,
            cfg.emg_channel,
            cfg.seed,
        ))),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Playback
// ─────────────────────────────────────────────────────────────────────────────

/// Replays a recorded text file of `<index> <value>` lines, one sample per poll.
#[derive(Debug, Clone)]
pub struct PlaybackSource {
    values: Vec<f64>,
    cursor: usize,
    sample_rate: f64,
}

impl PlaybackSource {
    pub fn open(path: &Path, scale: f64, sample_rate: f64) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let source = Self::from_reader(BufReader::new(file), scale, sample_rate).map_err(|e| match e {
            SourceError::Io { source, .. } => SourceError::Io {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        info!(path = %path.display(), samples = source.len(), "playback loaded");
        Ok(source)
    }

    /// Parse lines of whitespace-separated `<index> <value>`; a line with a
    /// single column is taken as the value. Blank lines are skipped.
    pub fn from_reader<R: BufRead>(reader: R, scale: f64, sample_rate: f64) -> Result<Self, SourceError> {
        let mut values = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| SourceError::Io {
                path: Default::default(),
                source,
            })?;
            let mut cols = line.split_whitespace();
            let (Some(first), second) = (cols.next(), cols.next()) else {
                continue;
            };
            let raw = second.unwrap_or(first);
            let value: f64 = raw.parse().map_err(|e| SourceError::Parse {
                line: i + 1,
                reason: format!("`{raw}`: {e}"),
            })?;
            values.push(value * scale);
        }
        Ok(Self {
            values,
            cursor: 0,
            sample_rate,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.values.len() - self.cursor
    }
}

impl DataSource for PlaybackSource {
    fn poll(&mut self, _now: Duration) -> Vec<Frame> {
        match self.values.get(self.cursor) {
            Some(&v) => {
                self.cursor += 1;
                vec![vec![v]]
            }
            None => Vec::new(),
        }
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn channel_count(&self) -> usize {
        1
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Synthetic
// ─────────────────────────────────────────────────────────────────────────────

/// Shape of the generated signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticProfile {
    /// Peak of the uniform background noise.
    pub noise_amplitude: f64,
    /// Amplitude of the activation tone.
    pub burst_amplitude: f64,
    pub burst_hz: f64,
    /// Bursts repeat with this period.
    pub period_secs: f64,
    /// Offset of each burst within the period.
    pub burst_offset_secs: f64,
    pub burst_secs: f64,
}

impl Default for SyntheticProfile {
    /// Bursts line up with the act phase of the default 2/5/5 s attempt.
    fn default() -> Self {
        Self {
            noise_amplitude: 5.0,
            burst_amplitude: 60.0,
            burst_hz: 80.0,
            period_secs: 12.0,
            burst_offset_secs: 2.0,
            burst_secs: 5.0,
        }
    }
}

/// Seeded noise with periodic band-limited bursts on the EMG channel, produced
/// at the nominal rate against the session clock.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    rng: StdRng,
    sample_rate: f64,
    channel_count: usize,
    emg_channel: usize,
    profile: SyntheticProfile,
    started_at: Option<Duration>,
    produced: u64,
}

impl SyntheticSource {
    pub fn new(sample_rate: f64, channel_count: usize, emg_channel: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng,
            sample_rate,
            channel_count: channel_count.max(1),
            emg_channel,
            profile: SyntheticProfile::default(),
            started_at: None,
            produced: 0,
        }
    }

    pub fn with_profile(mut self, profile: SyntheticProfile) -> Self {
        self.profile = profile;
        self
    }

    fn emg_value(&mut self, t: f64) -> f64 {
        let p = self.profile;
        let noise = self.rng.random_range(-1.0..=1.0) * p.noise_amplitude;
        let phase = t % p.period_secs;
        let active = phase >= p.burst_offset_secs && phase < p.burst_offset_secs + p.burst_secs;
        if active {
            let tone = (2.0 * std::f64::consts::PI * p.burst_hz * t).sin();
            let jitter = self.rng.random_range(0.5..=1.0);
            noise + tone * p.burst_amplitude * jitter
        } else {
            noise
        }
    }
}

impl DataSource for SyntheticSource {
    fn start(&mut self, now: Duration) {
        if self.started_at.is_none() {
            debug!(fs = self.sample_rate, channels = self.channel_count, "synthetic source started");
            self.started_at = Some(now);
            self.produced = 0;
        }
    }

    fn stop(&mut self) {
        self.started_at = None;
    }

    fn poll(&mut self, now: Duration) -> Vec<Frame> {
        let Some(start) = self.started_at else {
            return Vec::new();
        };
        let due = (now.saturating_sub(start).as_secs_f64() * self.sample_rate).floor() as u64;
        let mut frames = Vec::with_capacity(due.saturating_sub(self.produced) as usize);
        while self.produced < due {
            let t = self.produced as f64 / self.sample_rate;
            let mut frame = Vec::with_capacity(self.channel_count);
            for ch in 0..self.channel_count {
                let v = if ch == self.emg_channel {
                    self.emg_value(t)
                } else {
                    self.rng.random_range(-1.0..=1.0) * self.profile.noise_amplitude
                };
                frame.push(v);
            }
            frames.push(frame);
            self.produced += 1;
        }
        frames
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn channel_count(&self) -> usize {
        self.channel_count
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Channel
// ─────────────────────────────────────────────────────────────────────────────

/// Drains frames sent through a [`SampleSink`](crate::sink::SampleSink).
pub struct ChannelSource {
    rx: Receiver<SampleCommand>,
    sample_rate: f64,
    channel_count: usize,
    disconnected: bool,
}

impl ChannelSource {
    pub fn new(rx: Receiver<SampleCommand>, sample_rate: f64, channel_count: usize) -> Self {
        Self {
            rx,
            sample_rate,
            channel_count,
            disconnected: false,
        }
    }

    /// Whether every sender has been dropped and the queue drained.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }
}

impl DataSource for ChannelSource {
    fn poll(&mut self, _now: Duration) -> Vec<Frame> {
        let mut frames = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(SampleCommand::Frame(f)) => frames.push(f),
                Ok(SampleCommand::Frames(fs)) => frames.extend(fs),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.disconnected {
                        debug!("sample channel disconnected");
                    }
                    self.disconnected = true;
                    break;
                }
            }
        }
        frames
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn channel_count(&self) -> usize {
        self.channel_count
    }
}
