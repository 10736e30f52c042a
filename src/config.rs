//! Configuration shared by the signal chain, the scenes and the front-end.
//!
//! Every sub-config has a `Default` matching the values the calibration
//! sessions were run with, derives serde with `#[serde(default)]` so a config
//! file only needs the keys it changes, and is checked once by
//! [`AppConfig::validate`] before anything starts.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ─────────────────────────────────────────────────────────────────────────────
// Mode
// ─────────────────────────────────────────────────────────────────────────────

/// Which scene the session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Live EMG readout against the fixed threshold.
    #[default]
    Setup,
    /// Timed prepare/act/relax instructions without feedback.
    Instructions,
    /// Threshold-gated runner game.
    Game,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Setup => "setup",
            Mode::Instructions => "instructions",
            Mode::Game => "game",
        }
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "setup" => Ok(Mode::Setup),
            "instructions" => Ok(Mode::Instructions),
            "game" => Ok(Mode::Game),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Signal conditioning
// ─────────────────────────────────────────────────────────────────────────────

/// Bandpass, smoothing and baseline parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Sampling frequency of the EMG stream in Hz.
    pub sampling_frequency: f64,
    /// Low cut of the bandpass in Hz.
    pub bandpass_low: f64,
    /// High cut of the bandpass in Hz. Clamped to `fs/2 - 1` for slow sources.
    pub bandpass_high: f64,
    /// Butterworth prototype order (the bandpass has twice as many poles).
    pub bandpass_order: usize,
    /// Moving-average length in samples. `None` means a third of a second.
    pub mean_kernel_size: Option<usize>,
    /// Length of the rest segment used for the baseline statistics.
    pub baseline_span_secs: f64,
    /// Most recent part of a rest segment that is left out of the baseline.
    pub baseline_exclude_secs: f64,
    /// How much history is kept for export and review.
    pub history_retention_secs: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            sampling_frequency: 4000.0,
            bandpass_low: 20.0,
            bandpass_high: 200.0,
            bandpass_order: 4,
            mean_kernel_size: None,
            baseline_span_secs: 3.0,
            baseline_exclude_secs: 0.5,
            history_retention_secs: 120.0,
        }
    }
}

impl FilterConfig {
    /// High cut actually used: never closer than 1 Hz to Nyquist.
    pub fn effective_high(&self) -> f64 {
        self.bandpass_high.min(self.sampling_frequency / 2.0 - 1.0)
    }

    /// Moving-average length in samples.
    pub fn kernel_size(&self) -> usize {
        self.mean_kernel_size
            .unwrap_or((self.sampling_frequency / 3.0) as usize)
            .max(1)
    }

    /// Convert a duration to a whole number of samples at the configured rate.
    pub fn samples_for(&self, secs: f64) -> usize {
        (secs * self.sampling_frequency).round().max(0.0) as usize
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fs = self.sampling_frequency;
        if !(fs.is_finite() && fs > 0.0) {
            return Err(ConfigError::SamplingFrequency(fs));
        }
        let (low, high) = (self.bandpass_low, self.effective_high());
        if !(low > 0.0 && low < high && high < fs / 2.0) {
            return Err(ConfigError::Bandpass { low, high, fs });
        }
        if self.bandpass_order == 0 {
            return Err(ConfigError::ZeroOrder);
        }
        if self.mean_kernel_size == Some(0) {
            return Err(ConfigError::ZeroKernel);
        }
        for (name, secs) in [
            ("baseline_span_secs", self.baseline_span_secs),
            ("baseline_exclude_secs", self.baseline_exclude_secs),
            ("history_retention_secs", self.history_retention_secs),
        ] {
            if !(secs.is_finite() && secs >= 0.0) {
                return Err(ConfigError::BaselineWindow { name, secs });
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Phases
// ─────────────────────────────────────────────────────────────────────────────

/// Timing of the repeating prepare/act/relax attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseConfig {
    pub attempts: u32,
    pub prepare_secs: f64,
    pub act_secs: f64,
    pub relax_secs: f64,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            attempts: 5,
            prepare_secs: 2.0,
            act_secs: 5.0,
            relax_secs: 5.0,
        }
    }
}

impl PhaseConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        for (name, secs) in [
            ("prepare_secs", self.prepare_secs),
            ("act_secs", self.act_secs),
            ("relax_secs", self.relax_secs),
        ] {
            if !(secs.is_finite() && secs > 0.0) {
                return Err(ConfigError::PhaseDuration { name, secs });
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Level layout
// ─────────────────────────────────────────────────────────────────────────────

/// Obstacle layout and tile geometry of the game level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub obstacle_count: usize,
    /// Spacing between obstacle slots, in tiles.
    pub tiles_per_obstacle: usize,
    /// First tile an obstacle may occupy.
    pub start_tile: usize,
    /// Tiles before each obstacle that count as restricted.
    pub restricted_window_tiles: usize,
    pub tile_width: f64,
    pub tile_height: f64,
    pub obstacle_height: f64,
    /// Seed for the obstacle layout; `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            obstacle_count: 10,
            tiles_per_obstacle: 5,
            start_tile: 20,
            restricted_window_tiles: 2,
            tile_width: 70.0,
            tile_height: 70.0,
            obstacle_height: 70.0,
            seed: None,
        }
    }
}

impl LevelConfig {
    /// Level length in tiles: the obstacle slots plus four spare slots of run-out.
    pub fn level_width_tiles(&self) -> usize {
        self.start_tile + self.tiles_per_obstacle * (self.obstacle_count + 4)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.obstacle_count == 0 {
            return Err(ConfigError::NoObstacles);
        }
        if self.tiles_per_obstacle == 0 {
            return Err(ConfigError::Level("tiles_per_obstacle must be at least 1".into()));
        }
        if self.restricted_window_tiles >= self.tiles_per_obstacle {
            return Err(ConfigError::Level(format!(
                "restricted window of {} tiles leaves no free tile between obstacles {} tiles apart",
                self.restricted_window_tiles, self.tiles_per_obstacle
            )));
        }
        for (name, v) in [
            ("tile_width", self.tile_width),
            ("tile_height", self.tile_height),
            ("obstacle_height", self.obstacle_height),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(ConfigError::Level(format!("{name} must be positive, got {v}")));
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Physics and jump gating
// ─────────────────────────────────────────────────────────────────────────────

/// Conditions one jump path checks before it lets the player jump.
///
/// The standalone default is the manual gate. Inside a [`JumpPolicy`] a
/// missing key takes the default of the path it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpGate {
    /// Reject the jump while the player stands on a restricted tile.
    pub respect_restricted_tiles: bool,
    /// Extra wait after the hit penalty before this path may jump again.
    pub grace_secs: f64,
}

impl JumpGate {
    pub const MANUAL: Self = Self {
        respect_restricted_tiles: true,
        grace_secs: 0.0,
    };

    pub const AUTOMATIC: Self = Self {
        respect_restricted_tiles: false,
        grace_secs: 1.0,
    };
}

impl Default for JumpGate {
    fn default() -> Self {
        Self::MANUAL
    }
}

/// Gate keys as written in a config file; absent keys stay `None`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
struct JumpGateKeys {
    respect_restricted_tiles: Option<bool>,
    grace_secs: Option<f64>,
}

impl JumpGateKeys {
    fn or(self, fallback: JumpGate) -> JumpGate {
        JumpGate {
            respect_restricted_tiles: self
                .respect_restricted_tiles
                .unwrap_or(fallback.respect_restricted_tiles),
            grace_secs: self.grace_secs.unwrap_or(fallback.grace_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct JumpPolicyKeys {
    #[serde(default)]
    manual: JumpGateKeys,
    #[serde(default)]
    automatic: JumpGateKeys,
}

impl From<JumpPolicyKeys> for JumpPolicy {
    fn from(keys: JumpPolicyKeys) -> Self {
        Self {
            manual: keys.manual.or(JumpGate::MANUAL),
            automatic: keys.automatic.or(JumpGate::AUTOMATIC),
        }
    }
}

/// The manual and the automatic jump paths are gated independently.
///
/// By default manual jumps obey the restricted tiles and may resume as soon as
/// the hit penalty is over, while threshold-triggered jumps ignore tiles and
/// wait an extra second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "JumpPolicyKeys")]
pub struct JumpPolicy {
    pub manual: JumpGate,
    pub automatic: JumpGate,
}

impl Default for JumpPolicy {
    fn default() -> Self {
        Self {
            manual: JumpGate::MANUAL,
            automatic: JumpGate::AUTOMATIC,
        }
    }
}

/// Per-tick physics, sprite geometry and hit timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// World scroll per tick in pixels.
    pub speed: f64,
    /// Scroll multiplier while the player is in the air.
    pub airborne_speed_factor: f64,
    pub gravity: f64,
    /// Vertical velocity set by a jump (negative is up).
    pub jump_impulse: f64,
    pub player_width: f64,
    pub player_height: f64,
    /// Shrinks player and obstacle boxes before the overlap test.
    pub collision_padding: f64,
    /// Movement stops for this long after a hit.
    pub hit_penalty_secs: f64,
    /// A new hit is only counted once penalty plus amnesty have passed.
    pub hit_amnesty_secs: f64,
    /// Time between the two walk frames.
    pub walk_frame_secs: f64,
    pub jump: JumpPolicy,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            speed: 4.0,
            airborne_speed_factor: 1.2,
            gravity: 0.4,
            jump_impulse: -20.0,
            player_width: 128.0,
            player_height: 256.0,
            collision_padding: 10.0,
            hit_penalty_secs: 3.0,
            hit_amnesty_secs: 2.0,
            walk_frame_secs: 0.2,
            jump: JumpPolicy::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Threshold
// ─────────────────────────────────────────────────────────────────────────────

/// Where the activation threshold of the game comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdSource {
    /// Calibrated from rest segments (`mean + 3·std`).
    #[default]
    Adaptive,
    /// Always the fixed fallback value.
    Fixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub source: ThresholdSource,
    /// Fallback threshold, used by the setup scene and by `source: fixed`.
    pub fixed: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            source: ThresholdSource::Adaptive,
            fixed: 8.0,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Acquisition
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Seeded noise with periodic activation bursts.
    #[default]
    Synthetic,
    /// Recorded text file, one sample per tick.
    Playback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub source: SourceKind,
    pub playback_path: PathBuf,
    /// Recorded values are multiplied by this on load.
    pub playback_scale: f64,
    /// Channels per frame delivered by the source.
    pub channel_count: usize,
    /// Channel carrying the EMG signal.
    pub emg_channel: usize,
    pub seed: Option<u64>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Synthetic,
            playback_path: PathBuf::from("emg-example.txt"),
            playback_scale: 100.0,
            channel_count: 1,
            emg_channel: 0,
            seed: None,
        }
    }
}

impl AcquisitionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.emg_channel >= self.channel_count {
            return Err(ConfigError::Channel {
                channel: self.emg_channel,
                available: self.channel_count,
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Window
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: f64,
    pub height: f64,
    pub fullscreen: bool,
    /// Target tick rate of the loop.
    pub tick_hz: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "BCI calibration".to_string(),
            width: 800.0,
            height: 600.0,
            fullscreen: false,
            tick_hz: 60.0,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AppConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level configuration.
///
/// | Field         | Purpose |
/// |---------------|---------|
/// | `mode`        | Scene to run |
/// | `filter`      | Bandpass, smoothing, baseline windows |
/// | `phases`      | Prepare/act/relax timing |
/// | `level`       | Obstacle layout |
/// | `physics`     | Player physics, hit timing, jump gating |
/// | `threshold`   | Adaptive or fixed activation threshold |
/// | `acquisition` | Data source |
/// | `window`      | Native window and tick rate |
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub mode: Mode,
    pub filter: FilterConfig,
    pub phases: PhaseConfig,
    pub level: LevelConfig,
    pub physics: PhysicsConfig,
    pub threshold: ThresholdConfig,
    pub acquisition: AcquisitionConfig,
    pub window: WindowConfig,
    /// Directory for recorded traces and event logs.
    pub log_dir: PathBuf,
}

impl AppConfig {
    /// Load a YAML (`.yaml`/`.yml`) or JSON file; missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Ok(serde_json::from_str(&text)?)
        } else {
            Ok(serde_yaml::from_str(&text)?)
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.filter.validate()?;
        self.phases.validate()?;
        self.level.validate()?;
        self.acquisition.validate()?;
        Ok(())
    }

    /// Directory for logs, falling back to `logs` when unset.
    pub fn log_dir(&self) -> PathBuf {
        if self.log_dir.as_os_str().is_empty() {
            PathBuf::from("logs")
        } else {
            self.log_dir.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn kernel_defaults_to_a_third_of_a_second() {
        let cfg = FilterConfig::default();
        assert_eq!(cfg.kernel_size(), 1333);
        let cfg = FilterConfig {
            mean_kernel_size: Some(10),
            ..FilterConfig::default()
        };
        assert_eq!(cfg.kernel_size(), 10);
    }

    #[test]
    fn high_cut_is_clamped_below_nyquist() {
        let cfg = FilterConfig {
            sampling_frequency: 250.0,
            ..FilterConfig::default()
        };
        assert_eq!(cfg.effective_high(), 124.0);
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_bad_phase_durations() {
        let cfg = PhaseConfig {
            act_secs: 0.0,
            ..PhaseConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::PhaseDuration { name: "act_secs", .. })
        ));
        let cfg = PhaseConfig {
            attempts: 0,
            ..PhaseConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroAttempts)));
    }

    #[test]
    fn rejects_unknown_mode_and_channel() {
        assert!(matches!(
            "race".parse::<Mode>(),
            Err(ConfigError::UnknownMode(m)) if m == "race"
        ));
        assert_eq!("Game".parse::<Mode>().unwrap(), Mode::Game);

        let acq = AcquisitionConfig {
            channel_count: 2,
            emg_channel: 2,
            ..AcquisitionConfig::default()
        };
        assert!(matches!(
            acq.validate(),
            Err(ConfigError::Channel { channel: 2, available: 2 })
        ));
    }

    #[test]
    fn level_width_follows_obstacle_slots() {
        let level = LevelConfig::default();
        assert_eq!(level.level_width_tiles(), 20 + 5 * 14);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = "mode: game\nfilter:\n  sampling_frequency: 1000\nphases:\n  attempts: 3\n";
        let cfg: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.mode, Mode::Game);
        assert_eq!(cfg.filter.sampling_frequency, 1000.0);
        assert_eq!(cfg.filter.bandpass_low, 20.0);
        assert_eq!(cfg.phases.attempts, 3);
        assert_eq!(cfg.phases.relax_secs, 5.0);
        assert!(cfg.physics.jump.manual.respect_restricted_tiles);
    }

    #[test]
    fn partial_jump_gate_keeps_path_defaults() {
        let yaml = "physics:\n  gravity: 0.5\n  jump:\n    manual:\n      grace_secs: 0.5\n    automatic:\n      respect_restricted_tiles: true\n";
        let cfg: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.physics.gravity, 0.5);
        assert_eq!(cfg.physics.speed, 4.0);
        let jump = cfg.physics.jump;
        assert_eq!(jump.manual.grace_secs, 0.5);
        assert!(jump.manual.respect_restricted_tiles);
        assert!(jump.automatic.respect_restricted_tiles);
        assert_eq!(jump.automatic.grace_secs, 1.0);

        let cfg: AppConfig = serde_yaml::from_str("physics:\n  jump: {}\n").unwrap();
        assert_eq!(cfg.physics.jump, JumpPolicy::default());
        let gate: JumpGate = serde_json::from_str("{\"grace_secs\": 2.0}").unwrap();
        assert_eq!(gate, JumpGate { grace_secs: 2.0, ..JumpGate::MANUAL });
    }
}
