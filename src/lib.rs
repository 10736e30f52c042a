//! myoloop crate root: re-exports and module wiring.
//!
//! A closed-loop EMG biofeedback session built on egui/eframe:
//! - `signal`: streaming bandpass, rectification, smoothing and rest baselines
//! - `phase`: prepare/act/relax scheduling as a pure function of time
//! - `threshold`: glue turning phase changes into baseline captures
//! - `game`: the runner whose jumps are gated by the live threshold
//! - `scene`: setup, instructions and game scenes behind one enum
//! - `session`: the per-tick loop tying acquisition to a scene
//! - `source`/`sink`: playback, synthetic and channel-fed acquisition
//! - `events`: the session event bus and its CSV/tracing sinks
//! - `app`: the native window

pub mod app;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod export;
pub mod game;
pub mod phase;
pub mod scene;
pub mod session;
pub mod signal;
pub mod sink;
pub mod source;
pub mod threshold;

// Public re-exports for a compact external API
pub use app::run_session;
pub use clock::{Clock, ManualClock, SystemClock, TickPacer};
pub use config::{AppConfig, Mode};
pub use error::{ConfigError, SourceError};
pub use events::{CsvEventLog, EventController, EventFilter, EventKind, EventSink, SessionEvent, TracingEventSink};
pub use game::{GameEngine, Level, Score};
pub use phase::{Phase, PhaseInfo, PhaseScheduler};
pub use scene::{Flow, Input, RenderState, Scene};
pub use session::Session;
pub use signal::SignalConditioner;
pub use sink::{channel_samples, SampleSink};
pub use source::{ChannelSource, DataSource, PlaybackSource, SyntheticSource};
pub use threshold::ThresholdController;
