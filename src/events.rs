//! Session event bus.
//!
//! Discrete transitions of a session (run start/stop, phase changes,
//! threshold changes, jumps, hits, goal, export) are published once through
//! [`EventController`]. Each event carries a set of [`EventKind`] flags
//! (bitflags-style) so that one occurrence can match several categories,
//! e.g. a performed automatic jump is `JUMP_ATTEMPTED | JUMP_PERFORMED | AUTOMATIC`.
//!
//! Consumers either [`subscribe`](EventController::subscribe) with an
//! [`EventFilter`] and receive events on an `mpsc` channel, or
//! [`attach`](EventController::attach) an [`EventSink`] that is called
//! synchronously (the CSV event log, the tracing logger).

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{info, warn};

use crate::config::Mode;
use crate::game::{JumpOrigin, JumpRejection, Score};
use crate::phase::Phase;

// ─────────────────────────────────────────────────────────────────────────────
// EventKind – bitflags
// ─────────────────────────────────────────────────────────────────────────────

/// Bitflags describing the *categories* an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventKind(pub u64);

impl EventKind {
    // ── Run lifecycle ───────────────────────────────────────────────────
    /// The scene was started (scheduler or game run).
    pub const RUN_STARTED: Self = Self(1 << 0);
    /// The scene was stopped, by the user or on quit.
    pub const RUN_STOPPED: Self = Self(1 << 1);

    // ── Calibration ─────────────────────────────────────────────────────
    /// The phase in force changed.
    pub const PHASE_CHANGED: Self = Self(1 << 2);
    /// A new threshold was published.
    pub const THRESHOLD_CHANGED: Self = Self(1 << 3);

    // ── Game ────────────────────────────────────────────────────────────
    /// A jump was asked for, manually or by the signal.
    pub const JUMP_ATTEMPTED: Self = Self(1 << 4);
    /// The jump was carried out.
    pub const JUMP_PERFORMED: Self = Self(1 << 5);
    /// Set together with the jump kinds when the signal triggered it.
    pub const AUTOMATIC: Self = Self(1 << 6);
    /// A collision was registered.
    pub const HIT: Self = Self(1 << 7);
    /// The player reached the last tile.
    pub const GOAL_REACHED: Self = Self(1 << 8);

    // ── Output ──────────────────────────────────────────────────────────
    /// Recorded traces were written to disk.
    pub const EXPORT: Self = Self(1 << 9);

    /// Wildcard: matches *every* event kind.
    pub const ALL: Self = Self(u64::MAX);

    /// Combine two event kinds (bitwise OR).
    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Check whether `self` contains all bits in `other`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check whether `self` intersects with `other` (at least one bit in common).
    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Known kinds with their names, in declaration order.
    const NAMES: &'static [(EventKind, &'static str)] = &[
        (EventKind::RUN_STARTED, "RUN_STARTED"),
        (EventKind::RUN_STOPPED, "RUN_STOPPED"),
        (EventKind::PHASE_CHANGED, "PHASE_CHANGED"),
        (EventKind::THRESHOLD_CHANGED, "THRESHOLD_CHANGED"),
        (EventKind::JUMP_ATTEMPTED, "JUMP_ATTEMPTED"),
        (EventKind::JUMP_PERFORMED, "JUMP_PERFORMED"),
        (EventKind::AUTOMATIC, "AUTOMATIC"),
        (EventKind::HIT, "HIT"),
        (EventKind::GOAL_REACHED, "GOAL_REACHED"),
        (EventKind::EXPORT, "EXPORT"),
    ];
}

impl std::ops::BitOr for EventKind {
    type Output = Self;
    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for EventKind {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl std::ops::BitAnd for EventKind {
    type Output = Self;
    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "EMPTY");
        }
        if *self == EventKind::ALL {
            return write!(f, "ALL");
        }

        let mut names = Vec::new();
        let mut known_bits: u64 = 0;
        for (kind, name) in EventKind::NAMES {
            known_bits |= kind.0;
            if self.contains(*kind) {
                names.push((*name).to_string());
            }
        }
        let extra = self.0 & !known_bits;
        if extra != 0 {
            names.push(format!("0x{:x}", extra));
        }
        write!(f, "{}", names.join("|"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Metadata – per-event-type payloads
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunMeta {
    pub mode: Mode,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseMeta {
    pub from: Phase,
    pub to: Phase,
    /// Countdown of the new phase when it comes from the scheduler.
    pub seconds_left: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdMeta {
    pub value: f64,
    /// Baseline the value was derived from; `None` for a fixed threshold.
    pub mean: Option<f64>,
    pub std: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpMeta {
    pub origin: JumpOrigin,
    /// Filtered sample that triggered an automatic jump.
    pub sample: Option<f64>,
    pub rejection: Option<JumpRejection>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitMeta {
    /// Index into the level's obstacle list.
    pub obstacle: usize,
    /// Hits so far, including this one.
    pub hits: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportMeta {
    /// "csv" or "parquet".
    pub format: String,
    pub path: PathBuf,
    /// Oldest samples no longer retained and therefore missing from the file.
    pub dropped: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// SessionEvent – the top-level event type
// ─────────────────────────────────────────────────────────────────────────────

/// One published transition.
///
/// `kinds` is a bitflag set of [`EventKind`] categories. The `Option<…Meta>`
/// fields carry the metadata relevant to the kinds that are set.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub kinds: EventKind,
    /// Time on the session clock.
    pub timestamp: Duration,

    pub run: Option<RunMeta>,
    pub phase: Option<PhaseMeta>,
    pub threshold: Option<ThresholdMeta>,
    pub jump: Option<JumpMeta>,
    pub hit: Option<HitMeta>,
    pub score: Option<Score>,
    pub export: Option<ExportMeta>,
}

impl SessionEvent {
    pub fn new(kinds: EventKind, timestamp: Duration) -> Self {
        Self {
            kinds,
            timestamp,
            run: None,
            phase: None,
            threshold: None,
            jump: None,
            hit: None,
            score: None,
            export: None,
        }
    }

    pub fn run_started(mode: Mode, timestamp: Duration) -> Self {
        Self {
            run: Some(RunMeta { mode }),
            ..Self::new(EventKind::RUN_STARTED, timestamp)
        }
    }

    pub fn run_stopped(mode: Mode, timestamp: Duration) -> Self {
        Self {
            run: Some(RunMeta { mode }),
            ..Self::new(EventKind::RUN_STOPPED, timestamp)
        }
    }

    pub fn phase_changed(meta: PhaseMeta, timestamp: Duration) -> Self {
        Self {
            phase: Some(meta),
            ..Self::new(EventKind::PHASE_CHANGED, timestamp)
        }
    }

    pub fn threshold_changed(meta: ThresholdMeta, timestamp: Duration) -> Self {
        Self {
            threshold: Some(meta),
            ..Self::new(EventKind::THRESHOLD_CHANGED, timestamp)
        }
    }

    pub fn jump(meta: JumpMeta, timestamp: Duration) -> Self {
        let mut kinds = EventKind::JUMP_ATTEMPTED;
        if meta.rejection.is_none() {
            kinds |= EventKind::JUMP_PERFORMED;
        }
        if meta.origin == JumpOrigin::Automatic {
            kinds |= EventKind::AUTOMATIC;
        }
        Self {
            jump: Some(meta),
            ..Self::new(kinds, timestamp)
        }
    }

    pub fn hit(meta: HitMeta, timestamp: Duration) -> Self {
        Self {
            hit: Some(meta),
            ..Self::new(EventKind::HIT, timestamp)
        }
    }

    pub fn goal_reached(score: Score, timestamp: Duration) -> Self {
        Self {
            score: Some(score),
            ..Self::new(EventKind::GOAL_REACHED, timestamp)
        }
    }

    pub fn exported(meta: ExportMeta, timestamp: Duration) -> Self {
        Self {
            export: Some(meta),
            ..Self::new(EventKind::EXPORT, timestamp)
        }
    }

    /// Name written to the event log.
    pub fn label(&self) -> String {
        if let Some(p) = &self.phase {
            return p.to.name().to_string();
        }
        self.kinds.to_string()
    }

    /// Single value column of the event log; empty when there is none.
    pub fn value(&self) -> String {
        if let Some(t) = &self.threshold {
            return format!("{}", t.value);
        }
        if let Some(j) = &self.jump {
            return match (j.rejection, j.sample) {
                (Some(r), _) => format!("{r:?}"),
                (None, Some(sample)) => format!("{sample}"),
                (None, None) => String::new(),
            };
        }
        if let Some(h) = &self.hit {
            return h.obstacle.to_string();
        }
        if let Some(s) = &self.score {
            return s.stars.to_string();
        }
        if let Some(p) = &self.phase {
            return p.seconds_left.map(|s| format!("{s:.3}")).unwrap_or_default();
        }
        if let Some(r) = &self.run {
            return r.mode.to_string();
        }
        if let Some(e) = &self.export {
            return e.path.display().to_string();
        }
        String::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EventFilter
// ─────────────────────────────────────────────────────────────────────────────

/// A filter that selects which event categories a subscriber receives.
///
/// The filter is an OR-mask: an event is delivered when
/// `event.kinds.intersects(filter.mask)`.
#[derive(Debug, Clone, Copy)]
pub struct EventFilter {
    pub mask: EventKind,
}

impl EventFilter {
    pub const fn all() -> Self {
        Self {
            mask: EventKind::ALL,
        }
    }

    pub const fn only(mask: EventKind) -> Self {
        Self { mask }
    }

    #[inline]
    pub fn matches(&self, event: &SessionEvent) -> bool {
        event.kinds.intersects(self.mask)
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::all()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EventSink
// ─────────────────────────────────────────────────────────────────────────────

/// Fire-and-forget consumer called synchronously on every matching event.
pub trait EventSink: Send {
    fn log(&mut self, event: &SessionEvent);

    fn flush(&mut self) {}
}

/// Writes `timestamp,event,value` rows to a CSV file.
pub struct CsvEventLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl CsvEventLog {
    /// Create the file (and its directory) and write the header.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let mut writer = BufWriter::new(File::create(&path)?);
        writeln!(writer, "timestamp,event,value")?;
        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for CsvEventLog {
    fn log(&mut self, event: &SessionEvent) {
        let result = writeln!(
            self.writer,
            "{:.6},{},{}",
            event.timestamp.as_secs_f64(),
            event.label(),
            event.value()
        );
        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "event log write failed");
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.writer.flush() {
            warn!(path = %self.path.display(), error = %e, "event log flush failed");
        }
    }
}

/// Mirrors events into the `tracing` log.
#[derive(Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn log(&mut self, event: &SessionEvent) {
        info!(
            t = event.timestamp.as_secs_f64(),
            kinds = %event.kinds,
            event = %event.label(),
            value = %event.value(),
            "session event"
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EventController
// ─────────────────────────────────────────────────────────────────────────────

struct Subscriber {
    filter: EventFilter,
    sender: Sender<SessionEvent>,
}

struct AttachedSink {
    filter: EventFilter,
    sink: Box<dyn EventSink>,
}

struct EventCtrlInner {
    subscribers: Vec<Subscriber>,
    sinks: Vec<AttachedSink>,
}

/// Collects session events and distributes them to subscribers and sinks.
///
/// Cloning yields another handle to the same bus.
#[derive(Clone)]
pub struct EventController {
    inner: Arc<Mutex<EventCtrlInner>>,
}

impl EventController {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(EventCtrlInner {
                subscribers: Vec::new(),
                sinks: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EventCtrlInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Receive events whose `kinds` intersect the filter mask.
    pub fn subscribe(&self, filter: EventFilter) -> Receiver<SessionEvent> {
        let (tx, rx) = std::sync::mpsc::channel();
        self.lock().subscribers.push(Subscriber { filter, sender: tx });
        rx
    }

    pub fn subscribe_all(&self) -> Receiver<SessionEvent> {
        self.subscribe(EventFilter::all())
    }

    /// Call `sink` for every event matching `filter`.
    pub fn attach(&self, filter: EventFilter, sink: Box<dyn EventSink>) {
        self.lock().sinks.push(AttachedSink { filter, sink });
    }

    /// Deliver `event`. Subscribers whose receiver is gone are dropped.
    pub fn emit(&self, event: SessionEvent) {
        let mut inner = self.lock();
        for attached in inner.sinks.iter_mut() {
            if attached.filter.matches(&event) {
                attached.sink.log(&event);
            }
        }
        inner.subscribers.retain(|sub| {
            if sub.filter.matches(&event) {
                sub.sender.send(event.clone()).is_ok()
            } else {
                true
            }
        });
    }

    pub fn flush(&self) {
        for attached in self.lock().sinks.iter_mut() {
            attached.sink.flush();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }
}

impl Default for EventController {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────────────────────────
