use std::time::Duration;

use tracing::info;

use super::Tick;
use crate::config::{Mode, PhaseConfig};
use crate::events::{EventController, SessionEvent};
use crate::game::Viewport;
use crate::phase::{Phase, PhaseInfo, PhaseScheduler};

/// Phase text with a countdown bar, no signal feedback.
#[derive(Debug, Clone, PartialEq)]
pub struct InstructionsView {
    pub info: PhaseInfo,
    pub text: &'static str,
    pub color: Option<[u8; 3]>,
    /// Width of the countdown bar in pixels; hidden during Prepare.
    pub bar_width: Option<f64>,
    /// 1-based attempt number and the attempt count.
    pub attempt: Option<(u32, u32)>,
    pub completed: bool,
}

#[derive(Debug, Clone)]
pub struct InstructionsScene {
    scheduler: PhaseScheduler,
    attempts: u32,
    viewport: Viewport,
    completed: bool,
}

impl InstructionsScene {
    pub fn new(cfg: &PhaseConfig, viewport: Viewport) -> Self {
        Self {
            scheduler: PhaseScheduler::new(cfg),
            attempts: cfg.attempts,
            viewport,
            completed: false,
        }
    }

    /// Starts the scheduler; ignored while a run is in progress.
    pub fn start(&mut self, now: Duration, events: &EventController) {
        if self.scheduler.is_started() && !self.completed {
            return;
        }
        self.scheduler.start(now);
        self.completed = false;
        info!(
            attempts = self.attempts,
            total_secs = self.scheduler.total_length(),
            "instructions started"
        );
        events.emit(SessionEvent::run_started(Mode::Instructions, now));
    }

    pub fn stop(&mut self, now: Duration, events: &EventController) {
        if self.scheduler.is_started() {
            self.scheduler.stop();
            if !self.completed {
                events.emit(SessionEvent::run_stopped(Mode::Instructions, now));
            }
        }
    }

    pub fn phase(&self, now: Duration) -> PhaseInfo {
        self.scheduler.phase(now)
    }

    pub fn draw(&mut self, tick: &Tick<'_>) -> InstructionsView {
        let info = self.scheduler.phase(tick.now);
        if self.scheduler.is_started() && info.phase == Phase::NotRunning && !self.completed {
            self.completed = true;
            info!("all attempts done");
            tick.events
                .emit(SessionEvent::run_stopped(Mode::Instructions, tick.now));
        }
        let bar_width = match info.phase {
            Phase::Prepare | Phase::NotRunning => None,
            Phase::Act | Phase::Relax => info
                .remaining_fraction()
                .map(|f| f * self.viewport.width / 2.0),
        };
        InstructionsView {
            info,
            text: info.phase.instruction(),
            color: info.color(),
            bar_width,
            attempt: info.cycle.map(|c| (c + 1, self.attempts)),
            completed: self.completed,
        }
    }
}
