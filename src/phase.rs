//! Attempt phases and the scheduler that derives them from elapsed time.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::PhaseConfig;

pub const YELLOW: [u8; 3] = [255, 200, 0];
pub const BLUE: [u8; 3] = [40, 110, 220];
pub const GREEN: [u8; 3] = [40, 170, 80];

/// One sub-interval of an attempt, or no attempt running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    NotRunning,
    Prepare,
    /// The motor task.
    Act,
    Relax,
}

impl Phase {
    /// Name used in event logs.
    pub fn name(&self) -> &'static str {
        match self {
            Phase::NotRunning => "NotRunning",
            Phase::Prepare => "Prepare",
            Phase::Act => "MotorTask",
            Phase::Relax => "Relax",
        }
    }

    /// Instruction shown to the participant.
    pub fn instruction(&self) -> &'static str {
        match self {
            Phase::NotRunning => "Not running",
            Phase::Prepare => "Forbered dig på bevægelse",
            Phase::Act => "Bevæg håndledet",
            Phase::Relax => "Slap af",
        }
    }

    pub fn color(&self) -> Option<[u8; 3]> {
        match self {
            Phase::NotRunning => None,
            Phase::Prepare => Some(YELLOW),
            Phase::Act => Some(BLUE),
            Phase::Relax => Some(GREEN),
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Phase plus its countdown, as returned by [`PhaseScheduler::phase`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhaseInfo {
    pub phase: Phase,
    pub seconds_left: Option<f64>,
    /// Full length of the current phase in seconds.
    pub total: Option<f64>,
    /// Zero-based attempt index.
    pub cycle: Option<u32>,
}

impl PhaseInfo {
    pub const NOT_RUNNING: PhaseInfo = PhaseInfo {
        phase: Phase::NotRunning,
        seconds_left: None,
        total: None,
        cycle: None,
    };

    pub fn color(&self) -> Option<[u8; 3]> {
        self.phase.color()
    }

    /// Remaining fraction of the phase in `[0, 1]`.
    pub fn remaining_fraction(&self) -> Option<f64> {
        match (self.seconds_left, self.total) {
            (Some(left), Some(total)) if total > 0.0 => Some((left / total).clamp(0.0, 1.0)),
            _ => None,
        }
    }
}

/// A change between two consecutive observed phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    pub from: Phase,
    pub to: Phase,
}

/// Edge detector over a stream of phases.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseTracker {
    current: Phase,
}

impl PhaseTracker {
    /// Record `phase`; returns the transition if it differs from the last one.
    pub fn observe(&mut self, phase: Phase) -> Option<PhaseTransition> {
        if phase == self.current {
            return None;
        }
        let transition = PhaseTransition {
            from: self.current,
            to: phase,
        };
        self.current = phase;
        Some(transition)
    }

    pub fn current(&self) -> Phase {
        self.current
    }
}

/// Splits time after `start` into `attempts` cycles of prepare, act, relax.
///
/// [`phase`](Self::phase) is a pure function of `now`; polling it at any rate,
/// or long after the last attempt, is safe.
#[derive(Debug, Clone)]
pub struct PhaseScheduler {
    attempts: u32,
    prepare: f64,
    act: f64,
    relax: f64,
    started_at: Option<Duration>,
}

impl PhaseScheduler {
    pub fn new(cfg: &PhaseConfig) -> Self {
        Self {
            attempts: cfg.attempts,
            prepare: cfg.prepare_secs,
            act: cfg.act_secs,
            relax: cfg.relax_secs,
            started_at: None,
        }
    }

    pub fn start(&mut self, now: Duration) {
        self.started_at = Some(now);
    }

    pub fn stop(&mut self) {
        self.started_at = None;
    }

    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn cycle_length(&self) -> f64 {
        self.prepare + self.act + self.relax
    }

    /// Total length of all attempts in seconds.
    pub fn total_length(&self) -> f64 {
        self.cycle_length() * self.attempts as f64
    }

    pub fn phase(&self, now: Duration) -> PhaseInfo {
        let Some(start) = self.started_at else {
            return PhaseInfo::NOT_RUNNING;
        };
        let elapsed = now.saturating_sub(start).as_secs_f64();
        let cycle = self.cycle_length();
        let full_cycles = (elapsed / cycle).floor();
        if full_cycles >= self.attempts as f64 {
            return PhaseInfo::NOT_RUNNING;
        }
        let t = elapsed % cycle;
        let (phase, left, total) = if t < self.prepare {
            (Phase::Prepare, self.prepare - t, self.prepare)
        } else if t < self.prepare + self.act {
            (Phase::Act, self.prepare + self.act - t, self.act)
        } else {
            (Phase::Relax, cycle - t, self.relax)
        };
        PhaseInfo {
            phase,
            seconds_left: Some(left),
            total: Some(total),
            cycle: Some(full_cycles as u32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: f64) -> Duration {
        Duration::from_secs_f64(secs)
    }

    fn scheduler() -> PhaseScheduler {
        PhaseScheduler::new(&PhaseConfig {
            attempts: 3,
            prepare_secs: 2.0,
            act_secs: 5.0,
            relax_secs: 5.0,
        })
    }

    #[test]
    fn not_running_before_start_and_after_stop() {
        let mut s = scheduler();
        assert_eq!(s.phase(at(1.0)), PhaseInfo::NOT_RUNNING);
        s.start(at(0.0));
        assert_eq!(s.phase(at(1.0)).phase, Phase::Prepare);
        s.stop();
        assert_eq!(s.phase(at(1.0)), PhaseInfo::NOT_RUNNING);
    }

    #[test]
    fn phase_boundaries_within_a_cycle() {
        let mut s = scheduler();
        s.start(at(10.0));
        assert_eq!(s.phase(at(10.0)).phase, Phase::Prepare);
        assert_eq!(s.phase(at(11.999)).phase, Phase::Prepare);
        assert_eq!(s.phase(at(12.0)).phase, Phase::Act);
        assert_eq!(s.phase(at(16.999)).phase, Phase::Act);
        assert_eq!(s.phase(at(17.0)).phase, Phase::Relax);
        let second = s.phase(at(22.5));
        assert_eq!(second.phase, Phase::Prepare);
        assert_eq!(second.cycle, Some(1));
    }

    #[test]
    fn countdown_and_totals() {
        let mut s = scheduler();
        s.start(at(0.0));
        let relax = s.phase(at(8.0));
        assert_eq!(relax.phase, Phase::Relax);
        assert!((relax.seconds_left.unwrap() - 4.0).abs() < 1e-9);
        assert_eq!(relax.total, Some(5.0));
        assert!((relax.remaining_fraction().unwrap() - 0.8).abs() < 1e-9);
        assert_eq!(relax.color(), Some(GREEN));
    }

    #[test]
    fn phase_is_idempotent() {
        let mut s = scheduler();
        s.start(at(0.0));
        assert_eq!(s.phase(at(13.3)), s.phase(at(13.3)));
    }

    #[test]
    fn tracker_reports_each_change_once() {
        let mut t = PhaseTracker::default();
        assert_eq!(t.observe(Phase::NotRunning), None);
        assert_eq!(
            t.observe(Phase::Relax),
            Some(PhaseTransition {
                from: Phase::NotRunning,
                to: Phase::Relax
            })
        );
        assert_eq!(t.observe(Phase::Relax), None);
        assert_eq!(t.observe(Phase::Act).map(|t| t.to), Some(Phase::Act));
        assert_eq!(t.current(), Phase::Act);
    }
}
