use std::time::Duration;

use super::Tick;
use crate::config::Mode;
use crate::events::{EventController, HitMeta, JumpMeta, SessionEvent};
use crate::game::{GameEngine, JumpOrigin, ObstacleKind, Rect, Score, Sprite};
use crate::phase::{Phase, PhaseInfo};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleView {
    pub kind: ObstacleKind,
    pub rect: Rect,
}

/// Everything the front-end needs to paint one game frame.
#[derive(Debug, Clone, PartialEq)]
pub struct GameView {
    pub started: bool,
    pub phase: Phase,
    pub color: Option<[u8; 3]>,
    pub scroll: f64,
    pub tile_width: f64,
    pub ground_line: f64,
    /// Screen x of the goal line.
    pub goal_x: f64,
    pub player: Rect,
    pub sprite: Sprite,
    /// Obstacles overlapping the viewport.
    pub obstacles: Vec<ObstacleView>,
    pub signal: Option<f64>,
    pub threshold: Option<f64>,
    pub hits: usize,
    /// Set once the goal is reached.
    pub score: Option<Score>,
}

pub struct GameScene {
    engine: GameEngine,
}

impl GameScene {
    pub fn new(engine: GameEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &GameEngine {
        &self.engine
    }

    pub fn start(&mut self, now: Duration, events: &EventController) {
        if self.engine.is_started() || self.engine.is_goal_reached() {
            return;
        }
        self.engine.start();
        events.emit(SessionEvent::run_started(Mode::Game, now));
    }

    pub fn stop(&mut self, now: Duration, events: &EventController) {
        if self.engine.is_started() {
            self.engine.stop();
            events.emit(SessionEvent::run_stopped(Mode::Game, now));
        }
    }

    pub fn jump(&mut self, now: Duration, events: &EventController) {
        let result = self.engine.manual_jump(now);
        events.emit(SessionEvent::jump(
            JumpMeta {
                origin: JumpOrigin::Manual,
                sample: None,
                rejection: result.err(),
            },
            now,
        ));
    }

    pub fn phase(&self) -> PhaseInfo {
        PhaseInfo {
            phase: self.engine.phase(),
            ..PhaseInfo::NOT_RUNNING
        }
    }

    /// Step the engine and report what happened. Automatic jumps are only
    /// published when performed; rejections happen on most ticks.
    pub fn draw(&mut self, tick: &Tick<'_>, signal: Option<f64>) -> GameView {
        self.engine.set_threshold(tick.threshold);
        let report = self.engine.step(signal, tick.now);

        if let Some(Ok(())) = report.automatic_jump {
            tick.events.emit(SessionEvent::jump(
                JumpMeta {
                    origin: JumpOrigin::Automatic,
                    sample: signal,
                    rejection: None,
                },
                tick.now,
            ));
        }
        if let Some(obstacle) = report.hit {
            tick.events.emit(SessionEvent::hit(
                HitMeta {
                    obstacle,
                    hits: self.engine.hits(),
                },
                tick.now,
            ));
        }
        if report.goal_reached {
            tick.events
                .emit(SessionEvent::goal_reached(self.engine.score(), tick.now));
        }
        self.view(tick.now, signal)
    }

    fn view(&self, now: Duration, signal: Option<f64>) -> GameView {
        let e = &self.engine;
        let width = e.viewport().width;
        let obstacles = (0..e.level().obstacles().len())
            .filter_map(|i| {
                let rect = e.obstacle_rect(i)?;
                let visible = rect.x + rect.w >= 0.0 && rect.x <= width;
                visible.then(|| ObstacleView {
                    kind: e.level().obstacles()[i].kind,
                    rect,
                })
            })
            .collect();
        let phase = e.phase();
        GameView {
            started: e.is_started(),
            phase,
            color: phase.color(),
            scroll: e.scroll(),
            tile_width: e.level().tile_width(),
            ground_line: e.ground_line(),
            goal_x: e.level().width_tiles() as f64 * e.level().tile_width() + e.scroll(),
            player: e.player().rect(),
            sprite: e.sprite(now),
            obstacles,
            signal,
            threshold: e.threshold(),
            hits: e.hits(),
            score: e.is_goal_reached().then(|| e.score()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LevelConfig, PhysicsConfig};
    use crate::events::{EventFilter, EventKind};
    use crate::game::{Level, Viewport};

    fn scene() -> GameScene {
        let cfg = LevelConfig {
            obstacle_count: 2,
            start_tile: 10,
            ..LevelConfig::default()
        };
        let level = Level::from_tiles(&cfg, &[(ObstacleKind::Cactus, 10), (ObstacleKind::Spikes, 20)]);
        GameScene::new(GameEngine::new(
            level,
            PhysicsConfig::default(),
            Viewport::new(630.0, 600.0),
        ))
    }

    #[test]
    fn manual_jump_is_always_logged() {
        let events = EventController::new();
        let rx = events.subscribe(EventFilter::only(EventKind::JUMP_ATTEMPTED));
        let mut s = scene();
        s.start(Duration::ZERO, &events);
        // tile 3 lies before the first restricted window
        s.jump(Duration::from_millis(10), &events);
        let evt = rx.try_recv().unwrap();
        assert_eq!(evt.kinds, EventKind::JUMP_ATTEMPTED);
        assert!(evt.jump.unwrap().rejection.is_some());
    }

    #[test]
    fn threshold_crossing_publishes_automatic_jump() {
        let events = EventController::new();
        let rx = events.subscribe(EventFilter::only(EventKind::AUTOMATIC));
        let mut s = scene();
        s.start(Duration::ZERO, &events);
        let tick = Tick {
            now: Duration::from_millis(16),
            threshold: Some(5.0),
            events: &events,
        };
        let view = s.draw(&tick, Some(2.0));
        assert!(rx.try_recv().is_err());
        assert_eq!(view.sprite, Sprite::Walk1);

        let view = s.draw(&tick, Some(9.0));
        let evt = rx.try_recv().unwrap();
        assert!(evt.kinds.contains(EventKind::JUMP_PERFORMED));
        assert_eq!(view.sprite, Sprite::Jump);
        assert_eq!(view.threshold, Some(5.0));
    }

    #[test]
    fn view_lists_only_visible_obstacles() {
        let events = EventController::new();
        let mut s = scene();
        let tick = Tick {
            now: Duration::ZERO,
            threshold: None,
            events: &events,
        };
        let view = s.draw(&tick, None);
        // obstacle 0 at x = 700 is just right of a 630 px viewport
        assert!(view.obstacles.is_empty());
        assert!(!view.started);
        assert_eq!(view.phase, Phase::NotRunning);
        assert_eq!(view.ground_line, 530.0);
    }
}
