//! Scenes: what the participant sees in each mode.
//!
//! Every scene offers the same capabilities (start, stop, input, per-tick
//! draw) and [`Scene`] dispatches over the three modes. Drawing returns a
//! [`RenderState`] describing *what* to show; the front-end decides how.

mod game;
mod instructions;
mod setup;

use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

pub use game::{GameScene, GameView, ObstacleView};
pub use instructions::{InstructionsScene, InstructionsView};
pub use setup::{SetupScene, SetupView};

use crate::config::{AppConfig, Mode};
use crate::events::EventController;
use crate::game::{GameEngine, Level, Viewport};
use crate::phase::PhaseInfo;

/// Normalised user input. Everything else is ignored by the scenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Start,
    Jump,
    Quit,
}

/// Whether the session should keep going after an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Per-tick context handed to [`Scene::draw`].
pub struct Tick<'a> {
    pub now: Duration,
    /// Threshold currently published by the calibration.
    pub threshold: Option<f64>,
    pub events: &'a EventController,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderState {
    Setup(SetupView),
    Instructions(InstructionsView),
    Game(GameView),
}

pub enum Scene {
    Setup(SetupScene),
    Instructions(InstructionsScene),
    Game(GameScene),
}

impl Scene {
    /// Build the scene for `mode`. The game level is drawn from the level
    /// seed when one is configured.
    pub fn for_mode(mode: Mode, cfg: &AppConfig) -> Self {
        let viewport = Viewport::new(cfg.window.width, cfg.window.height);
        match mode {
            Mode::Setup => Scene::Setup(SetupScene::new(cfg.threshold.fixed)),
            Mode::Instructions => Scene::Instructions(InstructionsScene::new(&cfg.phases, viewport)),
            Mode::Game => {
                let mut rng = match cfg.level.seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_os_rng(),
                };
                let level = Level::generate(&cfg.level, &mut rng);
                Scene::Game(GameScene::new(GameEngine::new(level, cfg.physics.clone(), viewport)))
            }
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            Scene::Setup(_) => Mode::Setup,
            Scene::Instructions(_) => Mode::Instructions,
            Scene::Game(_) => Mode::Game,
        }
    }

    pub fn start(&mut self, now: Duration, events: &EventController) {
        match self {
            Scene::Setup(s) => s.start(now, events),
            Scene::Instructions(s) => s.start(now, events),
            Scene::Game(s) => s.start(now, events),
        }
    }

    pub fn stop(&mut self, now: Duration, events: &EventController) {
        match self {
            Scene::Setup(s) => s.stop(now, events),
            Scene::Instructions(s) => s.stop(now, events),
            Scene::Game(s) => s.stop(now, events),
        }
    }

    /// `Start` starts the scene, `Jump` is for the game, `Quit` stops the
    /// scene and asks the session to end.
    pub fn handle_input(&mut self, input: Input, now: Duration, events: &EventController) -> Flow {
        match input {
            Input::Quit => {
                self.stop(now, events);
                return Flow::Quit;
            }
            Input::Start => self.start(now, events),
            Input::Jump => {
                if let Scene::Game(g) = self {
                    g.jump(now, events);
                }
            }
        }
        Flow::Continue
    }

    /// Phase that drives the baseline capture.
    pub fn phase(&self, now: Duration) -> PhaseInfo {
        match self {
            Scene::Setup(_) => PhaseInfo::NOT_RUNNING,
            Scene::Instructions(s) => s.phase(now),
            Scene::Game(s) => s.phase(),
        }
    }

    /// Advance one tick with the latest filtered sample and describe the frame.
    pub fn draw(&mut self, tick: &Tick<'_>, signal: Option<f64>) -> RenderState {
        match self {
            Scene::Setup(s) => RenderState::Setup(s.draw(signal)),
            Scene::Instructions(s) => RenderState::Instructions(s.draw(tick)),
            Scene::Game(s) => RenderState::Game(s.draw(tick, signal)),
        }
    }
}
