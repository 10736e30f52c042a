//! Player body: vertical physics, hit bookkeeping and sprite selection.

use std::time::Duration;

use super::world::Rect;
use crate::config::PhysicsConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sprite {
    Walk1,
    Walk2,
    Jump,
}

#[derive(Debug, Clone)]
pub struct Player {
    /// Fixed horizontal position in the viewport.
    x: f64,
    /// Top edge; grows downwards.
    y: f64,
    vy: f64,
    /// Value of `y` when standing on the ground.
    ground: f64,
    width: f64,
    height: f64,
    last_hit: Option<Duration>,
}

impl Player {
    /// Standing on the ground line `ground_line` at horizontal position `x`.
    pub fn new(x: f64, ground_line: f64, physics: &PhysicsConfig) -> Self {
        let ground = ground_line - physics.player_height;
        Self {
            x,
            y: ground,
            vy: 0.0,
            ground,
            width: physics.player_width,
            height: physics.player_height,
            last_hit: None,
        }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn vy(&self) -> f64 {
        self.vy
    }

    /// Standing `y`; the player never ends a tick below it.
    pub fn ground(&self) -> f64 {
        self.ground
    }

    pub fn is_airborne(&self) -> bool {
        self.y < self.ground
    }

    pub fn last_hit(&self) -> Option<Duration> {
        self.last_hit
    }

    /// Seconds since the last hit, `None` if never hit.
    pub fn since_hit(&self, now: Duration) -> Option<f64> {
        self.last_hit
            .map(|hit| now.saturating_sub(hit).as_secs_f64())
    }

    pub fn jump(&mut self, impulse: f64) {
        self.vy = impulse;
    }

    pub fn register_hit(&mut self, now: Duration) {
        self.vy = 0.0;
        self.last_hit = Some(now);
    }

    /// `y += vy; vy += gravity`, landing on the ground line.
    pub fn step(&mut self, gravity: f64) {
        self.y += self.vy;
        self.vy += gravity;
        if self.y >= self.ground {
            self.y = self.ground;
            self.vy = 0.0;
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Jump frame in the air, otherwise alternating walk frames.
    pub fn sprite(&self, now: Duration, walk_frame_secs: f64) -> Sprite {
        if self.is_airborne() {
            return Sprite::Jump;
        }
        if walk_frame_secs <= 0.0 {
            return Sprite::Walk1;
        }
        let frame = (now.as_secs_f64() / walk_frame_secs).floor() as u64;
        if frame % 2 == 0 {
            Sprite::Walk1
        } else {
            Sprite::Walk2
        }
    }
}
