//! Side-scrolling runner driven by manual and EMG-triggered jumps.

pub mod engine;
pub mod player;
pub mod world;

pub use engine::{GameEngine, JumpOrigin, JumpRejection, Score, StepReport, Viewport};
pub use player::{Player, Sprite};
pub use world::{Level, Obstacle, ObstacleKind, Rect};
