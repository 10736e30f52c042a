//! The runner game: scrolling, jump gating, collision and scoring.

use std::time::Duration;

use tracing::{debug, info};

use super::player::{Player, Sprite};
use super::world::{Level, Rect};
use crate::config::{JumpGate, PhysicsConfig};
use crate::phase::Phase;

/// Screen area the game is laid out in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Which path asked for a jump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpOrigin {
    Manual,
    Automatic,
}

/// Why a jump was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpRejection {
    NotStarted,
    GoalReached,
    Airborne,
    RestrictedTile,
    Penalty,
    NoThreshold,
    BelowThreshold,
}

/// Final result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub total: usize,
    pub hits: usize,
    pub avoided: usize,
    /// 1 to 3.
    pub stars: u8,
}

impl Score {
    /// Three stars above 90 % avoided, two above 50 %, otherwise one.
    /// A level without obstacles counts as fully avoided.
    pub fn from_counts(total: usize, hits: usize) -> Self {
        let avoided = total.saturating_sub(hits);
        let ratio = if total == 0 {
            1.0
        } else {
            avoided as f64 / total as f64
        };
        let stars = if ratio > 0.9 {
            3
        } else if ratio > 0.5 {
            2
        } else {
            1
        };
        Self {
            total,
            hits,
            avoided,
            stars,
        }
    }
}

/// What changed during one [`GameEngine::step`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepReport {
    /// Outcome of the automatic jump check, when it ran.
    pub automatic_jump: Option<Result<(), JumpRejection>>,
    /// Index of the obstacle a newly registered hit came from.
    pub hit: Option<usize>,
    /// Set on the tick the goal tile is reached.
    pub goal_reached: bool,
}

#[derive(Debug, Clone)]
pub struct GameEngine {
    level: Level,
    physics: PhysicsConfig,
    viewport: Viewport,
    player: Player,
    /// World offset; decreases as the level scrolls left.
    scroll: f64,
    started: bool,
    goal_reached: bool,
    hits: usize,
    threshold: Option<f64>,
}

impl GameEngine {
    /// The player stands a third of the way across, on top of the ground tiles.
    pub fn new(level: Level, physics: PhysicsConfig, viewport: Viewport) -> Self {
        let player = Player::new(viewport.width / 3.0, viewport.height - level.tile_height(), &physics);
        Self {
            level,
            physics,
            viewport,
            player,
            scroll: 0.0,
            started: false,
            goal_reached: false,
            hits: 0,
            threshold: None,
        }
    }

    pub fn start(&mut self) {
        if !self.started {
            info!(obstacles = self.level.obstacles().len(), "game started");
            self.started = true;
        }
    }

    pub fn stop(&mut self) {
        self.started = false;
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_goal_reached(&self) -> bool {
        self.goal_reached
    }

    fn is_running(&self) -> bool {
        self.started && !self.goal_reached
    }

    /// Tile under the player's left edge.
    pub fn current_tile(&self) -> i64 {
        ((-self.scroll + self.player.x()) / self.level.tile_width()).floor() as i64
    }

    /// Relax on restricted tiles, Act elsewhere, NotRunning before start and
    /// after the goal.
    pub fn phase(&self) -> Phase {
        if !self.is_running() {
            Phase::NotRunning
        } else if self.level.is_restricted(self.current_tile()) {
            Phase::Relax
        } else {
            Phase::Act
        }
    }

    pub fn set_threshold(&mut self, threshold: Option<f64>) {
        self.threshold = threshold;
    }

    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    fn check_gate(&self, gate: &JumpGate, origin: JumpOrigin, now: Duration) -> Result<(), JumpRejection> {
        if self.goal_reached {
            return Err(JumpRejection::GoalReached);
        }
        if self.player.is_airborne() {
            return Err(JumpRejection::Airborne);
        }
        if gate.respect_restricted_tiles && self.level.is_restricted(self.current_tile()) {
            return Err(JumpRejection::RestrictedTile);
        }
        if let Some(since) = self.player.since_hit(now) {
            let wait = self.physics.hit_penalty_secs + gate.grace_secs;
            let cooled = match origin {
                JumpOrigin::Manual => since >= wait,
                JumpOrigin::Automatic => since > wait,
            };
            if !cooled {
                return Err(JumpRejection::Penalty);
            }
        }
        Ok(())
    }

    /// Jump on key press.
    pub fn manual_jump(&mut self, now: Duration) -> Result<(), JumpRejection> {
        let gate = self.physics.jump.manual;
        self.check_gate(&gate, JumpOrigin::Manual, now)?;
        self.player.jump(self.physics.jump_impulse);
        debug!(tile = self.current_tile(), "manual jump");
        Ok(())
    }

    /// Jump when `sample` exceeds `threshold`. Inert until a threshold exists.
    pub fn automatic_jump(
        &mut self,
        sample: f64,
        threshold: Option<f64>,
        now: Duration,
    ) -> Result<(), JumpRejection> {
        if !self.started {
            return Err(JumpRejection::NotStarted);
        }
        let threshold = threshold.ok_or(JumpRejection::NoThreshold)?;
        if sample <= threshold {
            return Err(JumpRejection::BelowThreshold);
        }
        let gate = self.physics.jump.automatic;
        self.check_gate(&gate, JumpOrigin::Automatic, now)?;
        self.player.jump(self.physics.jump_impulse);
        debug!(sample, threshold, tile = self.current_tile(), "automatic jump");
        Ok(())
    }

    fn past_penalty(&self, now: Duration) -> bool {
        self.player
            .since_hit(now)
            .is_none_or(|since| since >= self.physics.hit_penalty_secs)
    }

    fn hit_counts(&self, now: Duration) -> bool {
        self.player.since_hit(now).is_none_or(|since| {
            since > self.physics.hit_penalty_secs + self.physics.hit_amnesty_secs
        })
    }

    /// Advance one tick with the latest filtered sample.
    pub fn step(&mut self, filtered: Option<f64>, now: Duration) -> StepReport {
        let mut report = StepReport::default();

        if self.is_running() {
            if let Some(sample) = filtered {
                if self.threshold.is_some() {
                    report.automatic_jump = Some(self.automatic_jump(sample, self.threshold, now));
                }
            }
        }

        self.player.step(self.physics.gravity);

        if self.is_running() && self.past_penalty(now) {
            let factor = if self.player.is_airborne() {
                self.physics.airborne_speed_factor
            } else {
                1.0
            };
            self.scroll -= self.physics.speed * factor;
        }

        if self.is_running() {
            if let Some(index) = self.first_collision() {
                if !self.player.is_airborne() && self.hit_counts(now) {
                    self.hits += 1;
                    self.player.register_hit(now);
                    info!(obstacle = index, hits = self.hits, "obstacle hit");
                    report.hit = Some(index);
                }
            }

            if self.current_tile() >= self.level.width_tiles() as i64 {
                self.goal_reached = true;
                let score = self.score();
                info!(hits = score.hits, stars = score.stars, "goal reached");
                report.goal_reached = true;
            }
        }
        report
    }

    fn first_collision(&self) -> Option<usize> {
        let pad = self.physics.collision_padding;
        let player = self.player.rect().shrink(pad);
        (0..self.level.obstacles().len()).find(|&i| {
            self.obstacle_rect(i)
                .is_some_and(|r| r.shrink(pad).intersects(&player))
        })
    }

    pub fn score(&self) -> Score {
        Score::from_counts(self.level.obstacles().len(), self.hits)
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn scroll(&self) -> f64 {
        self.scroll
    }

    /// Baseline the ground tiles are drawn from.
    pub fn ground_line(&self) -> f64 {
        self.viewport.height - self.level.tile_height()
    }

    pub fn obstacle_rect(&self, i: usize) -> Option<Rect> {
        self.level.obstacle_rect(i, self.scroll, self.ground_line())
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn sprite(&self, now: Duration) -> Sprite {
        self.player.sprite(now, self.physics.walk_frame_secs)
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LevelConfig;
    use crate::game::world::ObstacleKind;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn level_cfg() -> LevelConfig {
        LevelConfig {
            obstacle_count: 2,
            tiles_per_obstacle: 5,
            start_tile: 10,
            restricted_window_tiles: 2,
            ..LevelConfig::default()
        }
    }

    /// Player x = 210 over 70 px tiles, so it starts on tile 3.
    fn engine(tiles: &[(ObstacleKind, usize)]) -> GameEngine {
        let level = Level::from_tiles(&level_cfg(), tiles);
        GameEngine::new(level, PhysicsConfig::default(), Viewport::new(630.0, 600.0))
    }

    fn scroll_to_tile(e: &mut GameEngine, tile: i64) {
        e.scroll = e.player.x() - tile as f64 * e.level.tile_width() - 1.0;
        assert_eq!(e.current_tile(), tile);
    }

    #[test]
    fn phase_follows_tiles() {
        let mut e = engine(&[(ObstacleKind::Cactus, 10), (ObstacleKind::Spikes, 20)]);
        assert_eq!(e.phase(), Phase::NotRunning);
        e.start();
        assert_eq!(e.current_tile(), 3);
        assert_eq!(e.phase(), Phase::Relax);
        scroll_to_tile(&mut e, 12);
        assert_eq!(e.phase(), Phase::Act);
        scroll_to_tile(&mut e, 19);
        assert_eq!(e.phase(), Phase::Relax);
    }

    #[test]
    fn automatic_jump_is_inert_without_threshold() {
        let mut e = engine(&[(ObstacleKind::Cactus, 10), (ObstacleKind::Spikes, 20)]);
        e.start();
        let report = e.step(Some(1e9), secs(1.0));
        assert_eq!(report.automatic_jump, None);
        assert!(!e.player().is_airborne());
        assert_eq!(
            e.automatic_jump(1e9, None, secs(1.0)),
            Err(JumpRejection::NoThreshold)
        );
    }

    #[test]
    fn automatic_jump_ignores_restricted_tiles() {
        let mut e = engine(&[(ObstacleKind::Cactus, 10), (ObstacleKind::Spikes, 20)]);
        e.start();
        e.set_threshold(Some(5.0));
        assert_eq!(e.phase(), Phase::Relax);
        let report = e.step(Some(4.0), secs(1.0));
        assert_eq!(report.automatic_jump, Some(Err(JumpRejection::BelowThreshold)));
        let report = e.step(Some(6.0), secs(1.1));
        assert_eq!(report.automatic_jump, Some(Ok(())));
        assert!(e.player().is_airborne());
    }

    #[test]
    fn automatic_grace_is_longer_than_manual() {
        let mut e = engine(&[(ObstacleKind::Cactus, 10), (ObstacleKind::Spikes, 20)]);
        e.start();
        scroll_to_tile(&mut e, 14);
        e.player.register_hit(secs(10.0));
        // manual may jump again right at the end of the penalty
        assert_eq!(e.automatic_jump(9.0, Some(1.0), secs(13.5)), Err(JumpRejection::Penalty));
        assert_eq!(e.automatic_jump(9.0, Some(1.0), secs(14.0)), Err(JumpRejection::Penalty));
        assert_eq!(e.manual_jump(secs(13.5)), Ok(()));
    }

    #[test]
    fn scrolling_stops_during_penalty_and_speeds_up_airborne() {
        let mut e = engine(&[(ObstacleKind::Cactus, 10), (ObstacleKind::Spikes, 20)]);
        e.step(None, secs(0.0));
        assert_eq!(e.scroll(), 0.0);
        e.start();
        e.step(None, secs(0.0));
        assert_eq!(e.scroll(), -4.0);

        e.player.jump(-20.0);
        e.step(None, secs(0.1));
        assert!((e.scroll() - (-4.0 - 4.8)).abs() < 1e-9);

        e.player.register_hit(secs(1.0));
        let before = e.scroll();
        e.step(None, secs(2.0));
        assert_eq!(e.scroll(), before);
        e.step(None, secs(4.0));
        assert!(e.scroll() < before);
    }

    #[test]
    fn walking_into_an_obstacle_registers_one_hit() {
        let mut e = engine(&[(ObstacleKind::Cactus, 10), (ObstacleKind::Spikes, 20)]);
        e.start();
        let mut hits = Vec::new();
        let mut t = 0.0;
        // 60 Hz for 6 s; the first obstacle is 490 px ahead of the player
        for _ in 0..360 {
            let report = e.step(None, secs(t));
            if let Some(i) = report.hit {
                hits.push((i, t));
            }
            assert!(e.player().y() <= e.player().ground());
            t += 1.0 / 60.0;
        }
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, 0);
        assert_eq!(e.hits(), 1);
    }

    #[test]
    fn goal_stops_the_run() {
        let mut e = engine(&[(ObstacleKind::Cactus, 10), (ObstacleKind::Spikes, 20)]);
        e.start();
        let width = e.level.width_tiles() as i64;
        scroll_to_tile(&mut e, width - 1);
        let mut reached = false;
        for i in 0..100 {
            let report = e.step(None, secs(i as f64 / 60.0));
            if report.goal_reached {
                reached = true;
                break;
            }
        }
        assert!(reached);
        assert!(e.is_goal_reached());
        assert_eq!(e.phase(), Phase::NotRunning);
        let scroll = e.scroll();
        e.step(None, secs(10.0));
        assert_eq!(e.scroll(), scroll);
        assert_eq!(e.manual_jump(secs(10.0)), Err(JumpRejection::GoalReached));
    }

    #[test]
    fn star_buckets() {
        assert_eq!(Score::from_counts(10, 0).stars, 3);
        assert_eq!(Score::from_counts(10, 1).stars, 2);
        assert_eq!(Score::from_counts(10, 5).stars, 1);
        assert_eq!(Score::from_counts(10, 4).stars, 2);
        assert_eq!(Score::from_counts(0, 0).stars, 3);
        let s = Score::from_counts(5, 1);
        assert_eq!((s.avoided, s.stars), (4, 2));
    }
}
