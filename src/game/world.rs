//! Level layout: obstacles and the restricted-tile classification.
//!
//! Both are computed once when the level is built and never change.

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::LevelConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleKind {
    Cactus,
    Spikes,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub kind: ObstacleKind,
    /// Tile the obstacle stands on.
    pub tile: usize,
    /// Left edge in world pixels.
    pub x: f64,
}

/// Axis-aligned box in screen pixels, `y` growing downwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Shrink by `pad` on every side (grow for negative `pad`).
    pub fn shrink(&self, pad: f64) -> Self {
        Self {
            x: self.x + pad,
            y: self.y + pad,
            w: (self.w - 2.0 * pad).max(0.0),
            h: (self.h - 2.0 * pad).max(0.0),
        }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

#[derive(Debug, Clone)]
pub struct Level {
    obstacles: Vec<Obstacle>,
    /// `restricted[t]` for tiles `0..=width_tiles`; tiles outside count as restricted.
    restricted: Vec<bool>,
    width_tiles: usize,
    tile_width: f64,
    tile_height: f64,
    obstacle_height: f64,
}

impl Level {
    /// Random layout: `obstacle_count` distinct slots out of the
    /// `obstacle_count + 4` slots after `start_tile`, kinds chosen 50/50.
    pub fn generate<R: Rng + ?Sized>(cfg: &LevelConfig, rng: &mut R) -> Self {
        let slots = cfg.obstacle_count + 4;
        let mut picked = index::sample(rng, slots, cfg.obstacle_count.min(slots)).into_vec();
        picked.sort_unstable();
        let obstacles = picked
            .into_iter()
            .map(|slot| {
                let kind = if rng.random_bool(0.5) {
                    ObstacleKind::Cactus
                } else {
                    ObstacleKind::Spikes
                };
                let tile = cfg.start_tile + slot * cfg.tiles_per_obstacle;
                Obstacle {
                    kind,
                    tile,
                    x: tile as f64 * cfg.tile_width,
                }
            })
            .collect();
        Self::with_obstacles(cfg, obstacles)
    }

    /// Fixed layout from `(kind, tile)` pairs, kept in the given order.
    pub fn from_tiles(cfg: &LevelConfig, tiles: &[(ObstacleKind, usize)]) -> Self {
        let obstacles = tiles
            .iter()
            .map(|&(kind, tile)| Obstacle {
                kind,
                tile,
                x: tile as f64 * cfg.tile_width,
            })
            .collect();
        Self::with_obstacles(cfg, obstacles)
    }

    fn with_obstacles(cfg: &LevelConfig, obstacles: Vec<Obstacle>) -> Self {
        let width_tiles = cfg.level_width_tiles();
        let restricted = classify(&obstacles, cfg.restricted_window_tiles, width_tiles);
        Self {
            obstacles,
            restricted,
            width_tiles,
            tile_width: cfg.tile_width,
            tile_height: cfg.tile_height,
            obstacle_height: cfg.obstacle_height,
        }
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn width_tiles(&self) -> usize {
        self.width_tiles
    }

    pub fn tile_width(&self) -> f64 {
        self.tile_width
    }

    pub fn tile_height(&self) -> f64 {
        self.tile_height
    }

    pub fn obstacle_height(&self) -> f64 {
        self.obstacle_height
    }

    /// Whether `tile` lies in a restricted stretch. Tiles before the level
    /// start and past its end are restricted.
    pub fn is_restricted(&self, tile: i64) -> bool {
        usize::try_from(tile)
            .ok()
            .and_then(|t| self.restricted.get(t).copied())
            .unwrap_or(true)
    }

    /// Screen box of obstacle `i` for the given scroll offset and ground line.
    pub fn obstacle_rect(&self, i: usize, scroll: f64, ground_y: f64) -> Option<Rect> {
        self.obstacles.get(i).map(|o| {
            Rect::new(
                o.x + scroll,
                ground_y - self.obstacle_height,
                self.tile_width,
                self.obstacle_height,
            )
        })
    }
}

/// Restricted tiles: each obstacle plus `window` tiles before it, everything
/// before the first such window, and everything after the last obstacle.
fn classify(obstacles: &[Obstacle], window: usize, width_tiles: usize) -> Vec<bool> {
    let mut restricted = vec![false; width_tiles + 1];
    let (Some(first), Some(last)) = (
        obstacles.iter().map(|o| o.tile).min(),
        obstacles.iter().map(|o| o.tile).max(),
    ) else {
        restricted.iter_mut().for_each(|r| *r = true);
        return restricted;
    };
    let first_window = first.saturating_sub(window);
    for (tile, r) in restricted.iter_mut().enumerate() {
        *r = tile < first_window || tile > last;
    }
    for o in obstacles {
        for tile in o.tile.saturating_sub(window)..=o.tile {
            if let Some(r) = restricted.get_mut(tile) {
                *r = true;
            }
        }
    }
    restricted
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cfg() -> LevelConfig {
        LevelConfig {
            obstacle_count: 3,
            tiles_per_obstacle: 5,
            start_tile: 10,
            restricted_window_tiles: 2,
            ..LevelConfig::default()
        }
    }

    #[test]
    fn classification_marks_windows_and_ends() {
        let level = Level::from_tiles(
            &cfg(),
            &[
                (ObstacleKind::Cactus, 10),
                (ObstacleKind::Spikes, 20),
                (ObstacleKind::Cactus, 30),
            ],
        );
        // before the first window
        assert!(level.is_restricted(-3));
        assert!(level.is_restricted(0));
        assert!(level.is_restricted(7));
        // first window and obstacle
        assert!(level.is_restricted(8));
        assert!(level.is_restricted(10));
        // gap
        assert!(!level.is_restricted(11));
        assert!(!level.is_restricted(17));
        // second window
        assert!(level.is_restricted(18));
        assert!(level.is_restricted(20));
        assert!(!level.is_restricted(21));
        // after the last obstacle
        assert!(level.is_restricted(31));
        assert!(level.is_restricted(1000));
    }

    #[test]
    fn generated_layout_is_seeded_distinct_and_in_range() {
        let cfg = cfg();
        let a = Level::generate(&cfg, &mut StdRng::seed_from_u64(7));
        let b = Level::generate(&cfg, &mut StdRng::seed_from_u64(7));
        assert_eq!(a.obstacles(), b.obstacles());
        assert_eq!(a.obstacles().len(), 3);
        let mut tiles: Vec<usize> = a.obstacles().iter().map(|o| o.tile).collect();
        tiles.dedup();
        assert_eq!(tiles.len(), 3);
        for o in a.obstacles() {
            assert!(o.tile >= cfg.start_tile && o.tile < cfg.level_width_tiles());
            assert_eq!((o.tile - cfg.start_tile) % cfg.tiles_per_obstacle, 0);
            assert_eq!(o.x, o.tile as f64 * cfg.tile_width);
        }
    }

    #[test]
    fn rect_overlap_respects_padding() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(9.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&b));
        assert!(!a.shrink(1.0).intersects(&b.shrink(1.0)));
        let c = Rect::new(10.0, 0.0, 5.0, 5.0);
        assert!(!a.intersects(&c));
    }
}
