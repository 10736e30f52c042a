use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use myoloop::config::{FilterConfig, LevelConfig, PhaseConfig, PhysicsConfig};
use myoloop::game::{GameEngine, JumpRejection, Level, ObstacleKind, Score, Viewport};
use myoloop::{Phase, PhaseScheduler, SignalConditioner};

fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s)
}

fn level_cfg() -> LevelConfig {
    LevelConfig {
        obstacle_count: 3,
        tiles_per_obstacle: 5,
        start_tile: 10,
        restricted_window_tiles: 2,
        ..LevelConfig::default()
    }
}

/// Player at x = 210 in a 630 px wide viewport, i.e. tile 3 at scroll 0.
fn engine_with(physics: PhysicsConfig) -> GameEngine {
    let level = Level::from_tiles(
        &level_cfg(),
        &[
            (ObstacleKind::Cactus, 10),
            (ObstacleKind::Spikes, 20),
            (ObstacleKind::Cactus, 25),
        ],
    );
    GameEngine::new(level, physics, Viewport::new(630.0, 600.0))
}

#[test]
fn constant_input_through_default_filter_stays_finite() {
    let mut c = SignalConditioner::new(&FilterConfig {
        sampling_frequency: 4000.0,
        bandpass_low: 20.0,
        bandpass_high: 200.0,
        bandpass_order: 4,
        ..FilterConfig::default()
    })
    .unwrap();
    for _ in 0..200 {
        c.apply(1000.0);
    }
    assert_eq!(c.output().len(), 200);
    assert_eq!(c.input().len(), 200);
    assert!(c.output().iter().all(|(_, v)| v.is_finite() && v >= 0.0));
}

#[test]
fn histories_stay_in_lock_step() {
    let mut c = SignalConditioner::new(&FilterConfig {
        sampling_frequency: 100.0,
        bandpass_low: 5.0,
        bandpass_high: 30.0,
        bandpass_order: 2,
        history_retention_secs: 1.0,
        baseline_span_secs: 0.3,
        baseline_exclude_secs: 0.1,
        ..FilterConfig::default()
    })
    .unwrap();
    let mut rng = StdRng::seed_from_u64(5);
    for n in 1..=500usize {
        c.apply(rng.random_range(-100.0..100.0));
        assert_eq!(c.input().len(), n);
        assert_eq!(c.bandpassed().len(), n);
        assert_eq!(c.output().len(), n);
    }
    // retention is bounded even though the counts keep growing
    assert!(c.output().retained() < 500);
}

#[test]
fn scheduler_scenario() {
    let mut s = PhaseScheduler::new(&PhaseConfig {
        attempts: 3,
        prepare_secs: 2.0,
        act_secs: 5.0,
        relax_secs: 5.0,
    });
    s.start(secs(100.0));

    let p = s.phase(secs(101.0));
    assert_eq!(p.phase, Phase::Prepare);
    assert!((p.seconds_left.unwrap() - 1.0).abs() < 1e-9);

    // 6 s in is one second before the end of the act phase
    let p = s.phase(secs(106.0));
    assert_eq!(p.phase, Phase::Act);
    assert!((p.seconds_left.unwrap() - 1.0).abs() < 1e-9);

    let p = s.phase(secs(111.0));
    assert_eq!(p.phase, Phase::Relax);
    assert!((p.seconds_left.unwrap() - 1.0).abs() < 1e-9);

    assert_eq!(s.phase(secs(136.0)).phase, Phase::NotRunning);
    assert_eq!(s.phase(secs(1000.0)).phase, Phase::NotRunning);
}

#[test]
fn manual_jump_rejected_on_restricted_tile() {
    let mut e = engine_with(PhysicsConfig::default());
    e.start();
    assert!(e.level().is_restricted(e.current_tile()));
    let vy = e.player().vy();
    assert_eq!(e.manual_jump(secs(1.0)), Err(JumpRejection::RestrictedTile));
    assert_eq!(e.player().vy(), vy);
    assert!(!e.player().is_airborne());
}

#[test]
fn manual_jump_waits_out_the_hit_penalty() {
    // isolate the penalty check from the restricted tiles around the obstacle
    let mut physics = PhysicsConfig::default();
    physics.jump.manual.respect_restricted_tiles = false;
    assert_eq!(physics.hit_penalty_secs, 3.0);
    let mut e = engine_with(physics);
    e.start();

    let mut hit_at = None;
    for i in 0..600 {
        let now = secs(i as f64 / 60.0);
        if e.step(None, now).hit.is_some() {
            hit_at = Some(now);
            break;
        }
    }
    let hit_at = hit_at.expect("player walks into the first obstacle");
    assert_eq!(e.hits(), 1);

    assert_eq!(
        e.manual_jump(hit_at + secs(1.0)),
        Err(JumpRejection::Penalty)
    );
    assert_eq!(e.player().vy(), 0.0);
    assert_eq!(e.manual_jump(hit_at + secs(3.1)), Ok(()));
    assert!(e.player().vy() < 0.0);
}

#[test]
fn score_buckets_are_strict() {
    let s = Score::from_counts(5, 1);
    assert_eq!(s.avoided, 4);
    assert_eq!(s.stars, 2);
    assert_eq!(Score::from_counts(5, 0).stars, 3);
    assert_eq!(Score::from_counts(10, 1).stars, 2);
    assert_eq!(Score::from_counts(4, 2).stars, 1);
    assert_eq!(Score::from_counts(20, 1).stars, 3);
}

#[test]
fn player_never_ends_a_tick_below_ground() {
    let mut e = engine_with(PhysicsConfig::default());
    e.start();
    e.set_threshold(Some(10.0));
    let mut rng = StdRng::seed_from_u64(42);
    for i in 0..3000 {
        let now = secs(i as f64 / 60.0);
        if rng.random_bool(0.05) {
            let _ = e.manual_jump(now);
        }
        let sample = rng.random_range(0.0..20.0);
        e.step(Some(sample), now);
        assert!(e.player().y() <= e.player().ground());
    }
    // each obstacle is passed well within the amnesty window
    assert!(e.hits() <= 3);
}
