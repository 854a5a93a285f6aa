//! Scene behaviour driven through the public API only.

use std::cell::Cell;
use std::rc::Rc;

use flurry::pile::{HeightField, DEPOSIT_PEAK, MELT_EPSILON, SPLAT_RADIUS};
use flurry::scene::{
    SceneConfig, SceneState, SimulationScene, DEFAULT_SESSION_ID, MELT_FACTOR, SESSION_FADE_DURATION,
};

const TICK: f32 = 1.0 / 60.0;

fn scene() -> SimulationScene {
    SimulationScene::new(SceneConfig {
        width: 320.0,
        height: 180.0,
        seed: Some(3),
        ..SceneConfig::default()
    })
}

#[test]
fn test_splat_scenario_at_x_50() {
    let mut field = HeightField::new(200.0, 40.0, 4.0);
    field.deposit(50.0, DEPOSIT_PEAK, Some(0));

    for (i, height) in field.heights().iter().enumerate() {
        let distance = (field.column_x(i) - 50.0).abs();
        if distance <= SPLAT_RADIUS {
            let expected =
                DEPOSIT_PEAK * (distance / SPLAT_RADIUS * std::f32::consts::FRAC_PI_2).cos();
            assert!((height - expected).abs() < 1e-5, "column {i}");
        } else {
            assert_eq!(*height, 0.0, "column {i}");
        }
    }
}

#[test]
fn test_heights_stay_in_bounds_under_random_deposits() {
    let mut field = HeightField::new(120.0, 6.0, 3.0);
    let mut x = 7.0_f32;
    for step in 0..2_000 {
        x = (x * 13.0 + 17.0) % 140.0 - 10.0;
        field.deposit(x, DEPOSIT_PEAK, Some(step % 3));
        if step % 50 == 0 {
            field.smooth();
        }
        assert!(field
            .heights()
            .iter()
            .all(|h| *h >= 0.0 && *h <= field.max_height()));
    }
}

#[test]
fn test_full_lifecycle_completes_once() {
    let mut scene = scene();
    let completions = Rc::new(Cell::new(0));
    let seen = Rc::clone(&completions);
    scene.on_complete(move || seen.set(seen.get() + 1));

    scene.add_session(DEFAULT_SESSION_ID, None).unwrap();
    scene.add_session("guest", None).unwrap();

    let mut ticks = 0;
    while scene.height_field().total_height() == 0.0 {
        scene.update(TICK);
        ticks += 1;
        assert!(ticks < 1_200, "nothing landed");
    }

    // Force the pile to its cap; the next tick must wind down.
    while !scene.height_field().is_capped() {
        scene.height_field_mut().deposit(160.0, DEPOSIT_PEAK, Some(1));
    }
    scene.update(TICK);
    assert_eq!(scene.state(), SceneState::WindingDown);

    let mut ticks = 0;
    while !scene.is_completed() {
        scene.update(TICK);
        ticks += 1;
        assert!(ticks < 600, "melt never finished");
    }
    for _ in 0..120 {
        scene.update(TICK);
    }
    assert_eq!(completions.get(), 1);
    assert_eq!(scene.session_count(), 0);
    assert_eq!(scene.frame().opacity, 0.0);
}

#[test]
fn test_melt_converges_below_epsilon() {
    let mut field = HeightField::new(100.0, 20.0, 2.0);
    for x in [10.0, 50.0, 90.0] {
        field.deposit(x, DEPOSIT_PEAK, None);
    }
    let mut rounds = 0;
    while !field.melt(MELT_FACTOR) {
        rounds += 1;
        assert!(rounds < 1_000);
    }
    assert!(field.average_height() < MELT_EPSILON);
}

#[test]
fn test_guest_leaves_without_stopping_scene() {
    let mut scene = scene();
    scene.add_session(DEFAULT_SESSION_ID, None).unwrap();
    scene.add_session("guest", None).unwrap();

    assert!(scene.remove_session("guest"));
    let ticks = ((SESSION_FADE_DURATION + 0.5) / TICK) as usize;
    for _ in 0..ticks {
        scene.update(TICK);
    }
    assert!(scene.session("guest").is_none());
    assert_eq!(scene.state(), SceneState::Active);
    assert_eq!(scene.add_session("next", None).unwrap(), 1);
}
