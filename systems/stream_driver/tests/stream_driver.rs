use proptest::prelude::*;
use runway_system_stream_driver::{DriverConfig, DriverState, SpawnDecision, StreamDriver};

fn driver() -> StreamDriver {
    StreamDriver::new(DriverConfig::new(10.0, 15.0, 10.0))
}

#[test]
fn idle_driver_never_requests_spawns() {
    let driver = driver();
    assert_eq!(driver.state(), DriverState::Idle);
    for reference in [-100.0, 0.0, 1.0e6] {
        assert_eq!(driver.tick(reference), SpawnDecision::Hold);
    }
}

#[test]
fn start_places_frontier_behind_reference() {
    let mut driver = driver();
    driver.start(4.0);
    assert!(driver.is_streaming());
    assert!((driver.frontier() - -6.0).abs() < f32::EPSILON);
}

#[test]
fn negative_lookback_starts_frontier_ahead() {
    let mut driver = StreamDriver::new(DriverConfig::new(-10.0, 15.0, 5.0));
    driver.start(0.0);
    assert_eq!(driver.tick(0.0), SpawnDecision::SpawnAt { frontier: 10.0 });
    let _ = driver.advance(5.0);
    assert_eq!(driver.tick(0.0), SpawnDecision::Hold, "15 is not beyond 0 + 15");
}

#[test]
fn spawns_until_window_is_populated() {
    let mut driver = driver();
    driver.start(0.0);

    let mut spawned = Vec::new();
    while let SpawnDecision::SpawnAt { frontier } = driver.tick(0.0) {
        spawned.push(frontier);
        let _ = driver.advance(10.0);
    }

    assert_eq!(spawned, vec![-10.0, 0.0, 10.0]);
    assert!((driver.frontier() - 20.0).abs() < f32::EPSILON);
}

#[test]
fn stop_turns_ticks_into_no_ops() {
    let mut driver = driver();
    driver.start(0.0);
    driver.stop();
    assert_eq!(driver.state(), DriverState::Idle);
    assert_eq!(driver.tick(100.0), SpawnDecision::Hold);
}

#[test]
fn rewind_keeps_state() {
    let mut driver = driver();
    driver.rewind(30.0);
    assert_eq!(driver.state(), DriverState::Idle);
    assert!((driver.frontier() - 20.0).abs() < f32::EPSILON);
}

#[test]
fn stale_boundary_is_strict() {
    let driver = driver();
    assert!(!driver.is_stale(0.0, 10.0, 20.0), "ends exactly on the horizon");
    assert!(driver.is_stale(0.0, 9.5, 20.0));
    assert!(!driver.is_stale(0.0, 10.5, 20.0));
}

proptest! {
    #[test]
    fn frontier_never_decreases(
        start in -100.0f32..100.0,
        steps in prop::collection::vec((0.0f32..5.0, -5.0f32..20.0), 1..64),
    ) {
        let mut driver = driver();
        driver.start(start);
        let mut reference = start;
        let mut previous = driver.frontier();

        for (forward, extent) in steps {
            reference += forward;
            if let SpawnDecision::SpawnAt { frontier } = driver.tick(reference) {
                prop_assert!((frontier - driver.frontier()).abs() < f32::EPSILON);
                let _ = driver.advance(extent);
            }
            prop_assert!(driver.frontier() >= previous);
            previous = driver.frontier();
        }
    }

    #[test]
    fn stale_matches_strict_inequality(
        position in -50.0f32..50.0,
        extent in 0.0f32..20.0,
        reference in -50.0f32..50.0,
    ) {
        let driver = driver();
        prop_assert_eq!(
            driver.is_stale(position, extent, reference),
            position + extent < reference - 10.0
        );
    }
}
