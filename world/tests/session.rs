use std::{cell::Cell, rc::Rc, time::Duration};

use proptest::prelude::*;
use runway_core::{Command, Event, PoolTag, StreamKind};
use runway_pool::PropTemplate;
use runway_world::{apply, query, Runner, RunnerConfig, Session, Settings, SettingsError};

type Shared = Rc<Cell<f32>>;

fn session(settings: Settings) -> (Session<Shared>, Shared) {
    let reference = Rc::new(Cell::new(0.0));
    let session = Session::new(settings, Rc::clone(&reference)).expect("valid settings");
    (session, reference)
}

fn origins(session: &Session<Shared>) -> Vec<f32> {
    query::tiles(session).iter().map(|tile| tile.origin).collect()
}

#[test]
fn invalid_settings_are_rejected() {
    let mut settings = Settings::default();
    settings.content.lanes = 0;
    let result = Session::new(settings, 0.0_f32);
    assert!(matches!(result, Err(SettingsError::ZeroLanes)));
}

#[test]
fn idle_session_only_advances_time() {
    let (mut session, _) = session(Settings::default());
    let mut events = Vec::new();
    apply(
        &mut session,
        Command::Tick {
            dt: Duration::from_millis(16),
        },
        &mut events,
    );

    assert_eq!(
        events,
        vec![Event::TimeAdvanced {
            dt: Duration::from_millis(16)
        }]
    );
    assert_eq!(query::tick_index(&session), 1);
    assert!(query::tiles(&session).is_empty());
}

#[test]
fn start_streaming_seeds_background_and_content() {
    let (mut session, _) = session(Settings::default());
    let mut events = Vec::new();

    apply(&mut session, Command::StartStreaming, &mut events);
    assert!(query::is_streaming(&session));
    assert_eq!(origins(&session), vec![-10.0, 0.0, 10.0]);
    assert_eq!(
        events.last(),
        Some(&Event::StreamingStarted { reference: 0.0 })
    );

    events.clear();
    apply(
        &mut session,
        Command::Tick {
            dt: Duration::from_millis(16),
        },
        &mut events,
    );
    assert!(!query::content(&session).is_empty());
    assert!(query::content(&session)
        .iter()
        .all(|record| record.position.y >= 10.0));
    assert!(events.iter().any(|event| matches!(
        event,
        Event::EntitySpawned {
            stream: StreamKind::Obstacle | StreamKind::Coin,
            ..
        }
    )));

    events.clear();
    apply(&mut session, Command::StartStreaming, &mut events);
    assert!(events.is_empty(), "second start is a no-op");
}

#[test]
fn stop_streaming_freezes_content() {
    let (mut session, reference) = session(Settings::default());
    let mut events = Vec::new();
    session.start_streaming(&mut events);
    session.tick(Duration::from_millis(16), &mut events);
    let tracked = query::content(&session).len();

    session.stop_streaming(&mut events);
    assert_eq!(events.last(), Some(&Event::StreamingStopped));

    reference.set(500.0);
    events.clear();
    session.tick(Duration::from_secs(60), &mut events);
    assert_eq!(events.len(), 1);
    assert_eq!(query::content(&session).len(), tracked);
}

#[test]
fn difficulty_rises_once_per_interval() {
    let (mut session, _) = session(Settings::default());
    let mut events = Vec::new();
    session.start_streaming(&mut events);

    events.clear();
    session.tick(Duration::from_secs(10), &mut events);
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::DifficultyIncreased { .. })));

    session.tick(Duration::from_secs(5), &mut events);
    let increases: Vec<f32> = events
        .iter()
        .filter_map(|event| match event {
            Event::DifficultyIncreased { spawn_interval } => Some(*spawn_interval),
            _ => None,
        })
        .collect();
    assert_eq!(increases.len(), 1);
    assert!((increases[0] - 5.0 / 1.1).abs() < 1.0e-5);
    assert!((query::spawn_interval(&session) - 5.0 / 1.1).abs() < 1.0e-5);
}

#[test]
fn difficulty_at_the_floor_is_silent() {
    let (mut session, _) = session(Settings::default());
    let mut events = Vec::new();
    for _ in 0..30 {
        session.increase_difficulty(2.0, &mut events);
    }
    assert!((query::spawn_interval(&session) - 2.0).abs() < f32::EPSILON);
    assert_eq!(events.len(), 2, "5 -> 2.5 -> 2 then floor");
}

#[test]
fn enormous_ticks_stop_raising_difficulty_at_the_floor() {
    let (mut session, _) = session(Settings::default());
    let mut events = Vec::new();
    session.start_streaming(&mut events);

    events.clear();
    session.tick(Duration::MAX, &mut events);
    let increases = events
        .iter()
        .filter(|event| matches!(event, Event::DifficultyIncreased { .. }))
        .count();
    assert!((query::spawn_interval(&session) - 2.0).abs() < f32::EPSILON);
    assert!(increases < 16);
}

#[test]
fn reset_all_restores_tuning_and_reseeds_background() {
    let (mut session, reference) = session(Settings::default());
    let mut events = Vec::new();
    session.start_streaming(&mut events);
    session.tick(Duration::from_millis(16), &mut events);
    session.increase_difficulty(1.5, &mut events);

    reference.set(100.0);
    apply(&mut session, Command::ResetAll, &mut events);
    assert!((query::spawn_interval(&session) - 5.0).abs() < f32::EPSILON);
    assert!(query::content(&session).is_empty());
    assert_eq!(origins(&session), vec![90.0, 100.0, 110.0]);
    assert!(query::is_streaming(&session));

    session.tick(Duration::from_millis(16), &mut events);
    assert!(query::content(&session)
        .iter()
        .all(|record| record.position.y >= 110.0));
}

#[test]
fn clear_all_destroys_pooled_instances() {
    let (mut session, _) = session(Settings::default());
    let mut events = Vec::new();
    session.start_streaming(&mut events);
    session.tick(Duration::from_millis(16), &mut events);

    apply(&mut session, Command::ClearAll, &mut events);
    assert!(query::tiles(&session).is_empty());
    assert!(query::content(&session).is_empty());
    assert_eq!(query::free_count(&session, &PoolTag::new("grass")), 0);
    assert_eq!(query::free_count(&session, &PoolTag::new("coin")), 0);
    assert!(query::background_pool_stats(&session).destroyed >= 3);
    assert!(query::content_pool_stats(&session).destroyed >= 10);
}

#[test]
fn clear_all_stops_streaming_until_restarted() {
    let (mut session, reference) = session(Settings::default());
    let mut events = Vec::new();
    session.start_streaming(&mut events);
    session.tick(Duration::from_millis(16), &mut events);

    events.clear();
    session.clear_all(&mut events);
    assert_eq!(events.first(), Some(&Event::StreamingStopped));
    assert!(!query::is_streaming(&session));

    for step in 0..5 {
        reference.set(step as f32);
        events.clear();
        session.tick(Duration::from_millis(16), &mut events);
        assert_eq!(events.len(), 1);
        assert!(query::tiles(&session).is_empty());
    }

    session.start_streaming(&mut events);
    assert_eq!(origins(&session), vec![-6.0, 4.0, 14.0]);
    session.tick(Duration::from_millis(16), &mut events);
    let tiles = query::tiles(&session);
    let last = tiles.last().expect("tiles present");
    assert!(tiles[0].origin <= 4.0 - 10.0);
    assert!(last.origin + last.extent >= 4.0 + 15.0);
    assert!(!query::content(&session).is_empty());
}

#[test]
fn background_selection_promotes_known_and_replaces_unknown() {
    let mut settings = Settings::default();
    settings.backgrounds = vec![PoolTag::new("grass"), PoolTag::new("sand")];
    let (mut session, _) = session(settings);
    let mut events = Vec::new();

    apply(
        &mut session,
        Command::SetActiveBackground {
            tag: PoolTag::new("sand"),
        },
        &mut events,
    );
    assert_eq!(
        query::background_candidates(&session),
        &[PoolTag::new("sand"), PoolTag::new("grass")]
    );
    assert_eq!(
        events,
        vec![Event::BackgroundTemplateChanged {
            tag: PoolTag::new("sand"),
            candidates: 2,
        }]
    );

    events.clear();
    session.set_active_background_template(PoolTag::new("sand"), &mut events);
    assert!(events.is_empty());

    session.register_template(PoolTag::new("snow"), Rc::new(PropTemplate::new(Some(5.0))));
    session.set_active_background_template(PoolTag::new("snow"), &mut events);
    assert_eq!(
        query::background_candidates(&session),
        &[PoolTag::new("snow")]
    );

    session.start_streaming(&mut events);
    assert_eq!(origins(&session), vec![-10.0, -5.0, 0.0]);
    assert_eq!(query::active_background(&session), Some(&PoolTag::new("snow")));
}

#[test]
fn runner_driven_run_keeps_streams_bounded() {
    let settings = Settings::default();
    let runner = Runner::new(settings.runner, 0.0);
    let mut session = Session::new(settings, runner).expect("valid settings");
    let mut events = Vec::new();
    session.start_streaming(&mut events);

    let dt = Duration::from_millis(50);
    for _ in 0..2_000 {
        let _ = session.source_mut().advance(dt);
        events.clear();
        apply(&mut session, Command::Tick { dt }, &mut events);

        let reference = query::reference(&session);
        let tiles = query::tiles(&session);
        let last = tiles.last().expect("tiles present");
        assert!(last.origin + last.extent >= reference + 15.0);
        assert!(tiles
            .iter()
            .all(|tile| tile.origin + tile.extent >= reference - 10.0));
        assert!(query::content(&session)
            .iter()
            .all(|record| record.position.y >= reference - 5.0));
    }

    assert!(query::spawn_interval(&session) < 5.0);
    assert!(query::tiles(&session).len() <= 6);
}

#[test]
fn identical_seeds_produce_identical_runs() {
    let run = |seed: u64| {
        let settings = Settings {
            seed,
            ..Settings::default()
        };
        let (mut session, reference) = session(settings);
        let mut events = Vec::new();
        session.start_streaming(&mut events);
        for step in 0..200 {
            reference.set(step as f32 * 0.8);
            session.tick(Duration::from_millis(50), &mut events);
        }
        events
    };

    assert_eq!(run(7), run(7));
    assert_ne!(run(7), run(8));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn tiles_cover_the_window_at_any_runner_speed(
        start_speed in 0.0f32..60.0,
        boost in 0.0f32..40.0,
        acceleration in 0.0f32..5.0,
        seed in any::<u64>(),
    ) {
        let settings = Settings {
            seed,
            runner: RunnerConfig {
                start_speed,
                max_speed: start_speed + boost,
                acceleration,
            },
            ..Settings::default()
        };
        let runner = Runner::new(settings.runner, 0.0);
        let mut session = Session::new(settings, runner).expect("valid settings");
        let mut events = Vec::new();
        session.start_streaming(&mut events);

        let dt = Duration::from_millis(50);
        for _ in 0..300 {
            let _ = session.source_mut().advance(dt);
            events.clear();
            session.tick(dt, &mut events);

            let reference = query::reference(&session);
            let tiles = query::tiles(&session);
            let last = tiles.last().expect("tiles present");
            prop_assert!(last.origin + last.extent >= reference + 15.0);
            prop_assert!(tiles[0].origin <= reference - 10.0 + 1.0e-3);
            for pair in tiles.windows(2) {
                prop_assert!((pair[0].origin + pair[0].extent - pair[1].origin).abs() < 1.0e-3);
            }
            prop_assert!(query::content(&session)
                .iter()
                .all(|record| record.position.y >= reference - 5.0));
        }
    }
}
