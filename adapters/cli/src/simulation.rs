use std::{collections::HashMap, fmt, time::Duration};

use anyhow::{Context, Result};
use runway_core::{Command, Event, PoolTag, StreamKind};
use runway_pool::PoolStats;
use runway_world::{apply, query, Runner, Session, Settings};

const STREAMS: [(StreamKind, &str); 4] = [
    (StreamKind::Background, "background"),
    (StreamKind::Decoration, "decoration"),
    (StreamKind::Obstacle, "obstacle"),
    (StreamKind::Coin, "coin"),
];

/// Length and granularity of a simulated run.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Plan {
    duration: Duration,
    dt: Duration,
}

impl Plan {
    pub(crate) const fn new(duration: Duration, dt: Duration) -> Self {
        Self { duration, dt }
    }

    /// Whole ticks that fit into the duration.
    pub(crate) fn ticks(&self) -> u64 {
        if self.dt.is_zero() {
            return 0;
        }
        u64::try_from(self.duration.as_nanos() / self.dt.as_nanos()).unwrap_or(u64::MAX)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct StreamCounts {
    spawned: u64,
    retired: u64,
    failed: u64,
    diagnostics: u64,
}

#[derive(Debug, Default)]
struct Tally {
    streams: HashMap<StreamKind, StreamCounts>,
    difficulty_increases: u32,
}

impl Tally {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::EntitySpawned { stream, .. } => self.counts(*stream).spawned += 1,
                Event::EntityRetired { stream, .. } => self.counts(*stream).retired += 1,
                Event::SpawnFailed { stream, .. } => self.counts(*stream).failed += 1,
                Event::PoolDiagnostic { stream, .. } => self.counts(*stream).diagnostics += 1,
                Event::DifficultyIncreased { .. } => self.difficulty_increases += 1,
                _ => {}
            }
        }
    }

    fn counts(&mut self, stream: StreamKind) -> &mut StreamCounts {
        self.streams.entry(stream).or_default()
    }
}

/// Outcome of a simulated run.
#[derive(Debug)]
pub(crate) struct Summary {
    ticks: u64,
    simulated: Duration,
    distance: f32,
    speed: f32,
    spawn_interval: f32,
    active_background: Option<PoolTag>,
    tally: Tally,
    background_pool: PoolStats,
    content_pool: PoolStats,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "simulated {:.2}s in {} ticks",
            self.simulated.as_secs_f32(),
            self.ticks
        )?;
        writeln!(
            f,
            "distance {:.1}, speed {:.2}, spawn interval {:.2} after {} difficulty increases",
            self.distance, self.speed, self.spawn_interval, self.tally.difficulty_increases
        )?;
        if let Some(tag) = &self.active_background {
            writeln!(f, "background template: {tag}")?;
        }
        for (stream, label) in STREAMS {
            let counts = self.tally.streams.get(&stream).copied().unwrap_or_default();
            writeln!(
                f,
                "{label:>10}: spawned {}, retired {}, failed {}, diagnostics {}",
                counts.spawned, counts.retired, counts.failed, counts.diagnostics
            )?;
        }
        write_pool(f, "background pool", &self.background_pool)?;
        write_pool(f, "content pool", &self.content_pool)
    }
}

fn write_pool(f: &mut fmt::Formatter<'_>, label: &str, stats: &PoolStats) -> fmt::Result {
    writeln!(
        f,
        "{label}: instantiated {}, expansions {}, spawned {}, released {}, destroyed {}, null references {}, unknown tags {}",
        stats.instantiated,
        stats.expansions,
        stats.spawned,
        stats.released,
        stats.destroyed,
        stats.null_references,
        stats.unknown_tags
    )
}

/// Streams a runner-driven session for the planned duration.
pub(crate) fn run(settings: Settings, background: Option<PoolTag>, plan: Plan) -> Result<Summary> {
    let runner = Runner::new(settings.runner, 0.0);
    let mut session = Session::new(settings, runner).context("settings rejected by session")?;
    let mut events = Vec::new();
    let mut tally = Tally::default();

    if let Some(tag) = background {
        apply(&mut session, Command::SetActiveBackground { tag }, &mut events);
    }
    apply(&mut session, Command::StartStreaming, &mut events);
    tally.record(&events);

    let ticks = plan.ticks();
    for _ in 0..ticks {
        events.clear();
        let _ = session.source_mut().advance(plan.dt);
        apply(&mut session, Command::Tick { dt: plan.dt }, &mut events);
        tally.record(&events);
    }

    events.clear();
    apply(&mut session, Command::StopStreaming, &mut events);

    Ok(Summary {
        ticks,
        simulated: plan.dt.saturating_mul(u32::try_from(ticks).unwrap_or(u32::MAX)),
        distance: session.source().position(),
        speed: session.source().speed(),
        spawn_interval: query::spawn_interval(&session),
        active_background: query::active_background(&session).cloned(),
        tally,
        background_pool: query::background_pool_stats(&session),
        content_pool: query::content_pool_stats(&session),
    })
}
