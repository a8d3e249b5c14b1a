#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Session orchestration for the Runway content streaming engine.
//!
//! A [`Session`] owns one background streamer and one content spawner, each
//! with its own entity pool, and drives both from a shared
//! [`ReferenceSource`]. Hosts either call the session methods directly or
//! submit [`Command`] values through [`apply`].

mod difficulty;
mod runner;
mod settings;

use std::{rc::Rc, time::Duration};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use runway_core::{Command, Event, PoolTag, ReferenceSource};
use runway_pool::{EntityPool, Prop, Template};
use runway_system_background::{BackgroundStreamer, TemplateSelection};
use runway_system_content::ContentSpawner;
use tracing::{debug, info};

use crate::difficulty::DifficultyClock;
pub use crate::runner::Runner;
pub use crate::settings::{
    DifficultyConfig, RunnerConfig, Settings, SettingsError, DEFAULT_SEED,
};

/// Streaming session driven by a reference position source.
#[derive(Debug)]
pub struct Session<S> {
    settings: Settings,
    source: S,
    rng: ChaCha8Rng,
    background: BackgroundStreamer<Prop>,
    content: ContentSpawner<Prop>,
    difficulty: DifficultyClock,
    streaming: bool,
    tick_index: u64,
}

impl<S: ReferenceSource> Session<S> {
    /// Validates `settings` and builds an idle session reading `source`.
    ///
    /// Every template in the settings is registered with both pools; pools
    /// for the configured tags are pre-warmed.
    pub fn new(settings: Settings, source: S) -> Result<Self, SettingsError> {
        settings.validate()?;

        let background = BackgroundStreamer::new(
            settings.background.clone(),
            template_pool(&settings),
            settings.backgrounds.clone(),
            settings.decorations.clone(),
        );
        let content = ContentSpawner::new(
            settings.content.clone(),
            settings.catalog.clone(),
            template_pool(&settings),
        );
        let difficulty = DifficultyClock::new(settings.difficulty.interval().unwrap_or_default());
        info!(
            seed = settings.seed,
            templates = settings.templates.len(),
            "session initialized"
        );

        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(settings.seed),
            settings,
            source,
            background,
            content,
            difficulty,
            streaming: false,
            tick_index: 0,
        })
    }

    /// Starts both streams from the current reference position.
    ///
    /// The background is re-seeded around the reference; content starts
    /// `start_distance` ahead of it. Starting twice is a no-op.
    pub fn start_streaming(&mut self, out: &mut Vec<Event>) {
        if self.streaming {
            debug!("session already streaming");
            return;
        }

        let reference = self.source.reference_position();
        self.background.start(reference, &mut self.rng, out);
        self.content.start(reference);
        self.difficulty.reset();
        self.streaming = true;
        info!(reference, "streaming started");
        out.push(Event::StreamingStarted { reference });
    }

    /// Stops both streams; spawned entities stay until cleared.
    pub fn stop_streaming(&mut self, out: &mut Vec<Event>) {
        if !self.streaming {
            return;
        }

        self.background.stop();
        self.content.stop();
        self.streaming = false;
        info!("streaming stopped");
        out.push(Event::StreamingStopped);
    }

    /// Clears all content, restores the initial spawn interval, and re-seeds
    /// the background around the current reference.
    ///
    /// The streaming state is kept; a streaming session continues from the
    /// new reference.
    pub fn reset_all(&mut self, out: &mut Vec<Event>) {
        let reference = self.source.reference_position();
        let _ = self.content.clear_all(out);
        self.content.reset_difficulty();
        self.difficulty.reset();
        if self.streaming {
            self.content.start(reference);
        }
        self.background.reset_all(reference, &mut self.rng, out);
        info!(reference, streaming = self.streaming, "session reset");
    }

    /// Stops streaming, releases every tracked entity, and destroys every
    /// pooled instance.
    ///
    /// Templates stay registered, so later spawns rebuild pools lazily. A
    /// following [`Session::start_streaming`] re-seeds the background around
    /// the reference of that moment.
    pub fn clear_all(&mut self, out: &mut Vec<Event>) {
        self.stop_streaming(out);
        let content = self.content.clear_all(out);
        let tiles = self.background.clear_all(out);
        self.content.pool_mut().clear_all();
        self.background.pool_mut().clear_all();
        info!(content, tiles, "session cleared");
    }

    /// Tightens the content spawn interval by `multiplier`.
    pub fn increase_difficulty(&mut self, multiplier: f32, out: &mut Vec<Event>) {
        let before = self.content.spawn_interval();
        let spawn_interval = self.content.increase_difficulty(multiplier);
        if spawn_interval < before {
            out.push(Event::DifficultyIncreased { spawn_interval });
        }
    }

    /// Selects the background tile template used for new tiles.
    pub fn set_active_background_template(&mut self, tag: PoolTag, out: &mut Vec<Event>) {
        let selection = self.background.set_active_template(tag.clone());
        if selection != TemplateSelection::Unchanged {
            out.push(Event::BackgroundTemplateChanged {
                tag,
                candidates: self.background.candidates().len(),
            });
        }
    }

    /// Registers a template with both pools so it can be selected later.
    pub fn register_template(&mut self, tag: PoolTag, template: Rc<dyn Template<Prop>>) {
        self.content
            .pool_mut()
            .register_template(tag.clone(), Rc::clone(&template));
        self.background.register_template(tag, template);
    }

    /// Advances the session by `dt`, streaming against the current reference.
    pub fn tick(&mut self, dt: Duration, out: &mut Vec<Event>) {
        self.tick_index = self.tick_index.saturating_add(1);
        out.push(Event::TimeAdvanced { dt });
        if !self.streaming {
            return;
        }

        let reference = self.source.reference_position();
        self.background.tick(reference, &mut self.rng, out);
        self.content.tick(reference, &mut self.rng, out);

        let multiplier = self.settings.difficulty.multiplier;
        for _ in 0..self.difficulty.advance(dt) {
            let before = self.content.spawn_interval();
            self.increase_difficulty(multiplier, out);
            if self.content.spawn_interval() >= before {
                break;
            }
        }
    }

    /// Reference source the session reads.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Mutable access to the reference source, e.g. to move the runner.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

/// Applies the provided command to the session.
pub fn apply<S: ReferenceSource>(
    session: &mut Session<S>,
    command: Command,
    out_events: &mut Vec<Event>,
) {
    match command {
        Command::StartStreaming => session.start_streaming(out_events),
        Command::StopStreaming => session.stop_streaming(out_events),
        Command::ResetAll => session.reset_all(out_events),
        Command::ClearAll => session.clear_all(out_events),
        Command::IncreaseDifficulty { multiplier } => {
            session.increase_difficulty(multiplier, out_events)
        }
        Command::SetActiveBackground { tag } => {
            session.set_active_background_template(tag, out_events)
        }
        Command::Tick { dt } => session.tick(dt, out_events),
    }
}

fn template_pool(settings: &Settings) -> EntityPool<Prop> {
    let mut pool = EntityPool::new();
    for (tag, template) in &settings.templates {
        pool.register_template(tag.clone(), Rc::new(*template));
    }
    pool
}

/// Query functions that provide read-only access to the session state.
pub mod query {
    use runway_core::{PoolTag, ReferenceSource};
    use runway_pool::PoolStats;
    use runway_system_background::TileRecord;
    use runway_system_content::ActiveEntityRecord;

    use super::{Session, Settings};

    /// Settings the session was built from.
    #[must_use]
    pub fn settings<S>(session: &Session<S>) -> &Settings {
        &session.settings
    }

    /// Reports whether the session is streaming.
    #[must_use]
    pub fn is_streaming<S>(session: &Session<S>) -> bool {
        session.streaming
    }

    /// Number of ticks processed so far.
    #[must_use]
    pub fn tick_index<S>(session: &Session<S>) -> u64 {
        session.tick_index
    }

    /// Current reference position.
    #[must_use]
    pub fn reference<S: ReferenceSource>(session: &Session<S>) -> f32 {
        session.source.reference_position()
    }

    /// Forward distance between content spawn events.
    #[must_use]
    pub fn spawn_interval<S>(session: &Session<S>) -> f32 {
        session.content.spawn_interval()
    }

    /// Background tiles currently laid down, oldest first.
    #[must_use]
    pub fn tiles<S>(session: &Session<S>) -> &[TileRecord] {
        session.background.tiles()
    }

    /// Obstacles and coins currently tracked, in spawn order.
    #[must_use]
    pub fn content<S>(session: &Session<S>) -> &[ActiveEntityRecord] {
        session.content.active()
    }

    /// Background tile template used for new tiles.
    #[must_use]
    pub fn active_background<S>(session: &Session<S>) -> Option<&PoolTag> {
        session.background.active_template()
    }

    /// Background tile candidates, active first.
    #[must_use]
    pub fn background_candidates<S>(session: &Session<S>) -> &[PoolTag] {
        session.background.candidates()
    }

    /// Counters of the background pool.
    #[must_use]
    pub fn background_pool_stats<S>(session: &Session<S>) -> PoolStats {
        session.background.pool().stats()
    }

    /// Counters of the content pool.
    #[must_use]
    pub fn content_pool_stats<S>(session: &Session<S>) -> PoolStats {
        session.content.pool().stats()
    }

    /// Free entities queued for `tag` in whichever pool holds them.
    #[must_use]
    pub fn free_count<S>(session: &Session<S>, tag: &PoolTag) -> usize {
        session.background.pool().free_count(tag) + session.content.pool().free_count(tag)
    }
}
