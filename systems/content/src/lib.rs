#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Lane-based obstacle and coin spawning system.
//!
//! Each spawn event is anchored at the driver frontier. A weighted coin flip
//! chooses between the coin and obstacle branches, a pattern is picked
//! uniformly from the enabled patterns of that branch, and the pattern's
//! placements are turned into pooled entities. The frontier then moves
//! forward by the current spawn interval, which difficulty increases tighten.

mod lanes;
mod patterns;

use std::mem;

use rand::{seq::SliceRandom, Rng};
use runway_core::{ContentCategory, EntityHandle, Event, PoolTag, SpawnError, StreamKind, Vec2};
use runway_pool::{EntityPool, Poolable, Release};
use runway_system_stream_driver::{DriverConfig, SpawnDecision, StreamDriver};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use lanes::LaneLayout;
pub use patterns::{gapped_wall, CoinPattern, ObstaclePattern, Placement};

/// Obstacle categories a placement draws from, in selection order.
pub const OBSTACLE_CATEGORIES: [ContentCategory; 3] = [
    ContentCategory::Jumpable,
    ContentCategory::Slideable,
    ContentCategory::Avoidable,
];

/// Tuning knobs for lane content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of lateral lanes.
    pub lanes: u32,
    /// Lateral distance between neighbouring lanes.
    pub lane_width: f32,
    /// Probability that a spawn event places coins instead of obstacles.
    pub coin_chance: f32,
    /// Forward distance between spawn events before any difficulty increase.
    pub initial_spawn_interval: f32,
    /// Floor the spawn interval never drops below.
    pub min_spawn_interval: f32,
    /// Distance ahead of the reference where the first spawn event lands.
    pub start_distance: f32,
    /// Distance ahead of the reference that must stay populated.
    pub spawn_distance: f32,
    /// Distance behind the reference past which content is retired.
    pub despawn_distance: f32,
    /// Entities pre-instantiated per obstacle template.
    pub obstacle_pool_size: usize,
    /// Entities pre-instantiated per coin template.
    pub coin_pool_size: usize,
    /// Coin patterns the spawner picks from.
    pub coin_patterns: Vec<CoinPattern>,
    /// Obstacle patterns the spawner picks from.
    pub obstacle_patterns: Vec<ObstaclePattern>,
    /// Upper bound on spawn events handled by a single tick.
    pub max_spawns_per_tick: usize,
}

impl Config {
    /// Driver window derived from the start, spawn, and despawn distances.
    #[must_use]
    pub fn driver(&self) -> DriverConfig {
        DriverConfig::new(
            -self.start_distance,
            self.spawn_distance,
            self.despawn_distance,
        )
    }

    /// Lane layout derived from the lane count and width.
    #[must_use]
    pub fn layout(&self) -> LaneLayout {
        LaneLayout::new(self.lanes, self.lane_width)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lanes: 3,
            lane_width: 1.5,
            coin_chance: 0.3,
            initial_spawn_interval: 5.0,
            min_spawn_interval: 2.0,
            start_distance: 10.0,
            spawn_distance: 15.0,
            despawn_distance: 5.0,
            obstacle_pool_size: 3,
            coin_pool_size: 10,
            coin_patterns: CoinPattern::ALL.to_vec(),
            obstacle_patterns: ObstaclePattern::ALL.to_vec(),
            max_spawns_per_tick: 8,
        }
    }
}

/// Template tags available to the spawner, grouped by category.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentCatalog {
    /// Obstacles the player jumps over.
    pub jumpable: Vec<PoolTag>,
    /// Obstacles the player slides under.
    pub slideable: Vec<PoolTag>,
    /// Obstacles the player changes lane to avoid.
    pub avoidable: Vec<PoolTag>,
    /// Collectible coins.
    pub coins: Vec<PoolTag>,
}

impl ContentCatalog {
    /// Tags configured for `category`; categories the spawner does not use are empty.
    #[must_use]
    pub fn tags(&self, category: ContentCategory) -> &[PoolTag] {
        match category {
            ContentCategory::Jumpable => &self.jumpable,
            ContentCategory::Slideable => &self.slideable,
            ContentCategory::Avoidable => &self.avoidable,
            ContentCategory::Coin => &self.coins,
            ContentCategory::Tile | ContentCategory::Decoration => &[],
        }
    }

    /// Iterates over every obstacle tag.
    pub fn obstacles(&self) -> impl Iterator<Item = &PoolTag> {
        self.jumpable
            .iter()
            .chain(&self.slideable)
            .chain(&self.avoidable)
    }
}

/// Entity spawned by the content spawner and tracked until retirement.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveEntityRecord {
    /// Handle issued by the pool.
    pub handle: EntityHandle,
    /// Template the entity came from.
    pub tag: PoolTag,
    /// Position the entity was placed at.
    pub position: Vec2,
    /// Stream the entity belongs to.
    pub stream: StreamKind,
}

/// Places obstacles and coins in lanes ahead of the reference.
#[derive(Debug)]
pub struct ContentSpawner<E> {
    config: Config,
    layout: LaneLayout,
    catalog: ContentCatalog,
    driver: StreamDriver,
    pool: EntityPool<E>,
    spawn_interval: f32,
    active: Vec<ActiveEntityRecord>,
}

impl<E: Poolable> ContentSpawner<E> {
    /// Creates an idle spawner drawing from `pool`.
    ///
    /// Pools are pre-warmed for every catalogued tag whose template is
    /// registered with `pool`.
    #[must_use]
    pub fn new(config: Config, catalog: ContentCatalog, mut pool: EntityPool<E>) -> Self {
        for tag in catalog.obstacles() {
            prewarm(&mut pool, tag, config.obstacle_pool_size);
        }
        for tag in &catalog.coins {
            prewarm(&mut pool, tag, config.coin_pool_size);
        }

        Self {
            layout: config.layout(),
            driver: StreamDriver::new(config.driver()),
            spawn_interval: config.initial_spawn_interval,
            config,
            catalog,
            pool,
            active: Vec::new(),
        }
    }

    /// Starts streaming with the first spawn event `start_distance` ahead.
    pub fn start(&mut self, reference: f32) {
        self.driver.start(reference);
    }

    /// Stops streaming; tracked entities stay until cleared.
    pub fn stop(&mut self) {
        self.driver.stop();
    }

    /// Spawns patterns up to the window ahead and retires entities left behind.
    pub fn tick<R: Rng + ?Sized>(&mut self, reference: f32, rng: &mut R, out: &mut Vec<Event>) {
        if !self.driver.is_streaming() {
            return;
        }

        for _ in 0..self.config.max_spawns_per_tick.max(1) {
            match self.driver.tick(reference) {
                SpawnDecision::Hold => break,
                SpawnDecision::SpawnAt { frontier } => {
                    self.spawn_event(frontier, rng, out);
                    let _ = self.driver.advance(self.spawn_interval);
                }
            }
        }

        self.retire_stale(reference, out);
    }

    /// Releases every tracked entity regardless of position. Returns the
    /// number of entities released.
    pub fn clear_all(&mut self, out: &mut Vec<Event>) -> usize {
        let records = mem::take(&mut self.active);
        let released = records.len();
        for record in records {
            self.release(record, out);
        }
        info!(released, "content cleared");
        released
    }

    /// Divides the spawn interval by `multiplier`, never dropping below the
    /// configured floor and never loosening it. Returns the resulting interval.
    pub fn increase_difficulty(&mut self, multiplier: f32) -> f32 {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            warn!(multiplier, "ignored difficulty multiplier");
            return self.spawn_interval;
        }

        let tightened = (self.spawn_interval / multiplier).max(self.config.min_spawn_interval);
        self.spawn_interval = tightened.min(self.spawn_interval);
        info!(
            multiplier,
            spawn_interval = self.spawn_interval,
            "difficulty increased"
        );
        self.spawn_interval
    }

    /// Restores the initial spawn interval.
    pub fn reset_difficulty(&mut self) {
        self.spawn_interval = self.config.initial_spawn_interval;
        debug!(spawn_interval = self.spawn_interval, "difficulty reset");
    }

    /// Forward distance between consecutive spawn events.
    #[must_use]
    pub fn spawn_interval(&self) -> f32 {
        self.spawn_interval
    }

    /// Entities currently tracked, in spawn order.
    #[must_use]
    pub fn active(&self) -> &[ActiveEntityRecord] {
        &self.active
    }

    /// Lane layout used for placements.
    #[must_use]
    pub fn layout(&self) -> &LaneLayout {
        &self.layout
    }

    /// Tags the spawner draws from.
    #[must_use]
    pub fn catalog(&self) -> &ContentCatalog {
        &self.catalog
    }

    /// Driver tracking the spawn frontier.
    #[must_use]
    pub fn driver(&self) -> &StreamDriver {
        &self.driver
    }

    /// Pool owning every obstacle and coin.
    #[must_use]
    pub fn pool(&self) -> &EntityPool<E> {
        &self.pool
    }

    /// Mutable access to the pool, e.g. to destroy every pooled entity.
    pub fn pool_mut(&mut self) -> &mut EntityPool<E> {
        &mut self.pool
    }

    fn spawn_event<R: Rng + ?Sized>(&mut self, anchor: f32, rng: &mut R, out: &mut Vec<Event>) {
        let roll = rng.gen::<f32>();
        let anchor_lane = self.layout.random_lane(rng);

        if roll < self.config.coin_chance && !self.catalog.coins.is_empty() {
            if let Some(pattern) = self.config.coin_patterns.choose(rng).copied() {
                self.spawn_coins(pattern, anchor, anchor_lane, rng, out);
                return;
            }
        }

        let Some(pattern) = self.config.obstacle_patterns.choose(rng).copied() else {
            warn!("no obstacle patterns enabled");
            return;
        };
        self.spawn_obstacles(pattern, anchor, rng, out);
    }

    fn spawn_coins<R: Rng + ?Sized>(
        &mut self,
        pattern: CoinPattern,
        anchor: f32,
        anchor_lane: i32,
        rng: &mut R,
        out: &mut Vec<Event>,
    ) {
        let Some(tag) = self.catalog.coins.choose(rng).cloned() else {
            return;
        };
        let placements = pattern.placements(&self.layout, anchor_lane, rng);
        debug!(?pattern, %tag, anchor, count = placements.len(), "coin pattern");
        for placement in placements {
            self.place(StreamKind::Coin, &tag, anchor, placement, out);
        }
        self.report_diagnostics(StreamKind::Coin, out);
    }

    fn spawn_obstacles<R: Rng + ?Sized>(
        &mut self,
        pattern: ObstaclePattern,
        anchor: f32,
        rng: &mut R,
        out: &mut Vec<Event>,
    ) {
        let placements = pattern.placements(&self.layout, rng);
        debug!(?pattern, anchor, count = placements.len(), "obstacle pattern");
        for placement in placements {
            match self.pick_obstacle(rng) {
                Ok(tag) => self.place(StreamKind::Obstacle, &tag, anchor, placement, out),
                Err(error) => {
                    debug!(%error, lane = placement.lane, "obstacle placement skipped");
                    out.push(Event::SpawnFailed {
                        stream: StreamKind::Obstacle,
                        error,
                    });
                }
            }
        }
        self.report_diagnostics(StreamKind::Obstacle, out);
    }

    fn pick_obstacle<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<PoolTag, SpawnError> {
        let category = OBSTACLE_CATEGORIES[rng.gen_range(0..OBSTACLE_CATEGORIES.len())];
        self.catalog
            .tags(category)
            .choose(rng)
            .cloned()
            .ok_or(SpawnError::ConfigurationMissing(category))
    }

    fn place(
        &mut self,
        stream: StreamKind,
        tag: &PoolTag,
        anchor: f32,
        placement: Placement,
        out: &mut Vec<Event>,
    ) {
        let position = Vec2::new(
            self.layout.lateral(placement.lane),
            anchor + placement.forward,
        );
        match self.pool.spawn(tag, position, 0.0) {
            Ok(handle) => {
                self.active.push(ActiveEntityRecord {
                    handle,
                    tag: tag.clone(),
                    position,
                    stream,
                });
                out.push(Event::EntitySpawned {
                    stream,
                    handle,
                    tag: tag.clone(),
                    position,
                });
            }
            Err(error) => out.push(Event::SpawnFailed { stream, error }),
        }
    }

    fn retire_stale(&mut self, reference: f32, out: &mut Vec<Event>) {
        let (stale, kept): (Vec<_>, Vec<_>) = mem::take(&mut self.active)
            .into_iter()
            .partition(|record| self.driver.is_stale(record.position.y, 0.0, reference));
        self.active = kept;
        for record in stale {
            debug!(tag = %record.tag, forward = record.position.y, "content retired");
            self.release(record, out);
        }
    }

    fn release(&mut self, record: ActiveEntityRecord, out: &mut Vec<Event>) {
        match self.pool.release(record.handle) {
            Release::Pooled | Release::Destroyed => out.push(Event::EntityRetired {
                stream: record.stream,
                handle: record.handle,
                tag: record.tag,
            }),
            Release::Ignored => {
                debug!(tag = %record.tag, handle = ?record.handle, "entity already gone, no retirement");
            }
        }
    }

    fn report_diagnostics(&mut self, stream: StreamKind, out: &mut Vec<Event>) {
        for error in self.pool.take_diagnostics() {
            out.push(Event::PoolDiagnostic { stream, error });
        }
    }
}

fn prewarm<E: Poolable>(pool: &mut EntityPool<E>, tag: &PoolTag, size: usize) {
    if let Err(error) = pool.prewarm(tag, size) {
        warn!(%tag, %error, "cannot pre-warm content pool");
    }
}
