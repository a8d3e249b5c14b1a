#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Background streaming system keeping a contiguous strip of tiles around the player.

use std::{mem, rc::Rc};

use rand::Rng;
use runway_core::{ContentCategory, EntityHandle, Event, PoolTag, SpawnError, StreamKind, Vec2};
use runway_pool::{EntityPool, Poolable, Release, Template};
use runway_system_stream_driver::{DriverConfig, SpawnDecision, StreamDriver};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Tuning knobs for tile streaming and decoration scatter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Window the tile strip must cover around the reference.
    pub driver: DriverConfig,
    /// Forward size used for tiles whose extent cannot be measured.
    pub default_tile_extent: f32,
    /// Tiles laid down immediately by a reset.
    pub initial_tiles: usize,
    /// Entities pre-instantiated per tile template.
    pub tile_pool_size: usize,
    /// Entities pre-instantiated per decoration template.
    pub decoration_pool_size: usize,
    /// Decorations per unit of tile extent when a tile is decorated.
    pub decoration_density: f32,
    /// Probability that a freshly spawned tile receives decorations.
    pub decoration_chance: f32,
    /// Decorations are offset laterally within `±lateral_spread`.
    pub lateral_spread: f32,
    /// Smallest uniform scale applied to a decoration.
    pub decoration_min_scale: f32,
    /// Largest uniform scale applied to a decoration.
    pub decoration_max_scale: f32,
    /// Decorations are rotated within `±rotation_spread_degrees`.
    pub rotation_spread_degrees: f32,
    /// Upper bound on tiles laid down by a single tick.
    pub max_spawns_per_tick: usize,
    /// Upper bound on decorations scattered on one tile.
    pub max_decorations_per_tile: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            driver: DriverConfig::new(10.0, 15.0, 10.0),
            default_tile_extent: 10.0,
            initial_tiles: 3,
            tile_pool_size: 3,
            decoration_pool_size: 5,
            decoration_density: 0.3,
            decoration_chance: 0.7,
            lateral_spread: 2.5,
            decoration_min_scale: 0.8,
            decoration_max_scale: 1.2,
            rotation_spread_degrees: 15.0,
            max_spawns_per_tick: 8,
            max_decorations_per_tile: 32,
        }
    }
}

/// Decoration tracked alongside the tile it was scattered on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecorationRecord {
    /// Handle issued by the pool.
    pub handle: EntityHandle,
    /// Template the decoration came from.
    pub tag: PoolTag,
}

/// Active tile together with the decorations placed on it.
#[derive(Clone, Debug, PartialEq)]
pub struct TileRecord {
    /// Handle issued by the pool.
    pub handle: EntityHandle,
    /// Template the tile came from.
    pub tag: PoolTag,
    /// Forward position of the tile's near edge.
    pub origin: f32,
    /// Forward size the frontier advanced by for this tile.
    pub extent: f32,
    /// Decorations released together with the tile.
    pub decorations: Vec<DecorationRecord>,
}

/// Effect of selecting a background template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TemplateSelection {
    /// The tag was unknown and replaced every previous candidate.
    Replaced,
    /// The tag was known and moved to the front of the candidates.
    Promoted,
    /// The tag was already the active candidate.
    Unchanged,
}

/// Streams background tiles and their decorations along the forward axis.
#[derive(Debug)]
pub struct BackgroundStreamer<E> {
    config: Config,
    driver: StreamDriver,
    pool: EntityPool<E>,
    candidates: Vec<PoolTag>,
    decorations: Vec<PoolTag>,
    tiles: Vec<TileRecord>,
}

impl<E: Poolable> BackgroundStreamer<E> {
    /// Creates an idle streamer drawing from `pool`.
    ///
    /// Pools are pre-warmed for every candidate and decoration whose template
    /// is registered with `pool`.
    #[must_use]
    pub fn new(
        config: Config,
        mut pool: EntityPool<E>,
        candidates: Vec<PoolTag>,
        decorations: Vec<PoolTag>,
    ) -> Self {
        for tag in &candidates {
            prewarm(&mut pool, tag, config.tile_pool_size);
        }
        for tag in &decorations {
            prewarm(&mut pool, tag, config.decoration_pool_size);
        }

        Self {
            driver: StreamDriver::new(config.driver),
            config,
            pool,
            candidates,
            decorations,
            tiles: Vec::new(),
        }
    }

    /// Starts streaming and re-seeds the strip around `reference`.
    pub fn start<R: Rng + ?Sized>(&mut self, reference: f32, rng: &mut R, out: &mut Vec<Event>) {
        self.driver.start(reference);
        self.reset_all(reference, rng, out);
    }

    /// Stops streaming; tiles stay in place until cleared.
    pub fn stop(&mut self) {
        self.driver.stop();
    }

    /// Lays down tiles up to the window ahead and retires tiles that fell behind.
    pub fn tick<R: Rng + ?Sized>(&mut self, reference: f32, rng: &mut R, out: &mut Vec<Event>) {
        if !self.driver.is_streaming() {
            return;
        }

        for _ in 0..self.config.max_spawns_per_tick.max(1) {
            match self.driver.tick(reference) {
                SpawnDecision::Hold => break,
                SpawnDecision::SpawnAt { frontier } => {
                    if !self.spawn_tile(frontier, rng, out) {
                        break;
                    }
                }
            }
        }

        self.retire_stale(reference, out);
    }

    /// Releases every tile, rewinds the frontier below `reference`, and lays
    /// down the configured initial tiles.
    pub fn reset_all<R: Rng + ?Sized>(
        &mut self,
        reference: f32,
        rng: &mut R,
        out: &mut Vec<Event>,
    ) {
        let _ = self.clear_all(out);
        self.driver.rewind(reference);

        let mut laid = 0;
        for _ in 0..self.config.initial_tiles {
            let frontier = self.driver.frontier();
            if !self.spawn_tile(frontier, rng, out) {
                break;
            }
            laid += 1;
        }
        info!(laid, frontier = self.driver.frontier(), "background reset");
    }

    /// Releases every tile and decoration. Returns the number of tiles released.
    pub fn clear_all(&mut self, out: &mut Vec<Event>) -> usize {
        let tiles = mem::take(&mut self.tiles);
        let released = tiles.len();
        for tile in tiles {
            self.release_tile(tile, out);
        }
        released
    }

    /// Makes `tag` the template used for new tiles.
    ///
    /// An unknown tag replaces every previous candidate; a known tag is moved
    /// to the front and the other candidates are kept.
    pub fn set_active_template(&mut self, tag: PoolTag) -> TemplateSelection {
        let selection = match self.candidates.iter().position(|candidate| *candidate == tag) {
            Some(0) => TemplateSelection::Unchanged,
            Some(index) => {
                let promoted = self.candidates.remove(index);
                self.candidates.insert(0, promoted);
                TemplateSelection::Promoted
            }
            None => {
                self.candidates.clear();
                self.candidates.push(tag.clone());
                if self.pool.has_template(&tag) {
                    prewarm(&mut self.pool, &tag, self.config.tile_pool_size);
                }
                TemplateSelection::Replaced
            }
        };
        info!(%tag, ?selection, candidates = self.candidates.len(), "background template selected");
        selection
    }

    /// Registers a template the streamer may later be asked to activate.
    pub fn register_template(&mut self, tag: PoolTag, template: Rc<dyn Template<E>>) {
        self.pool.register_template(tag, template);
    }

    /// Template used for new tiles.
    #[must_use]
    pub fn active_template(&self) -> Option<&PoolTag> {
        self.candidates.first()
    }

    /// Candidate tile templates, active first.
    #[must_use]
    pub fn candidates(&self) -> &[PoolTag] {
        &self.candidates
    }

    /// Tiles currently laid down, oldest first.
    #[must_use]
    pub fn tiles(&self) -> &[TileRecord] {
        &self.tiles
    }

    /// Driver tracking the tile frontier.
    #[must_use]
    pub fn driver(&self) -> &StreamDriver {
        &self.driver
    }

    /// Pool owning every tile and decoration.
    #[must_use]
    pub fn pool(&self) -> &EntityPool<E> {
        &self.pool
    }

    /// Mutable access to the pool, e.g. to destroy every pooled entity.
    pub fn pool_mut(&mut self) -> &mut EntityPool<E> {
        &mut self.pool
    }

    fn spawn_tile<R: Rng + ?Sized>(
        &mut self,
        frontier: f32,
        rng: &mut R,
        out: &mut Vec<Event>,
    ) -> bool {
        let Some(tag) = self.candidates.first().cloned() else {
            warn!("no background tile template configured");
            out.push(Event::SpawnFailed {
                stream: StreamKind::Background,
                error: SpawnError::ConfigurationMissing(ContentCategory::Tile),
            });
            return false;
        };

        let position = Vec2::new(0.0, frontier);
        let handle = match self.pool.spawn(&tag, position, 0.0) {
            Ok(handle) => handle,
            Err(error) => {
                out.push(Event::SpawnFailed {
                    stream: StreamKind::Background,
                    error,
                });
                return false;
            }
        };
        self.report_diagnostics(StreamKind::Background, out);

        let extent = self
            .pool
            .get(handle)
            .and_then(Poolable::extent)
            .filter(|extent| extent.is_finite() && *extent > 0.0)
            .unwrap_or(self.config.default_tile_extent);
        let _ = self.driver.advance(extent);
        debug!(%tag, origin = frontier, extent, "tile spawned");
        out.push(Event::EntitySpawned {
            stream: StreamKind::Background,
            handle,
            tag: tag.clone(),
            position,
        });

        let decorations = self.scatter_decorations(frontier, extent, rng, out);
        self.tiles.push(TileRecord {
            handle,
            tag,
            origin: frontier,
            extent,
            decorations,
        });
        true
    }

    fn scatter_decorations<R: Rng + ?Sized>(
        &mut self,
        origin: f32,
        extent: f32,
        rng: &mut R,
        out: &mut Vec<Event>,
    ) -> Vec<DecorationRecord> {
        if self.decorations.is_empty() || rng.gen::<f32>() >= self.config.decoration_chance {
            return Vec::new();
        }

        let count = ((self.config.decoration_density * extent).round().max(0.0) as usize)
            .min(self.config.max_decorations_per_tile);
        let mut placed = Vec::with_capacity(count);
        for _ in 0..count {
            let tag = self.decorations[rng.gen_range(0..self.decorations.len())].clone();
            let forward = origin + rng.gen_range(0.0..extent);
            let lateral = symmetric(rng, self.config.lateral_spread);
            let rotation = symmetric(rng, self.config.rotation_spread_degrees);
            let (min_scale, max_scale) = (
                self.config.decoration_min_scale,
                self.config.decoration_max_scale,
            );
            let scale = if min_scale.is_finite() && max_scale.is_finite() && min_scale < max_scale
            {
                rng.gen_range(min_scale..max_scale)
            } else {
                min_scale
            };

            let position = Vec2::new(lateral, forward);
            match self.pool.spawn(&tag, position, rotation) {
                Ok(handle) => {
                    if let Some(decoration) = self.pool.get_mut(handle) {
                        decoration.transform_mut().scale = scale;
                    }
                    out.push(Event::EntitySpawned {
                        stream: StreamKind::Decoration,
                        handle,
                        tag: tag.clone(),
                        position,
                    });
                    placed.push(DecorationRecord { handle, tag });
                }
                Err(error) => out.push(Event::SpawnFailed {
                    stream: StreamKind::Decoration,
                    error,
                }),
            }
        }
        self.report_diagnostics(StreamKind::Decoration, out);
        placed
    }

    fn retire_stale(&mut self, reference: f32, out: &mut Vec<Event>) {
        let (stale, kept): (Vec<_>, Vec<_>) = mem::take(&mut self.tiles)
            .into_iter()
            .partition(|tile| self.driver.is_stale(tile.origin, tile.extent, reference));
        self.tiles = kept;
        for tile in stale {
            debug!(tag = %tile.tag, origin = tile.origin, "tile retired");
            self.release_tile(tile, out);
        }
    }

    fn release_tile(&mut self, tile: TileRecord, out: &mut Vec<Event>) {
        for decoration in tile.decorations {
            self.release(StreamKind::Decoration, decoration.handle, decoration.tag, out);
        }
        self.release(StreamKind::Background, tile.handle, tile.tag, out);
    }

    /// Retirement is only reported for entities the pool still considered active.
    fn release(
        &mut self,
        stream: StreamKind,
        handle: EntityHandle,
        tag: PoolTag,
        out: &mut Vec<Event>,
    ) {
        match self.pool.release(handle) {
            Release::Pooled | Release::Destroyed => {
                out.push(Event::EntityRetired {
                    stream,
                    handle,
                    tag,
                });
            }
            Release::Ignored => debug!(%tag, ?handle, "entity already gone, no retirement"),
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
        warn!(%tag, %error, "cannot pre-warm background pool");
    }
}

fn symmetric<R: Rng + ?Sized>(rng: &mut R, spread: f32) -> f32 {
    if spread.is_finite() && spread > 0.0 {
        rng.gen_range(-spread..spread)
    } else {
        0.0
    }
}
