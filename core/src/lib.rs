#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Runway content streaming engine.
//!
//! This crate defines the message surface that connects adapters, the
//! orchestrating session, and the streaming systems. Adapters submit
//! [`Command`] values describing desired lifecycle changes, the session
//! executes those commands via its `apply` entry point, and every spawn,
//! retirement, or failure that happens while streaming is broadcast as an
//! [`Event`] for the presentation layer to react to.
//!
//! Positions use a two dimensional frame: `x` is the lateral axis that lanes
//! are laid out along and `y` is the forward scroll axis the player advances
//! on.

use std::{cell::Cell, fmt, rc::Rc, sync::Arc, time::Duration};

pub use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Read-only view of the player's forward progress, polled once per tick.
pub trait ReferenceSource {
    /// Current position of the player along the forward scroll axis.
    fn reference_position(&self) -> f32;
}

impl ReferenceSource for f32 {
    fn reference_position(&self) -> f32 {
        *self
    }
}

impl ReferenceSource for Cell<f32> {
    fn reference_position(&self) -> f32 {
        self.get()
    }
}

impl<T: ReferenceSource + ?Sized> ReferenceSource for Rc<T> {
    fn reference_position(&self) -> f32 {
        (**self).reference_position()
    }
}

/// Identifier naming a template and the free list holding its instances.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PoolTag(Arc<str>);

impl PoolTag {
    /// Creates a new tag from the provided name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// Borrowed view of the tag name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PoolTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PoolTag {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for PoolTag {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<PoolTag> for String {
    fn from(tag: PoolTag) -> Self {
        tag.0.as_ref().to_owned()
    }
}

/// Generational handle referring to an entity owned by a pool.
///
/// A handle outlives the entity it names: once the pool destroys the entity
/// and reuses its slot the generation no longer matches and lookups fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle {
    index: u32,
    generation: u32,
}

impl EntityHandle {
    /// Creates a handle from its slot index and generation.
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index inside the owning pool.
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot when the handle was issued.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

/// Placement of an entity in the scroll plane.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Lateral (`x`) and forward (`y`) position.
    pub position: Vec2,
    /// Rotation around the view axis in degrees.
    pub rotation_degrees: f32,
    /// Uniform scale factor.
    pub scale: f32,
}

impl Transform {
    /// Canonical transform at the origin with no rotation and unit scale.
    pub const IDENTITY: Self = Self {
        position: Vec2::ZERO,
        rotation_degrees: 0.0,
        scale: 1.0,
    };

    /// Creates an unscaled transform at the provided position and rotation.
    #[must_use]
    pub const fn at(position: Vec2, rotation_degrees: f32) -> Self {
        Self {
            position,
            rotation_degrees,
            scale: 1.0,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Streams that independently populate the scroll axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Contiguous background tiles.
    Background,
    /// Decorations scattered across background tiles.
    Decoration,
    /// Obstacles placed in lanes.
    Obstacle,
    /// Collectible coins placed in lanes.
    Coin,
}

/// Template categories a streamer draws tags from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentCategory {
    /// Background tile candidates.
    Tile,
    /// Background decorations.
    Decoration,
    /// Obstacles the player jumps over.
    Jumpable,
    /// Obstacles the player slides under.
    Slideable,
    /// Obstacles the player changes lane to avoid.
    Avoidable,
    /// Collectible coins.
    Coin,
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tile => "tile",
            Self::Decoration => "decoration",
            Self::Jumpable => "jumpable",
            Self::Slideable => "slideable",
            Self::Avoidable => "avoidable",
            Self::Coin => "coin",
        };
        f.write_str(name)
    }
}

/// Recoverable failures that degrade a single tick's content output.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SpawnError {
    /// Spawn requested for a tag with neither a pool nor a template.
    #[error("no pool or template registered for tag `{0}`")]
    UnknownTag(PoolTag),
    /// A category required by the spawn branch has no templates configured.
    #[error("no templates configured for category `{0}`")]
    ConfigurationMissing(ContentCategory),
    /// A free queue yielded an entity that had already been destroyed.
    #[error("pool `{0}` yielded a destroyed entity")]
    NullEntityReference(PoolTag),
}

/// Commands that express every lifecycle change the host may request.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Begins streaming from the current reference position.
    StartStreaming,
    /// Stops streaming; subsequent ticks spawn and retire nothing.
    StopStreaming,
    /// Clears every stream, restores tuning, and re-seeds the background.
    ResetAll,
    /// Releases every tracked entity and destroys all pooled instances.
    ClearAll,
    /// Tightens the content spawn interval by the provided multiplier.
    IncreaseDifficulty {
        /// Divisor applied to the current spawn interval.
        multiplier: f32,
    },
    /// Selects the background tile template used for new tiles.
    SetActiveBackground {
        /// Tag of the tile template to activate.
        tag: PoolTag,
    },
    /// Advances the simulation by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
}

/// Events broadcast after processing commands and ticks.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces that streaming started at the provided reference position.
    StreamingStarted {
        /// Reference position sampled when streaming began.
        reference: f32,
    },
    /// Announces that streaming stopped.
    StreamingStopped,
    /// Confirms that an entity left its pool and became active.
    EntitySpawned {
        /// Stream that owns the new entity.
        stream: StreamKind,
        /// Handle assigned by the pool.
        handle: EntityHandle,
        /// Template the entity was instantiated from.
        tag: PoolTag,
        /// Position the entity was placed at.
        position: Vec2,
    },
    /// Confirms that an entity was returned to its pool.
    EntityRetired {
        /// Stream that owned the entity.
        stream: StreamKind,
        /// Handle of the retired entity.
        handle: EntityHandle,
        /// Template the entity was instantiated from.
        tag: PoolTag,
    },
    /// Reports a spawn that was skipped this tick.
    SpawnFailed {
        /// Stream that attempted the spawn.
        stream: StreamKind,
        /// Reason the spawn was skipped.
        error: SpawnError,
    },
    /// Reports pool corruption detected and recovered from during a spawn.
    PoolDiagnostic {
        /// Stream whose pool reported the problem.
        stream: StreamKind,
        /// Description of the recovered problem.
        error: SpawnError,
    },
    /// Reports that the content spawn interval tightened.
    DifficultyIncreased {
        /// Forward distance between spawn events after the change.
        spawn_interval: f32,
    },
    /// Reports that the active background template changed.
    BackgroundTemplateChanged {
        /// Tag now used for new tiles.
        tag: PoolTag,
        /// Number of candidate templates retained after the change.
        candidates: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::{PoolTag, ReferenceSource, Transform, Vec2};
    use std::{cell::Cell, rc::Rc};

    #[test]
    fn pool_tag_keeps_separators_verbatim() {
        let tag = PoolTag::from("rock_small_2");
        assert_eq!(tag.as_str(), "rock_small_2");
        assert_eq!(tag.to_string(), "rock_small_2");
        assert_eq!(String::from(tag.clone()), "rock_small_2");
        assert_eq!(tag, PoolTag::from(String::from("rock_small_2")));
    }

    #[test]
    fn pool_tag_deserializes_from_plain_string() {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            tag: PoolTag,
        }

        let wrapper: Wrapper = toml::from_str("tag = \"coin_gold\"").expect("parse");
        assert_eq!(wrapper.tag, PoolTag::new("coin_gold"));
    }

    #[test]
    fn shared_cell_reflects_updates() {
        let source = Rc::new(Cell::new(1.5));
        let view = Rc::clone(&source);
        source.set(4.0);
        assert!((view.reference_position() - 4.0).abs() < f32::EPSILON);
    }

    #[test]
    fn transform_at_uses_unit_scale() {
        let transform = Transform::at(Vec2::new(1.0, 2.0), 15.0);
        assert!((transform.scale - 1.0).abs() < f32::EPSILON);
        assert_eq!(Transform::default(), Transform::IDENTITY);
    }
}
