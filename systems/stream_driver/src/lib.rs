#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Spawn-frontier bookkeeping shared by every content streamer.
//!
//! The driver only decides *when* and *where* content should appear. How far
//! the frontier moves after a spawn depends on the size of what was spawned,
//! which only the caller knows, so the caller reports it back through
//! [`StreamDriver::advance`].

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Distances that shape a driver's populated window around the reference.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    lookback: f32,
    ahead_margin: f32,
    behind_margin: f32,
}

impl DriverConfig {
    /// Creates a configuration from the three window distances.
    ///
    /// `lookback` is subtracted from the reference when streaming starts; a
    /// negative value starts the frontier ahead of the reference.
    #[must_use]
    pub const fn new(lookback: f32, ahead_margin: f32, behind_margin: f32) -> Self {
        Self {
            lookback,
            ahead_margin,
            behind_margin,
        }
    }

    /// Distance behind the reference the frontier starts at.
    #[must_use]
    pub const fn lookback(&self) -> f32 {
        self.lookback
    }

    /// Distance ahead of the reference that must stay populated.
    #[must_use]
    pub const fn ahead_margin(&self) -> f32 {
        self.ahead_margin
    }

    /// Distance behind the reference past which content is stale.
    #[must_use]
    pub const fn behind_margin(&self) -> f32 {
        self.behind_margin
    }
}

/// Lifecycle of a driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DriverState {
    /// Not streaming; ticks never request spawns.
    Idle,
    /// Streaming; ticks compare the reference against the frontier.
    Streaming,
}

/// Result of a single driver tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpawnDecision {
    /// The window ahead of the reference is already populated.
    Hold,
    /// Content should be spawned with its near edge at `frontier`.
    SpawnAt {
        /// Forward position of the current frontier.
        frontier: f32,
    },
}

/// Tracks the spawn frontier of one streamer against a moving reference.
#[derive(Clone, Debug)]
pub struct StreamDriver {
    config: DriverConfig,
    state: DriverState,
    frontier: f32,
}

impl StreamDriver {
    /// Creates an idle driver with its frontier at zero.
    #[must_use]
    pub const fn new(config: DriverConfig) -> Self {
        Self {
            config,
            state: DriverState::Idle,
            frontier: 0.0,
        }
    }

    /// Configuration the driver was created with.
    #[must_use]
    pub const fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> DriverState {
        self.state
    }

    /// Reports whether the driver is streaming.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.state == DriverState::Streaming
    }

    /// Furthest forward position already populated.
    #[must_use]
    pub const fn frontier(&self) -> f32 {
        self.frontier
    }

    /// Places the frontier `lookback` behind `reference` and begins streaming.
    pub fn start(&mut self, reference: f32) {
        self.rewind(reference);
        self.state = DriverState::Streaming;
        info!(reference, frontier = self.frontier, "stream driver started");
    }

    /// Stops streaming; the frontier is kept until the next start or rewind.
    pub fn stop(&mut self) {
        self.state = DriverState::Idle;
        info!(frontier = self.frontier, "stream driver stopped");
    }

    /// Places the frontier `lookback` behind `reference` without changing state.
    pub fn rewind(&mut self, reference: f32) {
        self.frontier = reference - self.config.lookback;
    }

    /// Decides whether content must be spawned at the frontier.
    #[must_use]
    pub fn tick(&self, reference: f32) -> SpawnDecision {
        if self.state == DriverState::Idle {
            return SpawnDecision::Hold;
        }

        if reference + self.config.ahead_margin > self.frontier {
            SpawnDecision::SpawnAt {
                frontier: self.frontier,
            }
        } else {
            SpawnDecision::Hold
        }
    }

    /// Moves the frontier forward by the extent of freshly spawned content.
    ///
    /// Negative and non-finite extents leave the frontier untouched. Returns
    /// the new frontier.
    pub fn advance(&mut self, extent: f32) -> f32 {
        if extent.is_finite() && extent > 0.0 {
            self.frontier += extent;
        } else {
            debug!(extent, "ignored frontier advance");
        }
        self.frontier
    }

    /// Reports whether content spanning `extent` from `position` fell behind.
    ///
    /// The comparison is strict: content ending exactly on the horizon stays.
    #[must_use]
    pub fn is_stale(&self, position: f32, extent: f32, reference: f32) -> bool {
        position + extent < reference - self.config.behind_margin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_rejects_non_finite_extent() {
        let mut driver = StreamDriver::new(DriverConfig::new(0.0, 5.0, 5.0));
        driver.start(0.0);
        assert!((driver.advance(f32::NAN) - 0.0).abs() < f32::EPSILON);
        assert!((driver.advance(f32::INFINITY) - 0.0).abs() < f32::EPSILON);
        assert!((driver.advance(-3.0) - 0.0).abs() < f32::EPSILON);
        assert!((driver.advance(2.5) - 2.5).abs() < f32::EPSILON);
    }
}
