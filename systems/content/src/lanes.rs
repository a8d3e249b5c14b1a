use std::ops::{Range, RangeInclusive};

use rand::Rng;

/// Discrete lateral slots centred on zero.
///
/// Random picks and sweeps use different ranges. With `N` lanes a random lane
/// is drawn from `-(N/2) ..= N/2 + N%2 - 1`, while sweeps cover
/// `-(N/2) ..= N/2`. For odd `N` both are the same; for even `N` random picks
/// never reach the rightmost sweep lane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaneLayout {
    lanes: u32,
    lane_width: f32,
}

impl LaneLayout {
    /// Creates a layout with `lanes` slots spaced `lane_width` apart.
    #[must_use]
    pub const fn new(lanes: u32, lane_width: f32) -> Self {
        Self { lanes, lane_width }
    }

    /// Number of configured lanes.
    #[must_use]
    pub const fn lanes(&self) -> u32 {
        self.lanes
    }

    /// Lateral distance between neighbouring lanes.
    #[must_use]
    pub const fn lane_width(&self) -> f32 {
        self.lane_width
    }

    /// Lanes a random pick is drawn from.
    #[must_use]
    pub fn random_range(&self) -> Range<i32> {
        let half = self.half();
        -half..half + self.odd()
    }

    /// Lanes covered by patterns that sweep across the track.
    #[must_use]
    pub fn sweep(&self) -> RangeInclusive<i32> {
        let half = self.half();
        -half..=half
    }

    /// Draws a lane from [`Self::random_range`]; an empty range yields lane zero.
    pub fn random_lane<R: Rng + ?Sized>(&self, rng: &mut R) -> i32 {
        let range = self.random_range();
        if range.is_empty() {
            0
        } else {
            rng.gen_range(range)
        }
    }

    /// Lateral coordinate of `lane`.
    #[must_use]
    pub fn lateral(&self, lane: i32) -> f32 {
        lane as f32 * self.lane_width
    }

    fn half(&self) -> i32 {
        i32::try_from(self.lanes / 2).unwrap_or(i32::MAX / 2)
    }

    fn odd(&self) -> i32 {
        i32::from(self.lanes % 2 == 1)
    }
}
