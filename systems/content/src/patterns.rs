use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::LaneLayout;

/// Relative placement produced by a pattern, anchored at the spawn frontier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Lane the entity occupies.
    pub lane: i32,
    /// Forward offset from the spawn anchor.
    pub forward: f32,
}

impl Placement {
    /// Creates a placement in `lane` at `forward` units past the anchor.
    #[must_use]
    pub const fn new(lane: i32, forward: f32) -> Self {
        Self { lane, forward }
    }
}

/// Coin recipes; every coin of one pattern shares a single tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinPattern {
    /// Five coins one unit apart in the anchor lane.
    Line,
    /// Diagonal sweep from one edge lane to the other, one unit per step.
    Curve,
    /// One coin in every sweep lane.
    AllLanes,
    /// Three to seven coins in random lanes within five units.
    Scatter,
}

impl CoinPattern {
    /// Every coin pattern in catalogue order.
    pub const ALL: [Self; 4] = [Self::Line, Self::Curve, Self::AllLanes, Self::Scatter];

    /// Expands the pattern into placements around `anchor_lane`.
    ///
    /// [`CoinPattern::Curve`] needs at least three lanes and yields nothing
    /// otherwise.
    pub fn placements<R: Rng + ?Sized>(
        self,
        layout: &LaneLayout,
        anchor_lane: i32,
        rng: &mut R,
    ) -> Vec<Placement> {
        match self {
            Self::Line => (0..5u8)
                .map(|step| Placement::new(anchor_lane, f32::from(step)))
                .collect(),
            Self::Curve => {
                if layout.lanes() < 3 {
                    return Vec::new();
                }
                let sweep = layout.sweep();
                let (mut from, mut to) = (*sweep.start(), *sweep.end());
                if rng.gen::<f32>() > 0.5 {
                    std::mem::swap(&mut from, &mut to);
                }
                let steps = from.abs_diff(to) + 1;
                let last = (steps - 1) as f32;
                (0..steps)
                    .map(|step| {
                        let t = step as f32 / last;
                        let lane = (from as f32 + (to - from) as f32 * t).round() as i32;
                        Placement::new(lane, step as f32)
                    })
                    .collect()
            }
            Self::AllLanes => layout.sweep().map(|lane| Placement::new(lane, 0.0)).collect(),
            Self::Scatter => {
                let count = rng.gen_range(3..8);
                (0..count)
                    .map(|_| {
                        let forward = rng.gen_range(0.0..5.0);
                        Placement::new(layout.random_lane(rng), forward)
                    })
                    .collect()
            }
        }
    }
}

/// Obstacle recipes; each placement draws its own obstacle tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstaclePattern {
    /// One obstacle in a random lane.
    Single,
    /// Every sweep lane blocked except one random gap lane.
    GappedWall,
    /// Three single obstacles two units apart, each in a random lane.
    Sequence,
    /// Obstacles in lanes -1, +1, -1, two units apart.
    Alternating,
    /// One to three obstacles in random lanes within five units.
    Scatter,
}

impl ObstaclePattern {
    /// Every obstacle pattern in catalogue order.
    pub const ALL: [Self; 5] = [
        Self::Single,
        Self::GappedWall,
        Self::Sequence,
        Self::Alternating,
        Self::Scatter,
    ];

    /// Expands the pattern into placements.
    pub fn placements<R: Rng + ?Sized>(self, layout: &LaneLayout, rng: &mut R) -> Vec<Placement> {
        match self {
            Self::Single => vec![Placement::new(layout.random_lane(rng), 0.0)],
            Self::GappedWall => {
                let gap = layout.random_lane(rng);
                gapped_wall(layout, gap)
            }
            Self::Sequence => [0.0, 2.0, 4.0]
                .into_iter()
                .map(|forward| Placement::new(layout.random_lane(rng), forward))
                .collect(),
            Self::Alternating => vec![
                Placement::new(-1, 0.0),
                Placement::new(1, 2.0),
                Placement::new(-1, 4.0),
            ],
            Self::Scatter => {
                let count = rng.gen_range(1..4);
                (0..count)
                    .map(|_| {
                        let forward = rng.gen_range(0.0..5.0);
                        Placement::new(layout.random_lane(rng), forward)
                    })
                    .collect()
            }
        }
    }
}

/// Blocks every sweep lane except `gap`.
#[must_use]
pub fn gapped_wall(layout: &LaneLayout, gap: i32) -> Vec<Placement> {
    layout
        .sweep()
        .filter(|lane| *lane != gap)
        .map(|lane| Placement::new(lane, 0.0))
        .collect()
}
