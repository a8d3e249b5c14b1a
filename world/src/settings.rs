use std::{collections::BTreeMap, time::Duration};

use runway_core::PoolTag;
use runway_pool::PropTemplate;
use runway_system_background::Config as BackgroundConfig;
use runway_system_content::{Config as ContentConfig, ContentCatalog};
use serde::{Deserialize, Serialize};

/// Seed used when settings do not name one.
pub const DEFAULT_SEED: u64 = 0x5eed_2024_c0ff_ee00;

/// Forward motion of the runner that drives every streamer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Forward speed when a run starts.
    pub start_speed: f32,
    /// Speed the runner never exceeds.
    pub max_speed: f32,
    /// Speed gained per second of simulated time.
    pub acceleration: f32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            start_speed: 10.0,
            max_speed: 25.0,
            acceleration: 0.1,
        }
    }
}

/// Cadence of automatic difficulty increases while streaming.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyConfig {
    /// Simulated seconds between increases.
    pub interval_seconds: f32,
    /// Divisor applied to the content spawn interval on each increase.
    pub multiplier: f32,
}

impl DifficultyConfig {
    /// Interval between increases, or `None` when it cannot be represented.
    #[must_use]
    pub fn interval(&self) -> Option<Duration> {
        Duration::try_from_secs_f32(self.interval_seconds)
            .ok()
            .filter(|interval| !interval.is_zero())
    }
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 15.0,
            multiplier: 1.1,
        }
    }
}

/// Static settings a session is built from.
///
/// Every field has a default, so partial TOML documents deserialize into a
/// complete configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seed for the session's random number generator.
    pub seed: u64,
    /// Background tile streaming.
    pub background: BackgroundConfig,
    /// Obstacle and coin spawning.
    pub content: ContentConfig,
    /// Runner speed profile.
    pub runner: RunnerConfig,
    /// Automatic difficulty cadence.
    pub difficulty: DifficultyConfig,
    /// Templates by tag; registered with every pool the session owns.
    pub templates: BTreeMap<PoolTag, PropTemplate>,
    /// Background tile candidates, active first.
    pub backgrounds: Vec<PoolTag>,
    /// Decorations scattered over background tiles.
    pub decorations: Vec<PoolTag>,
    /// Obstacle and coin tags.
    pub catalog: ContentCatalog,
}

impl Default for Settings {
    fn default() -> Self {
        let tiles = [("grass", Some(10.0)), ("sand", Some(10.0))];
        let props = ["bush", "stone", "hurdle", "barrier", "train", "coin"];
        let templates = tiles
            .into_iter()
            .chain(props.into_iter().map(|name| (name, None)))
            .map(|(name, extent)| (PoolTag::new(name), PropTemplate::new(extent)))
            .collect();

        Self {
            seed: DEFAULT_SEED,
            background: BackgroundConfig::default(),
            content: ContentConfig::default(),
            runner: RunnerConfig::default(),
            difficulty: DifficultyConfig::default(),
            templates,
            backgrounds: vec![PoolTag::new("grass")],
            decorations: vec![PoolTag::new("bush"), PoolTag::new("stone")],
            catalog: ContentCatalog {
                jumpable: vec![PoolTag::new("hurdle")],
                slideable: vec![PoolTag::new("barrier")],
                avoidable: vec![PoolTag::new("train")],
                coins: vec![PoolTag::new("coin")],
            },
        }
    }
}

impl Settings {
    /// Checks every numeric setting a session depends on.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let content = &self.content;
        if content.lanes == 0 {
            return Err(SettingsError::ZeroLanes);
        }
        if content.obstacle_patterns.is_empty() {
            return Err(SettingsError::NoObstaclePatterns);
        }

        positive("content.initial_spawn_interval", content.initial_spawn_interval)?;
        positive("content.min_spawn_interval", content.min_spawn_interval)?;
        positive("content.lane_width", content.lane_width)?;
        probability("content.coin_chance", content.coin_chance)?;
        non_negative("content.start_distance", content.start_distance)?;
        non_negative("content.spawn_distance", content.spawn_distance)?;
        non_negative("content.despawn_distance", content.despawn_distance)?;

        let background = &self.background;
        if !(background.default_tile_extent.is_finite() && background.default_tile_extent > 0.0) {
            return Err(SettingsError::TileExtent(background.default_tile_extent));
        }
        probability("background.decoration_chance", background.decoration_chance)?;
        non_negative("background.decoration_density", background.decoration_density)?;
        non_negative("background.lateral_spread", background.lateral_spread)?;
        non_negative(
            "background.rotation_spread_degrees",
            background.rotation_spread_degrees,
        )?;
        non_negative(
            "background.ahead_margin",
            background.driver.ahead_margin(),
        )?;
        non_negative(
            "background.behind_margin",
            background.driver.behind_margin(),
        )?;
        positive(
            "background.decoration_min_scale",
            background.decoration_min_scale,
        )?;
        positive(
            "background.decoration_max_scale",
            background.decoration_max_scale,
        )?;
        if background.decoration_max_scale < background.decoration_min_scale {
            return Err(SettingsError::ScaleRange {
                min: background.decoration_min_scale,
                max: background.decoration_max_scale,
            });
        }

        non_negative("runner.start_speed", self.runner.start_speed)?;
        non_negative("runner.acceleration", self.runner.acceleration)?;
        if self.runner.max_speed < self.runner.start_speed {
            return Err(SettingsError::SpeedRange {
                start: self.runner.start_speed,
                max: self.runner.max_speed,
            });
        }

        positive("difficulty.interval_seconds", self.difficulty.interval_seconds)?;
        if self.difficulty.interval().is_none() {
            return Err(SettingsError::NonPositive {
                field: "difficulty.interval_seconds",
                value: self.difficulty.interval_seconds,
            });
        }
        let multiplier = self.difficulty.multiplier;
        if !(multiplier.is_finite() && multiplier >= 1.0) {
            return Err(SettingsError::Multiplier(multiplier));
        }

        Ok(())
    }
}

/// Invalid numeric settings rejected before a session is built.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SettingsError {
    /// Content needs at least one lane.
    #[error("content lane count must be at least one")]
    ZeroLanes,
    /// Every spawn event falls back to an obstacle pattern, so one must exist.
    #[error("at least one obstacle pattern must be enabled")]
    NoObstaclePatterns,
    /// A value that must be strictly positive was not.
    #[error("`{field}` must be positive, got {value}")]
    NonPositive {
        /// Dotted path of the offending setting.
        field: &'static str,
        /// Rejected value.
        value: f32,
    },
    /// A distance or rate that must not be negative was.
    #[error("`{field}` must not be negative, got {value}")]
    Negative {
        /// Dotted path of the offending setting.
        field: &'static str,
        /// Rejected value.
        value: f32,
    },
    /// A probability fell outside `[0, 1]`.
    #[error("`{field}` must lie within [0, 1], got {value}")]
    Probability {
        /// Dotted path of the offending setting.
        field: &'static str,
        /// Rejected value.
        value: f32,
    },
    /// Background tiles need a positive fallback extent.
    #[error("default tile extent must be positive, got {0}")]
    TileExtent(f32),
    /// Decoration scale bounds are inverted.
    #[error("decoration scale range {min}..{max} is empty")]
    ScaleRange {
        /// Lower bound.
        min: f32,
        /// Upper bound.
        max: f32,
    },
    /// Runner would start above its speed cap.
    #[error("runner start speed {start} exceeds max speed {max}")]
    SpeedRange {
        /// Configured start speed.
        start: f32,
        /// Configured cap.
        max: f32,
    },
    /// Difficulty multipliers below one would loosen the spawn interval.
    #[error("difficulty multiplier must be at least 1, got {0}")]
    Multiplier(f32),
}

fn positive(field: &'static str, value: f32) -> Result<(), SettingsError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SettingsError::NonPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), SettingsError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SettingsError::Negative { field, value })
    }
}

fn probability(field: &'static str, value: f32) -> Result<(), SettingsError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SettingsError::Probability { field, value })
    }
}
