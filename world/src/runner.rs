use std::time::Duration;

use runway_core::ReferenceSource;

use crate::RunnerConfig;

/// Player stand-in that moves forward with a capped, steadily growing speed.
#[derive(Clone, Debug, PartialEq)]
pub struct Runner {
    config: RunnerConfig,
    position: f32,
    speed: f32,
}

impl Runner {
    /// Creates a runner at `position` moving at the configured start speed.
    #[must_use]
    pub fn new(config: RunnerConfig, position: f32) -> Self {
        Self {
            config,
            position,
            speed: config.start_speed.min(config.max_speed),
        }
    }

    /// Forward position along the scroll axis.
    #[must_use]
    pub fn position(&self) -> f32 {
        self.position
    }

    /// Current forward speed.
    #[must_use]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Moves forward for `dt` and accelerates towards the speed cap.
    /// Returns the new position.
    pub fn advance(&mut self, dt: Duration) -> f32 {
        let seconds = dt.as_secs_f32();
        self.position += self.speed * seconds;
        self.speed = (self.speed + self.config.acceleration * seconds).min(self.config.max_speed);
        self.position
    }

    /// Returns the runner to `position` at the start speed.
    pub fn reset(&mut self, position: f32) {
        self.position = position;
        self.speed = self.config.start_speed.min(self.config.max_speed);
    }
}

impl ReferenceSource for Runner {
    fn reference_position(&self) -> f32 {
        self.position
    }
}
