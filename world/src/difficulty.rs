use std::time::Duration;

/// Counts elapsed difficulty intervals of simulated time.
#[derive(Clone, Debug)]
pub(crate) struct DifficultyClock {
    interval: Duration,
    accumulator: Duration,
}

impl DifficultyClock {
    pub(crate) const fn new(interval: Duration) -> Self {
        Self {
            interval,
            accumulator: Duration::ZERO,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.accumulator = Duration::ZERO;
    }

    /// Accumulates `dt` and returns how many whole intervals elapsed.
    pub(crate) fn advance(&mut self, dt: Duration) -> u32 {
        if self.interval.is_zero() {
            return 0;
        }

        self.accumulator = self.accumulator.saturating_add(dt);
        let interval = self.interval.as_nanos();
        let elapsed = self.accumulator.as_nanos() / interval;
        let remainder = self.accumulator.as_nanos() % interval;
        self.accumulator = Duration::from_nanos(u64::try_from(remainder).unwrap_or(u64::MAX));
        u32::try_from(elapsed).unwrap_or(u32::MAX)
    }
}
