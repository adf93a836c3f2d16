use std::time::Duration;

/// Interval divider applied while the queue has a backlog
pub const SPEEDUP_FACTOR: u32 = 4;

/// Report cadence driven by the queue backlog.
#[derive(Debug)]
pub struct RateState {
    base_interval: Duration,
    speedup_factor: u32,
}

impl RateState {
    pub fn new(base_interval: Duration) -> Self {
        Self {
            base_interval,
            speedup_factor: 1,
        }
    }

    pub fn base_interval(&self) -> Duration {
        self.base_interval
    }

    pub fn speedup_factor(&self) -> u32 {
        self.speedup_factor
    }

    pub fn is_sped_up(&self) -> bool {
        self.speedup_factor != 1
    }

    pub fn current_interval(&self) -> Duration {
        if self.speedup_factor == 1 {
            return self.base_interval;
        }

        let millis = self.base_interval.as_millis() as u64 / self.speedup_factor as u64;
        Duration::from_millis(millis.max(1))
    }

    /// Applies a backlog reading. Returns the new interval when it changes.
    ///
    /// Speeds up once on the first non-empty reading and goes back to the base interval
    /// once the queue is empty again.
    pub fn apply_backlog(&mut self, backlog: usize) -> Option<Duration> {
        match (backlog > 0, self.is_sped_up()) {
            (true, false) => {
                self.speedup_factor = SPEEDUP_FACTOR;
                Some(self.current_interval())
            }
            (false, true) => {
                self.speedup_factor = 1;
                Some(self.base_interval)
            }
            _ => None,
        }
    }
}
