//! Build timing strategies

use std::time::Duration;

use rand::Rng;

/// Shortest build time a ready deployment may report
pub const MIN_BUILD_TIME_SECS: u32 = 30;

/// Longest build time a ready deployment may report
pub const MAX_BUILD_TIME_SECS: u32 = 90;

/// Decides how long each simulated step takes and the reported build time
pub trait BuildTiming: Send + Sync {
    /// Delay before the step at `index` is reported
    fn step_delay(&self, index: usize) -> Duration;

    /// Build duration in seconds reported on success
    fn build_time_secs(&self) -> u32;
}

/// Uniformly random delays and build times within bounds
#[derive(Debug, Clone)]
pub struct RandomTiming {
    step_delay_min_ms: u64,
    step_delay_max_ms: u64,
    build_time_min_secs: u32,
    build_time_max_secs: u32,
}

impl RandomTiming {
    pub fn new(step_delay: (Duration, Duration), build_time_secs: (u32, u32)) -> Self {
        let (a, b) = (step_delay.0.as_millis() as u64, step_delay.1.as_millis() as u64);
        let (c, d) = (
            build_time_secs.0.clamp(MIN_BUILD_TIME_SECS, MAX_BUILD_TIME_SECS),
            build_time_secs.1.clamp(MIN_BUILD_TIME_SECS, MAX_BUILD_TIME_SECS),
        );
        Self {
            step_delay_min_ms: a.min(b),
            step_delay_max_ms: a.max(b),
            build_time_min_secs: c.min(d),
            build_time_max_secs: c.max(d),
        }
    }
}

impl Default for RandomTiming {
    fn default() -> Self {
        Self::new(
            (Duration::from_secs(1), Duration::from_secs(3)),
            (30, 90),
        )
    }
}

impl BuildTiming for RandomTiming {
    fn step_delay(&self, _index: usize) -> Duration {
        let ms = rand::rng().random_range(self.step_delay_min_ms..=self.step_delay_max_ms);
        Duration::from_millis(ms)
    }

    fn build_time_secs(&self) -> u32 {
        rand::rng().random_range(self.build_time_min_secs..=self.build_time_max_secs)
    }
}

/// Deterministic timing, mostly for tests and demos
#[derive(Debug, Clone)]
pub struct FixedTiming {
    pub step_delay: Duration,
    pub build_time_secs: u32,
}

impl FixedTiming {
    /// Zero-length steps
    pub fn instant() -> Self {
        Self {
            step_delay: Duration::ZERO,
            build_time_secs: 30,
        }
    }
}

impl BuildTiming for FixedTiming {
    fn step_delay(&self, _index: usize) -> Duration {
        self.step_delay
    }

    fn build_time_secs(&self) -> u32 {
        self.build_time_secs
    }
}
