//! ## udpsim-core::network::jitter
//! **Jitter simulation for network conditions**
//!
//! With probability `jitter_rate` a deferred packet gets an extra delay drawn
//! uniformly from `0..=max_jitter` (whole milliseconds).

use std::time::Duration;

use rand::{Rng, RngCore};

use crate::error::{check_probability, CoreError};

/// Trait for jitter models.
pub trait JitterModel: Send + Sync {
    /// Applies jitter to a given duration, returning the jittered duration.
    fn apply_jitter(&self, duration: Duration, rng: &mut dyn RngCore) -> Duration;
}

#[derive(Debug, Clone, Copy)]
pub struct ProbabilisticJitterModel {
    jitter_probability: f64,
    magnitude_ms: u64, // Maximum jitter magnitude in milliseconds
}

impl ProbabilisticJitterModel {
    pub fn new(jitter_probability: f64, max_jitter: Duration) -> Result<Self, CoreError> {
        Ok(Self {
            jitter_probability: check_probability("jitter_rate", jitter_probability)?,
            magnitude_ms: max_jitter.as_millis() as u64,
        })
    }
}

impl JitterModel for ProbabilisticJitterModel {
    fn apply_jitter(&self, duration: Duration, rng: &mut dyn RngCore) -> Duration {
        if !super::chance(rng, self.jitter_probability) {
            return duration;
        }
        let jitter_ms = rng.random_range(0..=self.magnitude_ms);
        duration + Duration::from_millis(jitter_ms)
    }
}
