//! ## udpsim-core::network::latency
//! **Latency models for network simulation**
//!
//! A packet selected for deferral is held for a fixed base delay, to which
//! the jitter model may add more.

use std::time::Duration;

use rand::RngCore;

use crate::error::{check_probability, CoreError};

/// Trait for latency models.
pub trait LatencyModel: Send + Sync {
    /// Decides whether this packet goes through the deferred delivery path.
    fn should_delay(&self, rng: &mut dyn RngCore) -> bool;

    /// Applies the latency model to a given duration.
    fn apply_latency(&self, duration: Duration) -> Duration;
}

/// Delays a fraction of packets by a fixed base latency.
#[derive(Debug, Clone, Copy)]
pub struct ProbabilisticLatencyModel {
    delay_probability: f64,
    latency: Duration,
}

impl ProbabilisticLatencyModel {
    pub fn new(delay_probability: f64, latency: Duration) -> Result<Self, CoreError> {
        Ok(Self {
            delay_probability: check_probability("delay_rate", delay_probability)?,
            latency,
        })
    }
}

impl LatencyModel for ProbabilisticLatencyModel {
    #[inline]
    fn should_delay(&self, rng: &mut dyn RngCore) -> bool {
        super::chance(rng, self.delay_probability)
    }

    #[inline]
    fn apply_latency(&self, duration: Duration) -> Duration {
        duration + self.latency
    }
}
