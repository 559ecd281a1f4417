//! ## udpsim-core::network::reorder
//! **Reorder latency**
//!
//! A packet picked for "reordering" is held for a short fixed interval before
//! it is handed to the socket. This only adds latency to that packet; it does
//! not move it relative to packets already queued for transmission.

use std::time::Duration;

use rand::RngCore;

use crate::error::{check_probability, CoreError};

/// Default hold applied to reordered packets.
pub const DEFAULT_REORDER_HOLD: Duration = Duration::from_millis(10);

pub trait ReorderModel: Send + Sync {
    fn should_reorder(&self, rng: &mut dyn RngCore) -> bool;

    /// Extra latency applied when `should_reorder` fires.
    fn hold(&self) -> Duration;
}

#[derive(Debug, Clone, Copy)]
pub struct ProbabilisticReorderModel {
    reorder_probability: f64,
    hold: Duration,
}

impl ProbabilisticReorderModel {
    pub fn new(reorder_probability: f64, hold: Duration) -> Result<Self, CoreError> {
        Ok(Self {
            reorder_probability: check_probability("reordering_rate", reorder_probability)?,
            hold,
        })
    }
}

impl ReorderModel for ProbabilisticReorderModel {
    #[inline]
    fn should_reorder(&self, rng: &mut dyn RngCore) -> bool {
        super::chance(rng, self.reorder_probability)
    }

    #[inline]
    fn hold(&self) -> Duration {
        self.hold
    }
}
