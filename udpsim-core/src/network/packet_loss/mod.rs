//! ## udpsim-core::network::packet_loss
//! **Packet loss models for network simulation**
//!
//! ### Models:
//! - Probabilistic Packet Loss: Packets are dropped with a given probability.
//!
//! ### Future:
//! - Burst loss (Gilbert-Elliott) once a two-state config is exposed.

use rand::RngCore;

use crate::error::{check_probability, CoreError};

/// Trait for packet loss models.
pub trait PacketLossModel: Send + Sync {
    /// Determines if a packet should be dropped based on the model.
    fn should_drop(&self, rng: &mut dyn RngCore) -> bool;
}

/// Probabilistic packet loss model.
#[derive(Debug, Clone, Copy)]
pub struct ProbabilisticLossModel {
    drop_probability: f64,
}

impl ProbabilisticLossModel {
    /// Creates a new probabilistic packet loss model.
    ///
    /// Fails if `drop_probability` is not within `[0.0, 1.0]`.
    pub fn new(drop_probability: f64) -> Result<Self, CoreError> {
        Ok(Self {
            drop_probability: check_probability("packet_loss_rate", drop_probability)?,
        })
    }
}

impl PacketLossModel for ProbabilisticLossModel {
    #[inline]
    fn should_drop(&self, rng: &mut dyn RngCore) -> bool {
        super::chance(rng, self.drop_probability)
    }
}
