//! Per-packet impairment decisions.
//!
//! Checks run in a fixed order and the first match wins: drop, then delay
//! (with optional jitter), otherwise forward. A packet consumes one draw per
//! check it reaches. The reorder check belongs to egress and is exposed
//! separately through [`ImpairmentEngine::reorder_hold`] so that every packet
//! leaving the simulator, direct or deferred, goes through it.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::warn;
use udpsim_config::NetworkConfig;
use udpsim_core::network::{
    JitterModel, LatencyModel, PacketLossModel, ProbabilisticJitterModel,
    ProbabilisticLatencyModel, ProbabilisticLossModel, ProbabilisticReorderModel, ReorderModel,
};
use udpsim_core::CoreError;

use crate::shared::SharedConfig;

/// Outcome of the drop and delay checks for one packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Drop,
    /// Hold the packet in the deferred store for this long.
    Defer(Duration),
    Forward,
}

#[derive(Debug, Clone, Copy)]
struct Models {
    loss: ProbabilisticLossModel,
    latency: ProbabilisticLatencyModel,
    jitter: ProbabilisticJitterModel,
    reorder: ProbabilisticReorderModel,
}

impl Models {
    fn from_config(config: &NetworkConfig) -> Result<Self, CoreError> {
        Ok(Self {
            loss: ProbabilisticLossModel::new(config.packet_loss_rate)?,
            latency: ProbabilisticLatencyModel::new(
                config.delay_rate,
                Duration::from_millis(config.base_delay_ms),
            )?,
            jitter: ProbabilisticJitterModel::new(
                config.jitter_rate,
                Duration::from_millis(config.max_jitter_ms),
            )?,
            reorder: ProbabilisticReorderModel::new(
                config.reordering_rate,
                Duration::from_millis(config.reorder_delay_ms),
            )?,
        })
    }
}

pub struct ImpairmentEngine {
    config: Arc<SharedConfig>,
    generation: u64,
    models: Models,
    rng: SmallRng,
}

impl ImpairmentEngine {
    /// Builds the models from the active configuration. A configured seed
    /// makes the decision stream reproducible.
    pub fn new(config: Arc<SharedConfig>) -> Result<Self, CoreError> {
        let (generation, current) = config.load_versioned();
        let models = Models::from_config(&current)?;
        let rng = match current.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_rng(&mut rand::rng()),
        };
        Ok(Self {
            config,
            generation,
            models,
            rng,
        })
    }

    /// Runs the drop and delay checks for one packet.
    pub fn decide(&mut self) -> Verdict {
        self.refresh();
        let models = self.models;

        if models.loss.should_drop(&mut self.rng) {
            return Verdict::Drop;
        }
        if models.latency.should_delay(&mut self.rng) {
            let base = models.latency.apply_latency(Duration::ZERO);
            return Verdict::Defer(models.jitter.apply_jitter(base, &mut self.rng));
        }
        Verdict::Forward
    }

    /// Runs the reorder check for a packet about to leave. Returns the extra
    /// latency to apply, if any.
    pub fn reorder_hold(&mut self) -> Option<Duration> {
        self.refresh();
        let reorder = self.models.reorder;
        reorder
            .should_reorder(&mut self.rng)
            .then(|| reorder.hold())
    }

    // Picks up a replaced configuration. Decisions already made stay as they are.
    fn refresh(&mut self) {
        if self.config.generation() == self.generation {
            return;
        }
        let (generation, current) = self.config.load_versioned();
        match Models::from_config(&current) {
            Ok(models) => self.models = models,
            Err(e) => warn!("Keeping previous impairment models: {e}"),
        }
        self.generation = generation;
    }
}
