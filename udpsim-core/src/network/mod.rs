//! ## udpsim-core::network
//! **Network condition models (packet loss / latency / jitter / reordering)**
//!
//! Every model is a pure decision over a caller-supplied RNG, so one
//! random stream drives all checks for a packet and a seeded stream
//! reproduces a run exactly. Each check consumes exactly one uniform draw
//! in `[0, 1)` and fires when the draw is below the configured rate.
//!
//! ### Key Submodules:
//! - `packet_loss/`: Probabilistic drop decision
//! - `latency`: Probabilistic deferral with a fixed base delay
//! - `jitter/`: Probabilistic bounded extra delay
//! - `reorder`: Probabilistic fixed hold before egress

pub mod jitter;
pub mod latency;
pub mod packet_loss;
pub mod reorder;

pub use jitter::{JitterModel, ProbabilisticJitterModel};
pub use latency::{LatencyModel, ProbabilisticLatencyModel};
pub use packet_loss::{PacketLossModel, ProbabilisticLossModel};
pub use reorder::{ProbabilisticReorderModel, ReorderModel};

use rand::{Rng, RngCore};

/// One uniform draw compared against `probability`.
#[inline]
pub(crate) fn chance(rng: &mut dyn RngCore, probability: f64) -> bool {
    let draw: f64 = rng.random();
    draw < probability
}
