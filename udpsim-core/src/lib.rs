//! # udpsim-core
//!
//! Building blocks shared by the UDP network-condition simulator: the packet
//! envelope, the pending queue between ingress and processing, the
//! impairment models, and the statistics aggregator.
//!
//! ### Key Submodules:
//! - `events`: `PacketInfo` and the blocking `PendingQueue`
//! - `network`: Network condition models (loss/latency/jitter/reorder)
//! - `stats`: Atomic counters plus lock-guarded delay statistics

pub mod error;
pub mod events;
pub mod network;
pub mod stats;

pub mod prelude {
    pub use crate::error::*;
    pub use crate::events::*;
    pub use crate::network::*;
    pub use crate::stats::*;
}

pub use error::CoreError;
pub use stats::{NetworkStats, StatsSnapshot};
