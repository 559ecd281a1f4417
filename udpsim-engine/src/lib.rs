//! # udpsim-engine
//!
//! The UDP network-condition simulator. A [`Simulator`] listens on one UDP
//! endpoint, forwards every datagram to a fixed target, and injects loss,
//! delay, jitter and reorder latency on the way.
//!
//! Data flow:
//! `ingress -> pending queue -> processor -> {drop | deferred store -> egress | egress}`

pub mod deferred;
pub mod egress;
pub mod error;
pub mod impairment;
pub mod ingress;
pub mod processor;
pub mod resolver;
pub mod shared;
pub mod simulator;

pub use error::SimulatorError;
pub use impairment::{ImpairmentEngine, Verdict};
pub use simulator::Simulator;

pub mod prelude {
    pub use super::{ImpairmentEngine, Simulator, SimulatorError, Verdict};
    pub use udpsim_config::NetworkConfig;
    pub use udpsim_core::StatsSnapshot;
}
