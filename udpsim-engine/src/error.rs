use std::net::SocketAddr;

use thiserror::Error;
use udpsim_config::ConfigError;
use udpsim_core::CoreError;

#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("Failed to resolve '{host}': {reason}")]
    Resolution { host: String, reason: String },

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid impairment model: {0}")]
    Core(#[from] CoreError),

    #[error("Simulator is already running")]
    AlreadyRunning,

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
