//! # udpsim Configuration System
//!
//! One immutable [`NetworkConfig`] value describes a simulator instance:
//! the impairment rates, the delay parameters, the two endpoints, and the
//! logging/statistics toggles.
//!
//! ## Features
//! - **Layered loading**: defaults, YAML file, `UDPSIM_*` environment, CLI flags
//! - **Validation**: out-of-range values are rejected, never clamped
//! - **Persistence**: `save_to_path` writes YAML that loads back unchanged

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

mod error;
mod overrides;
pub mod units;

pub use error::ConfigError;
pub use overrides::ConfigOverrides;

/// Default configuration file consulted by [`NetworkConfig::load`].
pub const DEFAULT_CONFIG_PATH: &str = "config/udpsim.yaml";

/// Prefix for environment overrides, e.g. `UDPSIM_PACKET_LOSS_RATE=5%`.
pub const ENV_PREFIX: &str = "UDPSIM_";

/// Network impairment and endpoint configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct NetworkConfig {
    /// Probability that a packet is dropped (0.0 to 1.0).
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(deserialize_with = "units::deserialize_rate")]
    pub packet_loss_rate: f64,

    /// Probability that a surviving packet is deferred (0.0 to 1.0).
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(deserialize_with = "units::deserialize_rate")]
    pub delay_rate: f64,

    /// Probability that a deferred packet also gets jitter (0.0 to 1.0).
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(deserialize_with = "units::deserialize_rate")]
    pub jitter_rate: f64,

    /// Probability that a packet is held briefly before egress (0.0 to 1.0).
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(alias = "reorder_rate", deserialize_with = "units::deserialize_rate")]
    pub reordering_rate: f64,

    /// Fixed delay applied to deferred packets (milliseconds).
    #[serde(deserialize_with = "units::deserialize_millis")]
    pub base_delay_ms: u64,

    /// Upper bound of the jitter added to deferred packets (milliseconds).
    #[serde(deserialize_with = "units::deserialize_millis")]
    pub max_jitter_ms: u64,

    /// Hold applied to packets picked for reordering (milliseconds).
    #[validate(range(max = 10_000))]
    #[serde(deserialize_with = "units::deserialize_millis")]
    pub reorder_delay_ms: u64,

    /// Address the listening socket binds to.
    #[validate(length(min = 1))]
    pub listen_host: String,

    /// Port the listening socket binds to (0 picks an ephemeral port).
    pub listen_port: u16,

    /// Host every datagram is forwarded to.
    #[validate(length(min = 1))]
    pub target_host: String,

    /// Port every datagram is forwarded to.
    #[validate(range(min = 1))]
    pub target_port: u16,

    /// Emit one log record per packet and stage.
    pub enable_logging: bool,

    /// Print periodic and final statistics.
    pub enable_statistics: bool,

    /// Seed for the impairment RNG; `None` seeds from system entropy.
    pub seed: Option<u64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            packet_loss_rate: 0.0,
            delay_rate: 0.0,
            jitter_rate: 0.0,
            reordering_rate: 0.0,
            base_delay_ms: 0,
            max_jitter_ms: 0,
            reorder_delay_ms: 10,
            listen_host: "0.0.0.0".into(),
            listen_port: 8080,
            target_host: "127.0.0.1".into(),
            target_port: 8081,
            enable_logging: true,
            enable_statistics: true,
            seed: None,
        }
    }
}

impl NetworkConfig {
    /// Load configuration from the default file and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/udpsim.yaml`, if present
    /// 3. `UDPSIM_*` environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment(None)?)
    }

    /// Load configuration from a specific file, then apply the environment.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment(Some(path.as_ref()))?)
    }

    /// Builds the layered provider chain without extracting it, so callers
    /// can merge further layers (e.g. CLI flags) on top.
    pub fn figment(path: Option<&Path>) -> Result<Figment, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(NetworkConfig::default()));

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::FileNotFound(PathBuf::from(path)));
                }
                figment = figment.merge(Yaml::file(path));
            }
            None => {
                if Path::new(DEFAULT_CONFIG_PATH).exists() {
                    figment = figment.merge(Yaml::file(DEFAULT_CONFIG_PATH));
                }
            }
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Extracts and validates a configuration from any figment.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate_all()?;
                Ok(config)
            })
    }

    /// Runs every field check, reporting all failures at once.
    pub fn validate_all(&self) -> Result<(), ConfigError> {
        let mut errors = self.validate().err().unwrap_or_else(ValidationErrors::new);
        // `range` compares with `<` and `>`, which NaN never fails.
        for (field, rate) in self.rates() {
            if rate.is_nan() {
                let mut error = ValidationError::new("range");
                error.message = Some(format!("{field} must be a number in [0.0, 1.0]").into());
                errors.add(field, error);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.into())
        }
    }

    fn rates(&self) -> [(&'static str, f64); 4] {
        [
            ("packet_loss_rate", self.packet_loss_rate),
            ("delay_rate", self.delay_rate),
            ("jitter_rate", self.jitter_rate),
            ("reordering_rate", self.reordering_rate),
        ]
    }

    /// Writes the configuration as YAML.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        let contents = format!("# UDP network simulator configuration\n{yaml}");
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Human-readable configuration block.
    pub fn summary(&self) -> String {
        let mut out = String::from("Current Configuration:\n");
        let _ = writeln!(out, "  Listen: {}:{}", self.listen_host, self.listen_port);
        let _ = writeln!(out, "  Target: {}:{}", self.target_host, self.target_port);
        let _ = writeln!(out, "  Packet Loss: {:.1}%", self.packet_loss_rate * 100.0);
        let _ = writeln!(out, "  Delay Rate: {:.1}%", self.delay_rate * 100.0);
        let _ = writeln!(out, "  Jitter Rate: {:.1}%", self.jitter_rate * 100.0);
        let _ = writeln!(out, "  Reorder Rate: {:.1}%", self.reordering_rate * 100.0);
        let _ = writeln!(out, "  Base Delay: {}ms", self.base_delay_ms);
        let _ = writeln!(out, "  Max Jitter: {}ms", self.max_jitter_ms);
        let _ = writeln!(out, "  Logging: {}", enabled(self.enable_logging));
        let _ = write!(out, "  Statistics: {}", enabled(self.enable_statistics));
        out
    }
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "Enabled"
    } else {
        "Disabled"
    }
}
