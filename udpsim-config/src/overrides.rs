//! Explicit per-field overrides layered on top of file and environment.
//!
//! Only fields that were actually set are serialized, so an unset override
//! never masks a value coming from a lower layer.

use figment::{providers::Serialized, Figment};
use serde::Serialize;

#[derive(Debug, Default, Clone, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packet_loss_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jitter_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reordering_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_jitter_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_logging: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_statistics: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl ConfigOverrides {
    /// Merges the set fields over `figment`; they take precedence.
    pub fn apply(&self, figment: Figment) -> Figment {
        figment.merge(Serialized::defaults(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NetworkConfig;
    use figment::providers::{Format, Yaml};

    #[test]
    fn set_fields_win_and_unset_fields_fall_through() {
        let base = Figment::from(Serialized::defaults(NetworkConfig::default())).merge(
            Yaml::string("packet_loss_rate: 0.3\ndelay_rate: 0.4\ntarget_port: 7000"),
        );
        let overrides = ConfigOverrides {
            packet_loss_rate: Some(0.1),
            enable_logging: Some(false),
            ..Default::default()
        };

        let config = NetworkConfig::from_figment(overrides.apply(base)).unwrap();
        assert_eq!(config.packet_loss_rate, 0.1);
        assert_eq!(config.delay_rate, 0.4);
        assert_eq!(config.target_port, 7000);
        assert!(!config.enable_logging);
    }

    #[test]
    fn overrides_are_still_validated() {
        let base = Figment::from(Serialized::defaults(NetworkConfig::default()));
        let overrides = ConfigOverrides {
            jitter_rate: Some(3.0),
            ..Default::default()
        };
        assert!(NetworkConfig::from_figment(overrides.apply(base)).is_err());
    }
}
