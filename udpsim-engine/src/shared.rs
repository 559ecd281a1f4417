//! State shared by every pipeline stage: the active configuration and the
//! injected statistics/metrics recorders.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use udpsim_config::NetworkConfig;
use udpsim_core::NetworkStats;
use udpsim_telemetry::MetricsRecorder;

/// Holds the configuration that subsequent impairment decisions use.
///
/// Readers take a cheap `Arc` clone and never observe a half-written value.
/// Every replacement bumps `generation` so stages caching derived state can
/// tell when to rebuild it.
#[derive(Debug)]
pub struct SharedConfig {
    current: RwLock<Arc<NetworkConfig>>,
    generation: AtomicU64,
}

impl SharedConfig {
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(config)),
            generation: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn load(&self) -> Arc<NetworkConfig> {
        Arc::clone(&self.current.read())
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Loads the configuration together with the generation it belongs to.
    pub fn load_versioned(&self) -> (u64, Arc<NetworkConfig>) {
        let guard = self.current.read();
        (self.generation(), Arc::clone(&guard))
    }

    pub fn replace(&self, config: NetworkConfig) {
        let mut guard = self.current.write();
        *guard = Arc::new(config);
        self.generation.fetch_add(1, Ordering::Release);
    }

    #[inline]
    pub fn logging_enabled(&self) -> bool {
        self.current.read().enable_logging
    }
}

/// Handle each stage receives at construction. Every traffic event is
/// recorded in both the statistics aggregator and the metrics registry.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub config: Arc<SharedConfig>,
    pub stats: Arc<NetworkStats>,
    pub metrics: MetricsRecorder,
}

impl Pipeline {
    #[inline]
    pub fn logging(&self) -> bool {
        self.config.logging_enabled()
    }

    pub fn record_received(&self, bytes: usize) {
        self.stats.record_received(bytes);
        self.metrics.record_received(bytes);
    }

    pub fn record_dropped(&self) {
        self.stats.record_dropped();
        self.metrics.record_dropped();
    }

    pub fn record_delayed(&self) {
        self.stats.record_delayed();
        self.metrics.record_delayed();
    }

    pub fn record_reordered(&self) {
        self.stats.record_reordered();
        self.metrics.record_reordered();
    }

    pub fn record_sent(&self, bytes: usize, delay_ms: f64) {
        self.stats.record_sent(bytes, delay_ms);
        self.metrics.record_sent(bytes, delay_ms);
    }
}
