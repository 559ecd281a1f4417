//! ## udpsim-telemetry::metrics
//! **Prometheus registry mirroring the simulator's traffic counters**

use std::fmt;

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    /// Packets by outcome: received, sent, dropped, delayed, reordered.
    pub packets: IntCounterVec,
    /// Bytes by direction: in, out.
    pub bytes: IntCounterVec,
    /// Receive-to-send latency of forwarded packets.
    pub forward_delay: Histogram,
}

impl fmt::Debug for MetricsRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsRecorder")
            .field("forward_delay_samples", &self.forward_delay.get_sample_count())
            .finish_non_exhaustive()
    }
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let packets = IntCounterVec::new(
            Opts::new("udpsim_packets_total", "Packets seen by the simulator"),
            &["outcome"],
        )?;
        let bytes = IntCounterVec::new(
            Opts::new("udpsim_bytes_total", "Payload bytes through the simulator"),
            &["direction"],
        )?;
        let forward_delay = Histogram::with_opts(
            HistogramOpts::new(
                "udpsim_forward_delay_ms",
                "Time from receipt to completed send",
            )
            .buckets(vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1_000.0]),
        )?;

        registry.register(Box::new(packets.clone()))?;
        registry.register(Box::new(bytes.clone()))?;
        registry.register(Box::new(forward_delay.clone()))?;

        Ok(Self {
            registry,
            packets,
            bytes,
            forward_delay,
        })
    }

    pub fn record_received(&self, bytes: usize) {
        self.packets.with_label_values(&["received"]).inc();
        self.bytes.with_label_values(&["in"]).inc_by(bytes as u64);
    }

    pub fn record_dropped(&self) {
        self.packets.with_label_values(&["dropped"]).inc();
    }

    pub fn record_delayed(&self) {
        self.packets.with_label_values(&["delayed"]).inc();
    }

    pub fn record_reordered(&self) {
        self.packets.with_label_values(&["reordered"]).inc();
    }

    pub fn record_sent(&self, bytes: usize, delay_ms: f64) {
        self.packets.with_label_values(&["sent"]).inc();
        self.bytes.with_label_values(&["out"]).inc_by(bytes as u64);
        self.forward_delay.observe(delay_ms);
    }

    /// Renders the registry in the Prometheus text exposition format.
    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_show_up_in_exposition() {
        let metrics = MetricsRecorder::new().unwrap();
        metrics.record_received(100);
        metrics.record_received(50);
        metrics.record_dropped();
        metrics.record_sent(50, 12.0);

        assert_eq!(metrics.packets.with_label_values(&["received"]).get(), 2);
        assert_eq!(metrics.bytes.with_label_values(&["in"]).get(), 150);
        assert_eq!(metrics.forward_delay.get_sample_count(), 1);

        let text = metrics.gather_metrics().unwrap();
        assert!(text.contains("udpsim_packets_total{outcome=\"dropped\"} 1"));
        assert!(text.contains("udpsim_bytes_total{direction=\"out\"} 50"));
        assert!(text.contains("udpsim_forward_delay_ms_count 1"));
    }

    #[test]
    fn independent_recorders_do_not_collide() {
        let a = MetricsRecorder::new().unwrap();
        let b = MetricsRecorder::new().unwrap();
        a.record_reordered();
        assert_eq!(b.packets.with_label_values(&["reordered"]).get(), 0);
    }
}
