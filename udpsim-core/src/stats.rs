//! ## udpsim-core::stats
//! **Live traffic counters and running delay statistics**
//!
//! Counters are plain atomics. The delay figures (average/min/max) depend on
//! `packets_sent` and on each other, so every successful send updates them
//! together with the sent counter under one dedicated lock. `snapshot` and
//! `reset` take the same lock, which keeps them consistent with sends.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;

#[derive(Debug, Default, Clone, Copy)]
struct DelayStats {
    average_ms: f64,
    min_ms: f64,
    max_ms: f64,
}

/// Shared statistics aggregator, owned by the simulator and injected into
/// every stage that records traffic.
#[derive(Debug, Default)]
pub struct NetworkStats {
    packets_sent: AtomicU64,
    packets_received: AtomicU64,
    packets_dropped: AtomicU64,
    packets_delayed: AtomicU64,
    packets_reordered: AtomicU64,
    total_bytes_sent: AtomicU64,
    total_bytes_received: AtomicU64,
    delay: Mutex<DelayStats>,
}

impl NetworkStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a datagram accepted at ingress.
    #[inline]
    pub fn record_received(&self, bytes: usize) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
        self.total_bytes_received
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped(&self) {
        self.packets_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_delayed(&self) {
        self.packets_delayed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_reordered(&self) {
        self.packets_reordered.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a completed send and folds `delay_ms` into the running
    /// average, min and max.
    pub fn record_sent(&self, bytes: usize, delay_ms: f64) {
        let mut delay = self.delay.lock();
        let sent = self.packets_sent.fetch_add(1, Ordering::Relaxed) + 1;
        self.total_bytes_sent
            .fetch_add(bytes as u64, Ordering::Relaxed);

        delay.average_ms = (delay.average_ms * (sent - 1) as f64 + delay_ms) / sent as f64;
        delay.max_ms = delay.max_ms.max(delay_ms);
        delay.min_ms = if sent == 1 {
            delay_ms
        } else {
            delay.min_ms.min(delay_ms)
        };
    }

    /// Zeroes every counter and derived figure.
    pub fn reset(&self) {
        let mut delay = self.delay.lock();
        for counter in [
            &self.packets_sent,
            &self.packets_received,
            &self.packets_dropped,
            &self.packets_delayed,
            &self.packets_reordered,
            &self.total_bytes_sent,
            &self.total_bytes_received,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        *delay = DelayStats::default();
    }

    /// Read-only copy of the current figures.
    pub fn snapshot(&self) -> StatsSnapshot {
        let delay = self.delay.lock();
        StatsSnapshot {
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            packets_received: self.packets_received.load(Ordering::Relaxed),
            packets_dropped: self.packets_dropped.load(Ordering::Relaxed),
            packets_delayed: self.packets_delayed.load(Ordering::Relaxed),
            packets_reordered: self.packets_reordered.load(Ordering::Relaxed),
            total_bytes_sent: self.total_bytes_sent.load(Ordering::Relaxed),
            total_bytes_received: self.total_bytes_received.load(Ordering::Relaxed),
            average_delay_ms: delay.average_ms,
            min_delay_ms: delay.min_ms,
            max_delay_ms: delay.max_ms,
        }
    }
}

/// Point-in-time copy of [`NetworkStats`] handed to reporting code.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub packets_sent: u64,
    pub packets_received: u64,
    pub packets_dropped: u64,
    pub packets_delayed: u64,
    pub packets_reordered: u64,
    pub total_bytes_sent: u64,
    pub total_bytes_received: u64,
    pub average_delay_ms: f64,
    pub min_delay_ms: f64,
    pub max_delay_ms: f64,
}

impl StatsSnapshot {
    /// Observed drop ratio, 0 when nothing has been received.
    pub fn loss_rate(&self) -> f64 {
        if self.packets_received == 0 {
            0.0
        } else {
            self.packets_dropped as f64 / self.packets_received as f64
        }
    }

    /// One-line status for periodic reporting.
    pub fn status_line(&self) -> String {
        format!(
            "Stats: Sent:{} Recv:{} Dropped:{} Delayed:{} Reordered:{} Avg Delay:{:.1}ms",
            self.packets_sent,
            self.packets_received,
            self.packets_dropped,
            self.packets_delayed,
            self.packets_reordered,
            self.average_delay_ms
        )
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Network Statistics ===")?;
        writeln!(f, "Packets received: {}", self.packets_received)?;
        writeln!(f, "Packets sent: {}", self.packets_sent)?;
        writeln!(f, "Packets dropped: {}", self.packets_dropped)?;
        writeln!(f, "Packets delayed: {}", self.packets_delayed)?;
        writeln!(f, "Packets reordered: {}", self.packets_reordered)?;
        if self.packets_received > 0 {
            writeln!(f, "Actual loss rate: {:.2}%", self.loss_rate() * 100.0)?;
        }
        writeln!(f, "Total bytes received: {}", self.total_bytes_received)?;
        writeln!(f, "Total bytes sent: {}", self.total_bytes_sent)?;
        if self.packets_sent > 0 {
            writeln!(f, "Average delay: {:.2}ms", self.average_delay_ms)?;
            writeln!(f, "Min delay: {:.2}ms", self.min_delay_ms)?;
            writeln!(f, "Max delay: {:.2}ms", self.max_delay_ms)?;
        }
        write!(f, "==========================")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_counters_increment_and_read() {
        let stats = NetworkStats::new();
        stats.record_received(10);
        stats.record_received(20);
        stats.record_dropped();
        stats.record_delayed();
        stats.record_reordered();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.packets_received, 2);
        assert_eq!(snapshot.total_bytes_received, 30);
        assert_eq!(snapshot.packets_dropped, 1);
        assert_eq!(snapshot.packets_delayed, 1);
        assert_eq!(snapshot.packets_reordered, 1);
        assert_eq!(snapshot.packets_sent, 0);
    }

    #[test]
    fn test_delay_running_statistics() {
        let stats = NetworkStats::new();
        stats.record_sent(10, 4.0);
        stats.record_sent(10, 2.0);
        stats.record_sent(10, 9.0);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.packets_sent, 3);
        assert_eq!(snapshot.total_bytes_sent, 30);
        assert!((snapshot.average_delay_ms - 5.0).abs() < 1e-9);
        assert_eq!(snapshot.min_delay_ms, 2.0);
        assert_eq!(snapshot.max_delay_ms, 9.0);
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let stats = NetworkStats::new();
        stats.record_received(100);
        stats.record_dropped();
        stats.record_delayed();
        stats.record_reordered();
        stats.record_sent(100, 12.5);

        stats.reset();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());

        // Min restarts from the first send after a reset.
        stats.record_sent(1, 30.0);
        assert_eq!(stats.snapshot().min_delay_ms, 30.0);
    }

    #[test]
    fn test_loss_rate_and_summary() {
        let stats = NetworkStats::new();
        assert_eq!(stats.snapshot().loss_rate(), 0.0);

        for _ in 0..4 {
            stats.record_received(1);
        }
        stats.record_dropped();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.loss_rate(), 0.25);

        let summary = snapshot.to_string();
        assert!(summary.contains("Actual loss rate: 25.00%"));
        assert!(!summary.contains("Average delay"));
        assert!(snapshot.status_line().starts_with("Stats: Sent:0 Recv:4 Dropped:1"));
    }

    #[test]
    fn test_concurrent_sends_are_all_counted() {
        let stats = Arc::new(NetworkStats::new());
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let stats = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..500 {
                        stats.record_sent(2, 1.0);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.packets_sent, 2_000);
        assert_eq!(snapshot.total_bytes_sent, 4_000);
        assert!((snapshot.average_delay_ms - 1.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn running_average_matches_batch_mean(delays in prop::collection::vec(0.0f64..10_000.0, 1..200)) {
            let stats = NetworkStats::new();
            for d in &delays {
                stats.record_sent(1, *d);
            }
            let snapshot = stats.snapshot();
            let mean = delays.iter().sum::<f64>() / delays.len() as f64;
            let min = delays.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = delays.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

            prop_assert!((snapshot.average_delay_ms - mean).abs() < 1e-6 * mean.max(1.0));
            prop_assert_eq!(snapshot.min_delay_ms, min);
            prop_assert_eq!(snapshot.max_delay_ms, max);
            prop_assert!(snapshot.min_delay_ms <= snapshot.average_delay_ms + 1e-9);
            prop_assert!(snapshot.average_delay_ms <= snapshot.max_delay_ms + 1e-9);
        }
    }
}
