//! Egress: the processing-side sender handle and the reactor-side send task.
//!
//! The processing actor hands each outgoing packet to [`EgressSender`], which
//! applies the reorder hold (a synchronous pause of the calling thread) and
//! passes ownership over a channel. [`EgressTask`] runs on the reactor and
//! sends packets in the order they arrive on that channel.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use udpsim_core::events::PacketInfo;

use crate::shared::Pipeline;

pub fn channel(pipeline: Pipeline) -> (EgressSender, mpsc::UnboundedReceiver<PacketInfo>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EgressSender { tx, pipeline }, rx)
}

pub struct EgressSender {
    tx: mpsc::UnboundedSender<PacketInfo>,
    pipeline: Pipeline,
}

impl EgressSender {
    /// Queues `packet` for transmission, after pausing for `hold` when the
    /// reorder check fired.
    pub fn send(&self, packet: PacketInfo, hold: Option<Duration>) {
        if let Some(hold) = hold {
            std::thread::sleep(hold);
            self.pipeline.record_reordered();
            if self.pipeline.logging() {
                info!(
                    sequence = packet.sequence,
                    size = packet.len(),
                    source = %packet.source,
                    destination = %packet.destination,
                    "REORDERED (+{}ms)",
                    hold.as_millis()
                );
            }
        }

        if let Err(mpsc::error::SendError(packet)) = self.tx.send(packet) {
            debug!(sequence = packet.sequence, "Egress closed, packet discarded");
        }
    }
}

pub struct EgressTask {
    socket: Arc<UdpSocket>,
    rx: mpsc::UnboundedReceiver<PacketInfo>,
    pipeline: Pipeline,
}

impl EgressTask {
    pub fn new(
        socket: Arc<UdpSocket>,
        rx: mpsc::UnboundedReceiver<PacketInfo>,
        pipeline: Pipeline,
    ) -> Self {
        Self {
            socket,
            rx,
            pipeline,
        }
    }

    /// Sends until the channel closes or shutdown is signalled. Packets still
    /// queued at shutdown are discarded.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let Self {
            socket,
            mut rx,
            pipeline,
        } = self;
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                next = rx.recv() => match next {
                    Some(packet) => transmit(&socket, &pipeline, packet).await,
                    None => break,
                },
            }
        }
        debug!("Egress task stopped");
    }
}

async fn transmit(socket: &UdpSocket, pipeline: &Pipeline, packet: PacketInfo) {
    match socket.send_to(&packet.payload, packet.destination).await {
        Ok(sent) => {
            let delay = packet.elapsed_at(Instant::now());
            let delay_ms = delay.as_secs_f64() * 1_000.0;
            pipeline.record_sent(sent, delay_ms);
            if pipeline.logging() {
                info!(
                    sequence = packet.sequence,
                    size = sent,
                    source = %packet.source,
                    destination = %packet.destination,
                    "FORWARDED ({delay_ms:.1}ms)"
                );
            }
        }
        Err(e) => log_send_error(packet.sequence, packet.destination, &e),
    }
}

fn log_send_error(sequence: u64, destination: SocketAddr, error: &std::io::Error) {
    warn!(sequence, %destination, "Send failed: {error}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::SharedConfig;
    use bytes::Bytes;
    use udpsim_config::NetworkConfig;
    use udpsim_core::NetworkStats;
    use udpsim_telemetry::MetricsRecorder;

    fn pipeline() -> Pipeline {
        Pipeline {
            config: Arc::new(SharedConfig::new(NetworkConfig {
                enable_logging: false,
                ..NetworkConfig::default()
            })),
            stats: Arc::new(NetworkStats::new()),
            metrics: MetricsRecorder::new().unwrap(),
        }
    }

    fn packet(sequence: u64, destination: SocketAddr, payload: &'static [u8]) -> PacketInfo {
        PacketInfo::new(
            sequence,
            Bytes::from_static(payload),
            "127.0.0.1:1".parse().unwrap(),
            destination,
            Instant::now(),
        )
    }

    #[test]
    fn reorder_hold_pauses_and_counts() {
        let pipeline = pipeline();
        let (sender, mut rx) = channel(pipeline.clone());
        let destination = "127.0.0.1:9".parse().unwrap();

        let started = Instant::now();
        sender.send(packet(1, destination, b"a"), Some(Duration::from_millis(10)));
        sender.send(packet(2, destination, b"b"), None);

        assert!(started.elapsed() >= Duration::from_millis(10));
        assert_eq!(pipeline.stats.snapshot().packets_reordered, 1);
        assert_eq!(rx.try_recv().unwrap().sequence, 1);
        assert_eq!(rx.try_recv().unwrap().sequence, 2);
    }

    #[test]
    fn send_after_close_is_harmless() {
        let (sender, rx) = channel(pipeline());
        drop(rx);
        sender.send(packet(1, "127.0.0.1:9".parse().unwrap(), b"x"), None);
    }

    #[tokio::test]
    async fn task_forwards_in_channel_order_and_records() {
        let target = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let destination = target.local_addr().unwrap();
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());

        let pipeline = pipeline();
        let (sender, rx) = channel(pipeline.clone());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(EgressTask::new(socket, rx, pipeline.clone()).run(shutdown_rx));

        sender.send(packet(1, destination, b"first"), None);
        sender.send(packet(2, destination, b"second!"), None);

        let mut buf = [0u8; 64];
        let (n, _) = target.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"first");
        let (n, _) = target.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"second!");

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();

        let snapshot = pipeline.stats.snapshot();
        assert_eq!(snapshot.packets_sent, 2);
        assert_eq!(snapshot.total_bytes_sent, 12);
    }

    #[tokio::test]
    async fn failed_send_counts_nothing_and_task_keeps_running() {
        let target = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let destination = target.local_addr().unwrap();
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());

        let pipeline = pipeline();
        let (sender, rx) = channel(pipeline.clone());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(EgressTask::new(socket, rx, pipeline.clone()).run(shutdown_rx));

        // An IPv4-bound socket cannot reach an IPv6 destination.
        sender.send(packet(1, "[::1]:9".parse().unwrap(), b"unreachable"), None);
        sender.send(packet(2, destination, b"ok"), None);

        let mut buf = [0u8; 64];
        let (n, _) = target.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"ok");

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();

        let snapshot = pipeline.stats.snapshot();
        assert_eq!(snapshot.packets_sent, 1);
        assert_eq!(snapshot.total_bytes_sent, 2);
        assert_eq!(snapshot.packets_dropped, 0);
        assert_eq!(snapshot.packets_delayed, 0);
        assert_eq!(snapshot.packets_reordered, 0);
    }
}
