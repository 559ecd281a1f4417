//! Ingress receiver: one receive in flight at a time, re-armed after each
//! completion until shutdown.
//!
//! The next receive is issued once the current datagram has been recorded
//! and queued. Datagrams arriving in between wait in the socket's kernel
//! buffer.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use udpsim_core::events::{PacketInfo, PendingQueue, MAX_DATAGRAM_SIZE};

use crate::shared::Pipeline;

/// Issues sequence numbers: strictly increasing, no gaps, never reused.
#[derive(Debug, Default)]
pub struct SequenceCounter(AtomicU64);

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }

    /// Number of sequence numbers issued so far.
    pub fn issued(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct Ingress {
    socket: Arc<UdpSocket>,
    queue: Arc<PendingQueue<PacketInfo>>,
    sequence: SequenceCounter,
    target: SocketAddr,
    pipeline: Pipeline,
}

impl Ingress {
    pub fn new(
        socket: Arc<UdpSocket>,
        queue: Arc<PendingQueue<PacketInfo>>,
        target: SocketAddr,
        pipeline: Pipeline,
    ) -> Self {
        Self {
            socket,
            queue,
            sequence: SequenceCounter::new(),
            target,
            pipeline,
        }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok((len, source)) => {
                        if !self.accept(&buf[..len], source) {
                            break;
                        }
                    }
                    Err(e) => warn!("Receive failed: {e}"),
                },
            }
        }
        debug!(received = self.sequence.issued(), "Ingress stopped");
    }

    // Returns false once the queue has been closed.
    fn accept(&self, datagram: &[u8], source: SocketAddr) -> bool {
        if datagram.is_empty() {
            return true;
        }

        let packet = PacketInfo::new(
            self.sequence.next(),
            Bytes::copy_from_slice(datagram),
            source,
            self.target,
            Instant::now(),
        );
        self.pipeline.record_received(packet.len());
        if self.pipeline.logging() {
            info!(
                sequence = packet.sequence,
                size = packet.len(),
                source = %packet.source,
                destination = %packet.destination,
                "RECEIVED"
            );
        }

        self.queue.push(packet).is_ok()
    }
}
