//! Packet envelope carried through the simulator pipeline.

use bytes::Bytes;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Largest payload a single UDP datagram can carry.
pub const MAX_DATAGRAM_SIZE: usize = 65_535;

/// A received datagram plus the metadata the simulator tracks for it.
///
/// Ownership moves from stage to stage (queue, engine, deferred store,
/// egress); no stage keeps a reference after handing it off.
#[derive(Clone, Debug)]
pub struct PacketInfo {
    /// Payload bytes, forwarded unmodified.
    pub payload: Bytes,

    /// Peer that sent the datagram to the listening socket.
    pub source: SocketAddr,

    /// Where the datagram will be forwarded.
    pub destination: SocketAddr,

    /// Monotonic receive timestamp.
    pub received_at: Instant,

    /// Per-instance arrival order, assigned once at ingress.
    pub sequence: u64,

    /// Set only when the packet is parked in the deferred delivery store.
    pub scheduled_send: Option<Instant>,
}

impl PacketInfo {
    #[inline]
    pub fn new(
        sequence: u64,
        payload: Bytes,
        source: SocketAddr,
        destination: SocketAddr,
        received_at: Instant,
    ) -> Self {
        Self {
            payload,
            source,
            destination,
            received_at,
            sequence,
            scheduled_send: None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Time spent inside the simulator as of `now`.
    #[inline]
    pub fn elapsed_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.received_at)
    }

    /// True once `now` has reached the scheduled send time. Packets that were
    /// never scheduled are always due.
    #[inline]
    pub fn is_due(&self, now: Instant) -> bool {
        self.scheduled_send.map_or(true, |at| at <= now)
    }
}
