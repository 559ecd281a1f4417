//! ## udpsim-core::events
//! **Packet envelope and the pending queue that carries it from ingress to processing**

pub mod packet;
pub mod queue;

pub use packet::{PacketInfo, MAX_DATAGRAM_SIZE};
pub use queue::{PendingQueue, Pop, QueueError};
