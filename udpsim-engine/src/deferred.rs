//! Deferred delivery store.
//!
//! Packets scheduled for a later send are keyed by sequence number under a
//! lock of their own, separate from the pending queue lock. Sweeping removes
//! every entry whose send time has passed; due entries come out in key order.

use std::collections::BTreeMap;
use std::time::Instant;

use parking_lot::Mutex;
use udpsim_core::events::PacketInfo;

#[derive(Debug, Default)]
pub struct DeferredStore {
    entries: Mutex<BTreeMap<u64, PacketInfo>>,
}

impl DeferredStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks a packet until `send_at`.
    pub fn insert(&self, mut packet: PacketInfo, send_at: Instant) {
        packet.scheduled_send = Some(send_at);
        self.entries.lock().insert(packet.sequence, packet);
    }

    /// Removes and returns every packet due at `now`.
    pub fn take_due(&self, now: Instant) -> Vec<PacketInfo> {
        let mut entries = self.entries.lock();
        let due: Vec<u64> = entries
            .iter()
            .filter(|(_, packet)| packet.is_due(now))
            .map(|(sequence, _)| *sequence)
            .collect();
        due.into_iter()
            .filter_map(|sequence| entries.remove(&sequence))
            .collect()
    }

    /// Earliest scheduled send time among parked packets.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries
            .lock()
            .values()
            .filter_map(|packet| packet.scheduled_send)
            .min()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drops every parked packet, returning how many there were.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.lock();
        let count = entries.len();
        entries.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::time::Duration;

    fn packet(sequence: u64, received_at: Instant) -> PacketInfo {
        PacketInfo::new(
            sequence,
            Bytes::from_static(b"payload"),
            "127.0.0.1:1000".parse().unwrap(),
            "127.0.0.1:2000".parse().unwrap(),
            received_at,
        )
    }

    #[test]
    fn releases_only_due_packets() {
        let store = DeferredStore::new();
        let now = Instant::now();
        store.insert(packet(1, now), now + Duration::from_millis(50));
        store.insert(packet(2, now), now + Duration::from_millis(10));
        store.insert(packet(3, now), now + Duration::from_millis(30));

        let due = store.take_due(now + Duration::from_millis(30));
        let sequences: Vec<u64> = due.iter().map(|p| p.sequence).collect();
        assert_eq!(sequences, vec![2, 3]);
        assert_eq!(store.len(), 1);

        assert!(store.take_due(now + Duration::from_millis(40)).is_empty());
        assert_eq!(store.take_due(now + Duration::from_millis(50)).len(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn next_deadline_is_earliest_schedule() {
        let store = DeferredStore::new();
        assert_eq!(store.next_deadline(), None);

        let now = Instant::now();
        store.insert(packet(5, now), now + Duration::from_millis(80));
        store.insert(packet(6, now), now + Duration::from_millis(20));
        assert_eq!(store.next_deadline(), Some(now + Duration::from_millis(20)));
    }

    #[test]
    fn insert_stamps_schedule() {
        let store = DeferredStore::new();
        let now = Instant::now();
        let at = now + Duration::from_millis(5);
        store.insert(packet(9, now), at);

        let released = store.take_due(at);
        assert_eq!(released[0].scheduled_send, Some(at));
        assert_eq!(released[0].payload, Bytes::from_static(b"payload"));
    }

    #[test]
    fn clear_discards_everything() {
        let store = DeferredStore::new();
        let now = Instant::now();
        store.insert(packet(1, now), now);
        store.insert(packet(2, now), now);
        assert_eq!(store.clear(), 2);
        assert!(store.is_empty());
    }
}
