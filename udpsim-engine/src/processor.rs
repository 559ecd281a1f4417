//! Processing actor: pulls packets off the pending queue, applies the
//! impairment verdict, and releases deferred packets once they are due.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};
use udpsim_core::events::{PacketInfo, PendingQueue, Pop};

use crate::deferred::DeferredStore;
use crate::egress::EgressSender;
use crate::impairment::{ImpairmentEngine, Verdict};
use crate::shared::Pipeline;

pub struct Processor {
    queue: Arc<PendingQueue<PacketInfo>>,
    deferred: Arc<DeferredStore>,
    engine: ImpairmentEngine,
    egress: EgressSender,
    pipeline: Pipeline,
}

impl Processor {
    pub fn new(
        queue: Arc<PendingQueue<PacketInfo>>,
        deferred: Arc<DeferredStore>,
        engine: ImpairmentEngine,
        egress: EgressSender,
        pipeline: Pipeline,
    ) -> Self {
        Self {
            queue,
            deferred,
            engine,
            egress,
            pipeline,
        }
    }

    /// Runs until the pending queue is closed. Waits are bounded by the
    /// earliest deferred send time so parked packets leave on schedule even
    /// when no new traffic arrives.
    pub fn run(mut self) {
        loop {
            match self.queue.pop_until(self.deferred.next_deadline()) {
                Pop::Item(packet) => self.process(packet),
                Pop::TimedOut => {}
                Pop::Closed => break,
            }
            self.sweep(Instant::now());
        }

        let discarded = self.deferred.clear();
        debug!(discarded, "Processor stopped");
    }

    pub fn process(&mut self, packet: PacketInfo) {
        match self.engine.decide() {
            Verdict::Drop => {
                self.pipeline.record_dropped();
                if self.pipeline.logging() {
                    info!(
                        sequence = packet.sequence,
                        size = packet.len(),
                        source = %packet.source,
                        destination = %packet.destination,
                        "DROPPED"
                    );
                }
            }
            Verdict::Defer(delay) => {
                self.pipeline.record_delayed();
                if self.pipeline.logging() {
                    info!(
                        sequence = packet.sequence,
                        size = packet.len(),
                        source = %packet.source,
                        destination = %packet.destination,
                        "DELAYED ({}ms)",
                        delay.as_millis()
                    );
                }
                self.deferred.insert(packet, Instant::now() + delay);
            }
            Verdict::Forward => self.forward(packet),
        }
    }

    /// Hands every packet due at `now` to egress.
    pub fn sweep(&mut self, now: Instant) {
        for packet in self.deferred.take_due(now) {
            self.forward(packet);
        }
    }

    fn forward(&mut self, packet: PacketInfo) {
        let hold = self.engine.reorder_hold();
        self.egress.send(packet, hold);
    }
}
