#[macro_use]
extern crate criterion;

use std::net::SocketAddr;
use std::time::Instant;

use bytes::Bytes;
use criterion::Criterion;

use udpsim_core::events::{PacketInfo, PendingQueue};

fn bench_pending_queue_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("pending_queue_throughput");
    let addr = SocketAddr::from(([127, 0, 0, 1], 9000));

    for batch in [1usize, 128, 1024] {
        group.throughput(criterion::Throughput::Elements(batch as u64)); // Packets per second
        group.bench_function(format!("batch_{}", batch), |b| {
            let queue = PendingQueue::new();
            let packet = PacketInfo::new(
                0,
                Bytes::from_static(b"test_payload"),
                addr,
                addr,
                Instant::now(),
            );
            b.iter(|| {
                for _ in 0..batch {
                    queue.push(packet.clone()).unwrap();
                }
                for _ in 0..batch {
                    queue.try_pop().unwrap();
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pending_queue_push_pop);
criterion_main!(benches);
