use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use sendwire_client::client::rendezvous::Rendezvous;
use std::{sync::Arc, thread, time::Instant};

// Hand-offs per benchmark iteration.
const HANDOFFS: usize = 1024;

/// Arm, fire and wait on one thread: the uncontended cost of a cycle.
fn bench_same_thread(c: &mut Criterion) {
    let mut group = c.benchmark_group("rendezvous/same_thread");
    group.throughput(Throughput::Elements(HANDOFFS as u64));

    group.bench_function(format!("elems/{HANDOFFS}"), |b| {
        let slot = Rendezvous::new();
        b.iter(|| {
            for i in 0..HANDOFFS {
                slot.arm().unwrap();
                slot.fire(i).unwrap();
                black_box(slot.wait().unwrap());
            }
        });
    });

    group.finish();
}

/// Ping-pong between a firing thread and a waiting thread, the pattern the
/// round-trip adapter runs once per item.
fn bench_cross_thread(c: &mut Criterion) {
    let mut group = c.benchmark_group("rendezvous/cross_thread");
    group.throughput(Throughput::Elements(HANDOFFS as u64));

    group.bench_function(format!("elems/{HANDOFFS}"), |b| {
        b.iter_custom(|iters| {
            let request = Arc::new(Rendezvous::<usize>::new());
            let reply = Arc::new(Rendezvous::<usize>::new());
            let total = iters as usize * HANDOFFS;

            let peer = {
                let request = Arc::clone(&request);
                let reply = Arc::clone(&reply);
                thread::spawn(move || {
                    for _ in 0..total {
                        let n = request.wait().unwrap();
                        // Spin until the caller armed its side.
                        while reply.fire(n).is_err() {
                            core::hint::spin_loop();
                        }
                    }
                })
            };

            let start = Instant::now();
            for i in 0..total {
                reply.arm().unwrap();
                // The peer may still be between cycles.
                while request.is_armed() || request.is_fired() {
                    core::hint::spin_loop();
                }
                request.arm().unwrap();
                request.fire(i).unwrap();
                black_box(reply.wait().unwrap());
            }
            let elapsed = start.elapsed();

            peer.join().unwrap();
            elapsed
        });
    });

    group.finish();
}

criterion_group!(benches, bench_same_thread, bench_cross_thread);
criterion_main!(benches);
