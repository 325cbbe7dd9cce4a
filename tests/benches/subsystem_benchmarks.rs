//! # Vertex Subsystem Benchmarks
//!
//! Throughput checks for the hot paths of the coordination layer:
//!
//! | Subsystem | Path | Expectation |
//! |-----------|------|-------------|
//! | vx-01 Gossip | Batch validation (hash + ed25519) | network-edge viable |
//! | vx-01 Gossip | Storage add / sweep | sub-millisecond per batch |
//! | vx-02 Consensus | Majority selection | negligible vs. signing |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::{Duration, Instant};
use vertex_tests::fixtures::signed_batch;
use vx_01_gossip::domain::{sort_canonical, RumorStorage, RumorValidator};
use vx_02_consensus::select_majority;

fn bench_batch_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("vx-01-gossip-validation");
    group.measurement_time(Duration::from_secs(10));

    for batch_size in [16usize, 64, 256] {
        let batch = signed_batch(1, batch_size, 128);
        let validator = RumorValidator::default();
        group.throughput(Throughput::Elements(batch_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            &batch,
            |b, batch| {
                b.iter(|| {
                    let (accepted, rejected) = validator.validate_batch(black_box(batch.clone()));
                    assert_eq!(rejected.len(), 0);
                    black_box(accepted)
                });
            },
        );
    }
    group.finish();
}

fn bench_storage_add_and_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("vx-01-gossip-storage");

    let batch = signed_batch(1, 256, 128);
    group.throughput(Throughput::Elements(batch.len() as u64));
    group.bench_function("add_rumors_256", |b| {
        b.iter(|| {
            let storage = RumorStorage::new(Duration::from_secs(2), Duration::from_secs(120));
            black_box(storage.add_rumors(black_box(batch.clone())))
        });
    });

    group.bench_function("sweep_expired_256", |b| {
        b.iter(|| {
            let storage = RumorStorage::new(Duration::from_secs(2), Duration::from_secs(120));
            storage.add_rumors(batch.clone());
            black_box(storage.sweep_expired_at(Instant::now() + Duration::from_secs(200)))
        });
    });
    group.finish();
}

fn bench_canonical_sort(c: &mut Criterion) {
    let mut batch = signed_batch(1, 128, 32);
    batch.extend(signed_batch(2, 128, 32));
    batch.reverse();

    c.bench_function("vx-01-gossip-canonical-sort-256", |b| {
        b.iter(|| {
            let mut batch = black_box(batch.clone());
            sort_canonical(&mut batch);
            black_box(batch)
        });
    });
}

fn bench_majority_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("vx-02-consensus-majority");

    for quorum in [4usize, 16, 64] {
        // Worst case: an even split between two candidate hashes.
        let proposals: Vec<[u8; 32]> = (0..quorum)
            .map(|i| if i % 2 == 0 { [0xFF; 32] } else { [0x01; 32] })
            .collect();
        group.bench_with_input(
            BenchmarkId::from_parameter(quorum),
            &proposals,
            |b, proposals| {
                b.iter(|| black_box(select_majority(black_box(proposals))));
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_batch_validation,
    bench_storage_add_and_sweep,
    bench_canonical_sort,
    bench_majority_selection
);
criterion_main!(benches);
