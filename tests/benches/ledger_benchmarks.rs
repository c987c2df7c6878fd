//! # Courier-Chain Ledger Benchmarks
//!
//! | Area            | Operation                     | Target        |
//! |-----------------|-------------------------------|---------------|
//! | cc-02 hashing   | Merkle root over a full batch | < 50ms @ 10k  |
//! | cc-02 hashing   | nonce search (`..00` suffix)  | < 1ms average |
//! | cc-02 proofs    | proof build + verify          | < 1ms         |
//! | cc-01 mempool   | add at capacity (evicting)    | < 1µs per add |

use cc_01_mempool::Mempool;
use cc_02_ledger::domain::{find_nonce, merkle_proof, merkle_root, verify_merkle_proof};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use shared_types::{MempoolEntry, TransactionKind};
use std::time::Duration;

fn batch(size: usize) -> Vec<MempoolEntry> {
    let mut rng = rand::thread_rng();
    (0..size)
        .map(|i| {
            MempoolEntry::new(
                TransactionKind::DirectMessage,
                format!("msg-{i}-{}", rng.gen::<u32>()),
                1_700_000_000_000_000_000 + i as u64,
            )
        })
        .collect()
}

// ============================================================================
// CC-02: Merkle root and proofs
// ============================================================================

fn bench_merkle(c: &mut Criterion) {
    let mut group = c.benchmark_group("cc-02-merkle");
    group.measurement_time(Duration::from_secs(5));

    for size in [10, 100, 1_000, 10_000] {
        let entries = batch(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("merkle_root", size), &entries, |b, entries| {
            b.iter(|| black_box(merkle_root(entries)))
        });
    }

    let entries = batch(1_000);
    let root = merkle_root(&entries);
    group.bench_function("proof_build_and_verify_1000", |b| {
        b.iter(|| {
            let proof = merkle_proof(&entries, 517).unwrap();
            black_box(verify_merkle_proof(&proof, &root))
        })
    });
    group.finish();
}

// ============================================================================
// CC-02: Nonce search
// ============================================================================

fn bench_nonce_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("cc-02-nonce");
    let root = merkle_root(&batch(100));
    let previous = "00".repeat(32);

    let mut timestamp = 1_700_000_000_000_000_000u64;
    group.bench_function("find_nonce", |b| {
        b.iter(|| {
            timestamp += 1;
            black_box(find_nonce(&previous, timestamp, &root))
        })
    });
    group.finish();
}

// ============================================================================
// CC-01: Mempool
// ============================================================================

fn bench_mempool_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("cc-01-mempool");
    let entries = batch(10_000);

    group.throughput(Throughput::Elements(entries.len() as u64));
    group.bench_function("add_evicting_capacity_1000", |b| {
        b.iter(|| {
            let pool = Mempool::with_capacity(1_000);
            for entry in &entries {
                black_box(pool.add(entry.clone()));
            }
        })
    });
    group.finish();
}

criterion_group!(benches, bench_merkle, bench_nonce_search, bench_mempool_add);
criterion_main!(benches);
