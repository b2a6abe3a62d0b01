//! Entity store benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use habitsync_bench::generate_habits;
use habitsync_store::{EntityStore, HabitRecord, StoreConfig, StoreResult};
use tempfile::TempDir;
use uuid::Uuid;

fn commit(store: &EntityStore, records: &[HabitRecord]) {
    store
        .write(0, |txn| -> StoreResult<()> {
            for record in records {
                txn.put_habit(record.clone());
            }
            Ok(())
        })
        .unwrap();
}

fn records(count: usize) -> Vec<HabitRecord> {
    let owner = Uuid::new_v4();
    generate_habits(count)
        .iter()
        .map(|h| HabitRecord::from_wire(owner, h))
        .collect()
}

/// Benchmark commits of different sizes in memory.
fn bench_commit_memory(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit_memory");

    for size in [1, 10, 100].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let store = EntityStore::open_in_memory().unwrap();
            let batch = records(size);
            b.iter(|| commit(&store, black_box(&batch)));
        });
    }
    group.finish();
}

/// Benchmark file commits with and without fsync.
fn bench_commit_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit_file");
    group.sample_size(20);

    for sync in [false, true] {
        group.bench_function(if sync { "fsync" } else { "no_fsync" }, |b| {
            let dir = TempDir::new().unwrap();
            let config = StoreConfig::new().sync_on_commit(sync);
            let store = EntityStore::open(dir.path(), config).unwrap();
            let batch = records(10);
            b.iter(|| commit(&store, black_box(&batch)));
        });
    }
    group.finish();
}

/// Benchmark journal replay on open.
fn bench_recovery(c: &mut Criterion) {
    let mut group = c.benchmark_group("recovery");
    group.sample_size(10);

    for batches in [100, 1000].iter() {
        let dir = TempDir::new().unwrap();
        {
            let config = StoreConfig::new().sync_on_commit(false);
            let store = EntityStore::open(dir.path(), config).unwrap();
            for _ in 0..*batches {
                commit(&store, &records(10));
            }
        }

        group.bench_with_input(BenchmarkId::from_parameter(batches), batches, |b, _| {
            b.iter(|| {
                let store = EntityStore::open(dir.path(), StoreConfig::default()).unwrap();
                black_box(store.stats().unwrap());
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_commit_memory,
    bench_commit_file,
    bench_recovery,
);
criterion_main!(benches);
