//! Sync round-trip benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use habitsync_bench::generate_changes;
use habitsync_protocol::SyncRequest;
use habitsync_server::{RequestHandler, ServerConfig, StaticAuthenticator, SyncServer, SYNC_PATH};
use habitsync_store::EntityStore;
use std::sync::Arc;
use uuid::Uuid;

fn handler() -> RequestHandler {
    let store = Arc::new(EntityStore::open_in_memory().unwrap());
    RequestHandler::new(store, ServerConfig::new().with_max_push_batch(100_000))
}

/// Benchmark a push of N habits (4 logs each) plus the pull that follows.
fn bench_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("push");

    for habits in [1, 10, 100].iter() {
        group.throughput(Throughput::Elements(*habits as u64 * 5));
        group.bench_with_input(BenchmarkId::from_parameter(habits), habits, |b, &habits| {
            let handler = handler();
            let user = Uuid::new_v4();
            let changes = generate_changes(habits, 4);

            b.iter(|| {
                let request = SyncRequest::new(0, black_box(changes.clone()));
                black_box(handler.handle_sync(user, request).unwrap());
            });
        });
    }
    group.finish();
}

/// Benchmark pulls against a store shared with other users.
fn bench_pull(c: &mut Criterion) {
    let mut group = c.benchmark_group("pull");

    for habits in [100, 1000].iter() {
        let handler = handler();
        let user = Uuid::new_v4();
        for _ in 0..4 {
            handler
                .handle_sync(Uuid::new_v4(), SyncRequest::new(0, generate_changes(habits / 4, 2)))
                .unwrap();
        }
        let cursor = handler
            .handle_sync(user, SyncRequest::new(0, generate_changes(*habits, 2)))
            .unwrap()
            .timestamp;

        group.bench_with_input(BenchmarkId::new("full", habits), habits, |b, _| {
            b.iter(|| black_box(handler.handle_sync(user, SyncRequest::pull(0)).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("up_to_date", habits), habits, |b, _| {
            b.iter(|| black_box(handler.handle_sync(user, SyncRequest::pull(cursor)).unwrap()));
        });
    }
    group.finish();
}

/// Benchmark the JSON route, including decode and encode.
fn bench_http_route(c: &mut Criterion) {
    let store = Arc::new(EntityStore::open_in_memory().unwrap());
    let auth = StaticAuthenticator::new().with_token("bench", Uuid::new_v4());
    let server = SyncServer::new(store, ServerConfig::default(), Arc::new(auth));
    let body = SyncRequest::new(0, generate_changes(20, 5)).encode().unwrap();

    c.bench_function("handle_post/20x5", |b| {
        b.iter(|| {
            let reply = server.handle_post(SYNC_PATH, Some("Bearer bench"), black_box(&body));
            assert_eq!(reply.status, 200);
            black_box(reply);
        });
    });
}

criterion_group!(benches, bench_push, bench_pull, bench_http_route);
criterion_main!(benches);
