//! Throughput of the core string/list/hash operations against a shared
//! `Datastore`, with and without the APC actively evicting.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use keyspace_domain::Key;
use keyspace_store::Datastore;

fn populated_store(capacity: usize, keys: usize) -> Datastore {
    let store = Datastore::new(capacity);
    for i in 0..keys {
        store.set(Key::from(format!("key:{i}")), format!("value:{i}").into_bytes(), 0);
    }
    store
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("datastore_get");
    for &keys in &[100usize, 10_000] {
        let store = populated_store(keys * 2, keys);
        group.bench_with_input(BenchmarkId::from_parameter(keys), &keys, |b, _| {
            b.iter(|| black_box(store.get(&Key::from("key:0"))))
        });
    }
    group.finish();
}

fn bench_set_under_pressure(c: &mut Criterion) {
    let mut group = c.benchmark_group("datastore_set_with_eviction");
    for &capacity in &[100usize, 1_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |b, &capacity| {
                let store = Datastore::new(capacity);
                let mut i = 0u64;
                b.iter(|| {
                    store.set(Key::from(format!("k:{i}")), b"v".to_vec(), 0);
                    i += 1;
                })
            },
        );
    }
    group.finish();
}

fn bench_list_push_pop(c: &mut Criterion) {
    c.bench_function("datastore_rpush_then_lpop", |b| {
        let store = Datastore::new(1_000);
        let key = Key::from("queue");
        b.iter(|| {
            store.rpush(&key, b"item".to_vec()).unwrap();
            black_box(store.lpop(&key).unwrap());
        })
    });
}

fn bench_hash_roundtrip(c: &mut Criterion) {
    c.bench_function("datastore_hset_hget", |b| {
        let store = Datastore::new(1_000);
        let key = Key::from("profile");
        b.iter(|| {
            store.hset(&key, b"field".to_vec(), b"value".to_vec()).unwrap();
            black_box(store.hget(&key, b"field"));
        })
    });
}

criterion_group!(
    benches,
    bench_get,
    bench_set_under_pressure,
    bench_list_push_pop,
    bench_hash_roundtrip
);
criterion_main!(benches);
