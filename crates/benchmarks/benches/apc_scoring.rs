//! Cost of the adaptive predictive cache's bookkeeping: recording accesses,
//! recomputing scores, and picking an eviction candidate out of a large key
//! population.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use keyspace_apc::AdaptivePredictiveCache;

fn populated_cache(keys: usize) -> AdaptivePredictiveCache {
    let mut cache = AdaptivePredictiveCache::new();
    for i in 0..keys {
        let key = format!("key:{i}");
        cache.record_access(key.as_bytes());
        cache.set_ttl(key.as_bytes(), 3600);
        cache.update_score(key.as_bytes());
    }
    cache
}

fn bench_record_access(c: &mut Criterion) {
    c.bench_function("apc_record_access", |b| {
        let mut cache = populated_cache(1_000);
        b.iter(|| cache.record_access(black_box(b"key:0")))
    });
}

fn bench_update_score(c: &mut Criterion) {
    c.bench_function("apc_update_score", |b| {
        let mut cache = populated_cache(1_000);
        b.iter(|| cache.update_score(black_box(b"key:0")))
    });
}

fn bench_evict_candidate(c: &mut Criterion) {
    let mut group = c.benchmark_group("apc_evict_candidate");
    for &keys in &[100usize, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(keys), &keys, |b, &keys| {
            b.iter_batched(
                || populated_cache(keys),
                |mut cache| black_box(cache.evict_candidate()),
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_record_access, bench_update_score, bench_evict_candidate);
criterion_main!(benches);
