use cache::LruCache;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

const N_KEYS: usize = 10_000;

fn build_cache(capacity: usize) -> LruCache<String> {
    let mut c = LruCache::new(capacity);
    for i in 0..N_KEYS {
        c.put(format!("key{i}"), "x".repeat(100));
    }
    c
}

fn cache_put_benchmark(c: &mut Criterion) {
    c.bench_function("cache_put_10k", |b| {
        b.iter_batched(
            || LruCache::new(N_KEYS),
            |mut cache| {
                for i in 0..N_KEYS {
                    cache.put(format!("key{i}"), "x".repeat(100));
                }
            },
            BatchSize::SmallInput,
        );
    });
}

fn cache_get_hit_benchmark(c: &mut Criterion) {
    c.bench_function("cache_get_hit_10k", |b| {
        b.iter_batched(
            || build_cache(N_KEYS),
            |mut cache| {
                for i in 0..N_KEYS {
                    assert!(cache.get(&format!("key{i}")).is_some());
                }
            },
            BatchSize::LargeInput,
        );
    });
}

fn cache_churn_benchmark(c: &mut Criterion) {
    // Capacity far below the key space: every put evicts.
    c.bench_function("cache_churn_cap_1k", |b| {
        b.iter_batched(
            || LruCache::new(1_000),
            |mut cache| {
                for i in 0..N_KEYS {
                    cache.put(format!("key{i}"), "x".repeat(100));
                }
                assert_eq!(cache.len(), 1_000);
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    cache_put_benchmark,
    cache_get_hit_benchmark,
    cache_churn_benchmark
);
criterion_main!(benches);
