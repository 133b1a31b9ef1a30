//! # Rate Limiter Benchmarks
//!
//! Hot-path cost of admission checks for buckets and registries.
//!
//! Run with: `cargo bench`

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use qrgate::{ClientIdentity, RateLimiterConfig, RateLimiterRegistry, TokenBucket};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn ip(n: u32) -> IpAddr {
    IpAddr::V4(Ipv4Addr::from(0x0A00_0000 | n))
}

/// Single bucket, committing and probing
fn bench_bucket_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("bucket_check");
    group.throughput(Throughput::Elements(1));

    for consume in [true, false] {
        group.bench_with_input(
            BenchmarkId::from_parameter(if consume { "consume" } else { "probe" }),
            &consume,
            |b, &consume| {
                let bucket = TokenBucket::new(1_000_000.0, Duration::from_secs(1)).unwrap();
                b.iter(|| std::hint::black_box(bucket.check(consume)));
            },
        );
    }

    // Empty bucket: every check is a denial
    group.bench_function("denied", |b| {
        let bucket = TokenBucket::new(1.0, Duration::from_secs(3600)).unwrap();
        bucket.check(true);
        b.iter(|| std::hint::black_box(bucket.check(true)));
    });

    group.finish();
}

/// Registry lookup of an existing identity
fn bench_registry_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_hit");
    group.throughput(Throughput::Elements(1));

    for tracked in [1u32, 1_000, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(tracked), &tracked, |b, &tracked| {
            let registry: RateLimiterRegistry<IpAddr> =
                RateLimiterRegistry::new(RateLimiterConfig::per_second(1_000_000)).unwrap();
            for n in 0..tracked {
                registry.check(&ip(n), true);
            }

            let mut n = 0;
            b.iter(|| {
                n = (n + 1) % tracked;
                std::hint::black_box(registry.check(&ip(n), true))
            });
        });
    }

    group.finish();
}

/// First sighting of an identity: bucket creation and insertion
fn bench_registry_miss(c: &mut Criterion) {
    c.bench_function("registry_miss", |b| {
        b.iter_batched(
            || RateLimiterRegistry::<IpAddr>::new(RateLimiterConfig::default()).unwrap(),
            |registry| {
                for n in 0..1_000 {
                    std::hint::black_box(registry.check(&ip(n), true));
                }
                registry
            },
            BatchSize::SmallInput,
        );
    });
}

/// Disabled registry short-circuit
fn bench_registry_bypass(c: &mut Criterion) {
    let registry: RateLimiterRegistry<ClientIdentity> =
        RateLimiterRegistry::new(RateLimiterConfig::default().with_enabled(false)).unwrap();
    let identity = ClientIdentity::Forwarded("198.51.100.1".to_string());

    c.bench_function("registry_bypass", |b| {
        b.iter(|| std::hint::black_box(registry.check(&identity, true)));
    });
}

/// Threads hammering distinct or shared identities
fn bench_concurrent(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent");
    const CHECKS_PER_THREAD: u32 = 1_000;

    for num_threads in [2u32, 4, 8] {
        group.throughput(Throughput::Elements(u64::from(num_threads * CHECKS_PER_THREAD)));

        for shared in [false, true] {
            let label = if shared { "shared_identity" } else { "distinct_identities" };
            group.bench_with_input(
                BenchmarkId::new(label, num_threads),
                &num_threads,
                |b, &num_threads| {
                    let registry: Arc<RateLimiterRegistry<IpAddr>> = Arc::new(
                        RateLimiterRegistry::new(RateLimiterConfig::per_second(u32::MAX)).unwrap(),
                    );

                    b.iter(|| {
                        let handles: Vec<_> = (0..num_threads)
                            .map(|t| {
                                let registry = Arc::clone(&registry);
                                let key = if shared { ip(0) } else { ip(t) };
                                thread::spawn(move || {
                                    for _ in 0..CHECKS_PER_THREAD {
                                        std::hint::black_box(registry.check(&key, true));
                                    }
                                })
                            })
                            .collect();

                        for handle in handles {
                            handle.join().unwrap();
                        }
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_bucket_check,
    bench_registry_hit,
    bench_registry_miss,
    bench_registry_bypass,
    bench_concurrent
);

criterion_main!(benches);
