//! Label extraction and observation benchmarks
//!
//! Measures the per-request cost paid by the collector:
//! - Resolving a schema's label names (cached after first use)
//! - Extracting values from a schema instance
//! - Incrementing a counter and observing a histogram for one request

#![allow(clippy::unwrap_used, clippy::expect_used)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use http_metrics::labels;
use http_metrics::metrics::{Counter, Histogram, DEFAULT_DURATION_BUCKETS};
use http_metrics::middleware::RequestLabels;
use http_metrics::MetricsRegistry;

fn sample() -> RequestLabels {
    RequestLabels {
        host: "api.example.com".to_string(),
        protocol: "HTTP/1.1".to_string(),
        endpoint: "GET /items/:id".to_string(),
        status: "200".to_string(),
        client_aborted: "false".to_string(),
    }
}

fn bench_resolve(c: &mut Criterion) {
    labels::resolve::<RequestLabels>().unwrap();

    c.bench_function("resolve_cached", |b| {
        b.iter(|| black_box(labels::resolve::<RequestLabels>().unwrap()));
    });
}

fn bench_extract(c: &mut Criterion) {
    let request = sample();

    c.bench_function("extract_request_labels", |b| {
        b.iter(|| black_box(labels::extract(black_box(&request)).unwrap()));
    });
}

fn bench_observe(c: &mut Criterion) {
    let registry = MetricsRegistry::new();
    let total = Counter::<RequestLabels>::register(&registry, "http_requests_total", "Requests.").unwrap();
    let duration = Histogram::<RequestLabels>::register(
        &registry,
        "http_request_duration_seconds",
        "Latency.",
        DEFAULT_DURATION_BUCKETS,
    )
    .unwrap();
    let request = sample();

    c.bench_function("count_and_observe", |b| {
        b.iter(|| {
            total.inc(black_box(&request));
            duration.observe(black_box(0.012), black_box(&request));
        });
    });
}

criterion_group!(benches, bench_resolve, bench_extract, bench_observe);
criterion_main!(benches);
