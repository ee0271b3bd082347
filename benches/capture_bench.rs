//! Benchmarks for Pitchside capture
//!
//! Run with: cargo bench

use pitchside::capture::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;
use tempfile::tempdir;

fn create_test_events(count: usize) -> Vec<DiagnosticEvent> {
    (0..count)
        .map(|i| {
            DiagnosticEvent::console_error(format!("lineup refresh failed ({})", i))
                .location("LineupBuilder.jsx", 47, 12)
        })
        .collect()
}

fn bench_ring(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring");

    for size in [100, 1000, 10000] {
        let events = create_test_events(size);

        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("push_{}", size), |b| {
            b.iter(|| {
                let mut ring = RingBuffer::new(DEFAULT_ERROR_CAPACITY);
                for event in &events {
                    black_box(ring.push(event.clone()));
                }
                ring
            })
        });
    }

    group.finish();
}

fn bench_service(c: &mut Criterion) {
    let mut group = c.benchmark_group("service");

    group.bench_function("log_error_memory", |b| {
        let service = DiagnosticsService::in_memory();
        let event = DiagnosticEvent::uncaught("x is undefined").location("app.js", 1, 1);

        b.iter(|| service.log_error(black_box(event.clone())));
    });

    group.bench_function("log_api_call_memory", |b| {
        let service = DiagnosticsService::in_memory();
        let record = ApiCallRecord::new("/api/predictions", Some("get"), 200, 12);

        b.iter(|| service.log_api_call(black_box(record.clone())));
    });

    group.bench_function("log_error_file", |b| {
        let dir = tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path()));
        let service = DiagnosticsService::new(store, ServiceConfig::default());
        let event = DiagnosticEvent::api_error("/api/shap", "GET", 500, "Internal Server Error");

        b.iter(|| service.log_error(black_box(event.clone())));
    });

    group.bench_function("generate_report_full", |b| {
        let service = DiagnosticsService::in_memory();
        for event in create_test_events(DEFAULT_ERROR_CAPACITY) {
            service.log_error(event);
        }

        b.iter(|| black_box(service.generate_report()));
    });

    group.finish();
}

criterion_group!(benches, bench_ring, bench_service);
criterion_main!(benches);
