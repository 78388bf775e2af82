//! Buffer benchmark: ingestion throughput at token-streaming rates.
//!
//! Target: 100+ deltas per frame without measurable cost

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ralph_stream::{PerformanceConfig, StreamBuffer, StreamEvent};
use std::time::{Duration, Instant};

fn text(i: usize) -> StreamEvent {
    StreamEvent::TextDelta { index: Some(0), text: format!("tok{i} ") }
}

fn ingest_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest_text");

    for count in [100, 1000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut buffer = StreamBuffer::new(PerformanceConfig::default());
                let t0 = Instant::now();
                for i in 0..count {
                    buffer.ingest_at(text(i), t0);
                }
                black_box(buffer.drain_at(t0).len())
            });
        });
    }

    group.finish();
}

fn ingest_with_eviction(c: &mut Criterion) {
    c.bench_function("ingest_pings_past_threshold", |b| {
        b.iter(|| {
            let mut buffer = StreamBuffer::new(PerformanceConfig::default());
            let t0 = Instant::now();
            for i in 0..12_000u64 {
                buffer.ingest_at(StreamEvent::Ping, t0 + Duration::from_micros(i));
            }
            black_box(buffer.memory_stats())
        });
    });
}

criterion_group!(benches, ingest_text, ingest_with_eviction);
criterion_main!(benches);
