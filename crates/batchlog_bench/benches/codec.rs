//! Block codec benchmarks.

use batchlog_bench::generate_events;
use batchlog_codec::{decode_batch, encode_event, BatchEncoder, JsonMetaFormat, RawBatchEvent, RawMetaFormat};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn encode_all(events: &[RawBatchEvent]) -> Vec<u8> {
    let mut encoder = BatchEncoder::new(&RawMetaFormat);
    for event in events {
        encoder.encode(event).unwrap();
    }
    encoder.into_bytes()
}

/// Benchmark framing a single event.
fn bench_encode_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_event");

    for size in [64, 256, 1024, 4096, 16384].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let event = RawBatchEvent::with_metadata(vec![0u8; size], b"{}".to_vec());
            b.iter(|| {
                let result = encode_event(black_box(&event), &RawMetaFormat).unwrap();
                black_box(result);
            });
        });
    }

    group.finish();
}

/// Benchmark decoding whole segments.
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_batch");

    for count in [10, 100, 500].iter() {
        let bytes = encode_all(&generate_events(*count, 256));
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::new("raw", count), &bytes, |b, bytes| {
            b.iter(|| {
                let result = decode_batch(black_box(bytes), &RawMetaFormat);
                black_box(result);
            });
        });
    }

    // JSON meta validation on every record
    let events: Vec<_> = (0..100)
        .map(|i| RawBatchEvent::with_metadata(vec![0u8; 256], format!(r#"{{"seq":{i}}}"#).into_bytes()))
        .collect();
    let bytes = encode_all(&events);
    group.bench_function("json_100", |b| {
        b.iter(|| {
            let result = decode_batch(black_box(&bytes), &JsonMetaFormat);
            black_box(result);
        });
    });

    group.finish();
}

/// Benchmark encoder reuse.
fn bench_encoder_reuse(c: &mut Criterion) {
    c.bench_function("encoder_reuse_100", |b| {
        let events = generate_events(100, 64);

        b.iter(|| {
            let mut encoder = BatchEncoder::new(&RawMetaFormat);
            for event in &events {
                encoder.encode(black_box(event)).unwrap();
            }
            black_box(encoder.into_bytes());
        });
    });
}

criterion_group!(benches, bench_encode_size, bench_decode, bench_encoder_reuse);

criterion_main!(benches);
