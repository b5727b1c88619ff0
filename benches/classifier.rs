//! Response classification benchmarks

use cmux_core::core::at::{classify, Markers, ResponseBuffer, RESPONSE_CAPACITY};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;

fn classify_benchmark(c: &mut Criterion) {
    let markers = Markers::default();
    let ok = b"\r\nSIMCOM_SIM900\r\n\r\nOK\r\n".to_vec();
    let error = b"\r\n+CME ERROR: 10\r\n\r\nERROR\r\n".to_vec();
    let partial = vec![b'x'; RESPONSE_CAPACITY - 1];

    let mut group = c.benchmark_group("classify");
    group.throughput(Throughput::Bytes(ok.len() as u64));

    group.bench_function("ok", |b| b.iter(|| black_box(classify(black_box(&ok), &markers))));
    group.bench_function("error", |b| b.iter(|| black_box(classify(black_box(&error), &markers))));
    group.bench_function("no_terminator", |b| {
        b.iter(|| black_box(classify(black_box(&partial), &markers)))
    });

    group.finish();
}

fn accumulate_benchmark(c: &mut Criterion) {
    // Answer to AT+GMM delivered a few bytes per read
    let reply = b"\r\nTelit LE910C1-EU\r\n\r\nOK\r\n";

    let mut group = c.benchmark_group("accumulate");
    group.throughput(Throughput::Bytes(reply.len() as u64));

    group.bench_function("chunks_of_4", |b| {
        b.iter(|| {
            let mut buffer = ResponseBuffer::new(RESPONSE_CAPACITY);
            let mut found = None;
            for chunk in reply.chunks(4) {
                if let Ok(Some(hit)) = buffer.push(black_box(chunk)) {
                    found = Some(hit);
                    break;
                }
            }
            black_box(found)
        })
    });

    group.finish();
}

criterion_group!(benches, classify_benchmark, accumulate_benchmark);
criterion_main!(benches);
