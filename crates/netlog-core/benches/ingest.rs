//! Benchmark for upload ingestion
//! Run: cargo bench -p netlog-core --bench ingest

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use netlog_core::ingest::{decode_with, truncate_chars, ENCODING_CANDIDATES};
use netlog_core::{build_prompt, UploadedLog};
use std::hint::black_box;

// squid access.log native format
const SQUID_LINE: &str = "1707571845.123    120 192.168.1.50 TCP_MISS/200 5123 GET http://cdn.example.com/app.js - HIER_DIRECT/93.184.216.34 application/javascript\n";

fn make_log(lines: usize) -> Vec<u8> {
    SQUID_LINE.repeat(lines).into_bytes()
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for lines in [100, 10_000] {
        let utf8 = make_log(lines);
        let mut latin1 = utf8.clone();
        // one invalid byte forces the fallback after a full utf-8 scan
        if let Some(last) = latin1.last_mut() {
            *last = 0xE9;
        }

        group.throughput(Throughput::Bytes(utf8.len() as u64));
        group.bench_with_input(BenchmarkId::new("utf8", lines), &utf8, |b, raw| {
            b.iter(|| decode_with(black_box(raw), ENCODING_CANDIDATES))
        });
        group.bench_with_input(BenchmarkId::new("latin1_fallback", lines), &latin1, |b, raw| {
            b.iter(|| decode_with(black_box(raw), ENCODING_CANDIDATES))
        });
    }

    group.finish();
}

fn bench_truncate(c: &mut Criterion) {
    let text = String::from_utf8(make_log(10_000)).unwrap();

    c.bench_function("truncate_15000_chars", |b| {
        b.iter(|| truncate_chars(black_box(&text), 15_000))
    });
}

fn bench_upload_to_prompt(c: &mut Criterion) {
    let raw = make_log(10_000);

    c.bench_function("upload_to_prompt", |b| {
        b.iter(|| {
            let log = UploadedLog::from_bytes("access.log", black_box(raw.clone())).unwrap();
            build_prompt(&log.sample(15_000))
        })
    });
}

criterion_group!(benches, bench_decode, bench_truncate, bench_upload_to_prompt);

criterion_main!(benches);
