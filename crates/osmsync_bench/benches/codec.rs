//! OSM XML codec benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use osmsync_bench::{edited_child, random_network};
use osmsync_codec::{decode_document, encode_document, encode_osc, EncodeOptions};
use osmsync_protocol::{diff, Osc};

/// Benchmark encoding documents of increasing size.
fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_document");

    for size in [100, 1_000, 10_000] {
        let doc = random_network(size, 10);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &doc, |b, doc| {
            b.iter(|| black_box(encode_document(black_box(doc)).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark decoding documents of increasing size.
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_document");

    for size in [100, 1_000, 10_000] {
        let xml = encode_document(&random_network(size, 10)).unwrap();
        group.throughput(Throughput::Bytes(xml.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &xml, |b, xml| {
            b.iter(|| black_box(decode_document(black_box(xml)).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark encoding an upload payload.
fn bench_encode_upload(c: &mut Criterion) {
    let parent = random_network(5_000, 20);
    let osc = Osc::from_diff(diff(&parent, &edited_child(&parent, 0.1)));
    let options = EncodeOptions::upload(1);
    c.bench_function("encode_upload_5000", |b| {
        b.iter(|| black_box(encode_osc(black_box(&osc), &options).unwrap()));
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_encode_upload);

criterion_main!(benches);
