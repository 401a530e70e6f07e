//! Benchmarks for the card protocol codec.
//!
//! The bridge decodes one response per polling tick, so these exist to catch
//! accidental quadratic behaviour rather than to chase throughput.
//!
//! Run benchmarks with:
//! ```sh
//! cargo bench --bench codec_bench
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use tagbridge_protocol::identifier::{decode, encode_spaced};
use tagbridge_protocol::{TagIdentifier, read_identifier};

/// Build a raw `GET DATA` response for a UID of `len` bytes.
fn raw_response(len: usize) -> Vec<u8> {
    let mut raw: Vec<u8> = (0..len as u8).collect();
    raw.extend_from_slice(&[0x90, 0x00]);
    raw
}

/// Benchmark parsing raw responses of the three ISO 14443 UID sizes.
fn bench_read_identifier(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_identifier");

    for len in [4usize, 7, 10] {
        let raw = raw_response(len);
        group.throughput(Throughput::Bytes(raw.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &raw, |b, raw| {
            b.iter(|| black_box(read_identifier(black_box(raw)).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark printing an identifier in both forms.
fn bench_format(c: &mut Criterion) {
    let id = TagIdentifier::new(vec![0x04, 0xA1, 0xB2, 0xC3, 0xD4, 0xE5, 0xF6]).unwrap();

    c.bench_function("format_compact", |b| b.iter(|| black_box(id.to_hex())));
    c.bench_function("format_spaced", |b| b.iter(|| black_box(id.to_spaced_hex())));
}

/// Benchmark decoding the spaced form back into bytes.
fn bench_decode(c: &mut Criterion) {
    let printed = encode_spaced(&[0x04, 0xA1, 0xB2, 0xC3, 0xD4, 0xE5, 0xF6]);

    c.bench_function("decode_spaced", |b| {
        b.iter(|| black_box(decode(black_box(&printed)).unwrap()))
    });
}

criterion_group!(benches, bench_read_identifier, bench_format, bench_decode);
criterion_main!(benches);
