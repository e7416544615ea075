//! Criterion benchmarks for the DBI wire codec.
//!
//! Measures encoding and decoding latency for the 16-byte frame header and
//! the file range request payload.  Header decoding runs once per received
//! frame, so it is the hot path of the command loop.
//!
//! Run with:
//! ```bash
//! cargo bench --package dbi-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dbi_core::protocol::codec::{
    decode_header, decode_range_request, encode_header, encode_range_request, FileRangeRequest,
};
use dbi_core::protocol::commands::{CommandId, CommandType};

// ── Fixtures ──────────────────────────────────────────────────────────────────

/// A range request with a file name of the given length.  Request payloads
/// are dominated by the name, so the bench sweeps a few realistic lengths.
fn make_range_request(name_len: usize) -> FileRangeRequest {
    FileRangeRequest {
        range_size: 0x10_0000,
        range_offset: 0x4000_0000,
        name: "n".repeat(name_len),
    }
}

// ── Benchmark groups ──────────────────────────────────────────────────────────

/// Benchmarks `encode_header` for each command.
fn bench_encode_header(c: &mut Criterion) {
    let commands: &[(&str, CommandType, CommandId)] = &[
        ("Exit", CommandType::Response, CommandId::Exit),
        ("List", CommandType::Response, CommandId::List),
        ("FileRangeAck", CommandType::Ack, CommandId::FileRange),
    ];

    let mut group = c.benchmark_group("encode_header");
    for (name, command_type, command_id) in commands {
        group.bench_with_input(
            BenchmarkId::new("cmd", name),
            &(*command_type, *command_id),
            |b, (command_type, command_id)| {
                b.iter(|| {
                    encode_header(
                        black_box(*command_type),
                        black_box(*command_id),
                        black_box(0x1000),
                    )
                })
            },
        );
    }
    group.finish();
}

/// Benchmarks `decode_header` on a pre-encoded frame.
fn bench_decode_header(c: &mut Criterion) {
    let bytes = encode_header(CommandType::Request, CommandId::FileRange, 24);

    c.bench_function("decode_header", |b| {
        b.iter(|| decode_header(black_box(&bytes)).expect("decode must succeed"))
    });
}

/// Benchmarks `decode_range_request` across file name lengths.
fn bench_decode_range_request(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_range_request");
    for name_len in [8usize, 64, 255] {
        let payload = encode_range_request(&make_range_request(name_len));
        group.bench_with_input(
            BenchmarkId::new("name_len", name_len),
            &payload,
            |b, payload| {
                b.iter(|| decode_range_request(black_box(payload)).expect("decode must succeed"))
            },
        );
    }
    group.finish();
}

/// Benchmarks a full encode+decode round-trip for the per-frame hot path.
fn bench_roundtrip_hot_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_decode_roundtrip");

    // Header: runs for every frame in both directions
    group.bench_function("header", |b| {
        b.iter(|| {
            let bytes = encode_header(
                black_box(CommandType::Request),
                black_box(CommandId::FileRange),
                black_box(24),
            );
            decode_header(black_box(&bytes)).unwrap()
        })
    });

    // Range request: runs once per served range
    let request = make_range_request(32);
    group.bench_function("range_request", |b| {
        b.iter(|| {
            let bytes = encode_range_request(black_box(&request));
            decode_range_request(black_box(&bytes)).unwrap()
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_encode_header,
    bench_decode_header,
    bench_decode_range_request,
    bench_roundtrip_hot_path
);
criterion_main!(benches);
