//! Frame codec and dispatch benchmarks.
//!
//! Measures the per-message cost of the hot path:
//! - Framing outbound payloads of different sizes
//! - Splitting inbound frames at the channel separator
//! - Resolving and invoking handlers (exact match and catch-all fallback)
//!
//! Run with: cargo bench --bench frame_codec
//! Results saved to: target/criterion/

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use wsmux::HandlerResult;
use wsmux::client::Dispatcher;
use wsmux::protocol::{Frame, encode};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const PAYLOAD_SIZES: &[usize] = &[16, 256, 4096];
const REGISTERED_CHANNELS: usize = 64;

// ============================================================================
// Benchmark: Encode
// ============================================================================

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for &size in PAYLOAD_SIZES {
        let payload = "x,".repeat(size / 2);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.iter(|| encode(black_box("chat"), black_box(payload)));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Decode
// ============================================================================

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for &size in PAYLOAD_SIZES {
        let text = encode("chat", &"x,".repeat(size / 2));
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &text, |b, text| {
            b.iter(|| Frame::decode(black_box(text)));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Dispatch
// ============================================================================

fn bench_dispatch(c: &mut Criterion) {
    let dispatcher = Dispatcher::new();
    for i in 0..REGISTERED_CHANNELS {
        dispatcher.set(
            &format!("channel-{i}"),
            Some(Arc::new(|_: &str, payload: &str| -> HandlerResult {
                black_box(payload.len());
                Ok(())
            })),
        );
    }
    dispatcher.set(
        "",
        Some(Arc::new(|channel: &str, _: &str| -> HandlerResult {
            black_box(channel.len());
            Ok(())
        })),
    );

    let mut group = c.benchmark_group("dispatch");

    group.bench_function("exact", |b| {
        b.iter(|| dispatcher.dispatch(black_box("channel-17"), black_box("payload")));
    });

    group.bench_function("fallback", |b| {
        b.iter(|| dispatcher.dispatch(black_box("unregistered"), black_box("payload")));
    });

    group.finish();
}

// ============================================================================
// Criterion Setup
// ============================================================================

criterion_group!(benches, bench_encode, bench_decode, bench_dispatch);
criterion_main!(benches);
