//! Packet codec benchmark suite.
//!
//! Benchmarks Socket.IO framing of chat traffic at different message sizes:
//! - Encode of an outbound `chat:message` with ack id
//! - Decode of an inbound `chat:response` frame
//!
//! Run with: cargo bench --bench packet_codec
//! Results saved to: target/criterion/

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::json;

use guest_chat::protocol::{EnginePacket, SocketPacket};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const MESSAGE_SIZES: &[usize] = &[16, 256, 4096];

fn message(size: usize) -> String {
    "Do you offer financing for implants? "
        .chars()
        .cycle()
        .take(size)
        .collect()
}

// ============================================================================
// Benchmark: Encode
// ============================================================================

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_chat_message");

    for &size in MESSAGE_SIZES {
        let text = message(size);
        group.bench_with_input(BenchmarkId::new("bytes", size), &text, |b, text| {
            b.iter(|| {
                SocketPacket::event(
                    "chat:message",
                    json!({ "message": black_box(text) }),
                    Some(black_box(42)),
                )
                .into_frame()
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Decode
// ============================================================================

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_chat_response");

    for &size in MESSAGE_SIZES {
        let frame =
            SocketPacket::event("chat:response", json!({ "message": message(size) }), None)
                .into_frame();

        group.bench_with_input(BenchmarkId::new("bytes", size), &frame, |b, frame| {
            b.iter(|| {
                let EnginePacket::Message(inner) = EnginePacket::decode(black_box(frame)).unwrap()
                else {
                    unreachable!("chat frames are Engine.IO messages");
                };
                SocketPacket::decode(&inner).unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
