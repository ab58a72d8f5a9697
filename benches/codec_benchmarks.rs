//! Performance benchmarks for the relay's hot paths
//!
//! Run with: cargo bench
//! Or for specific benchmarks: cargo bench -- <filter>

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::time::Duration;

use interview_gateway::core::audio::{
    decode_from_transport, encode_for_transport, wrap_as_playable_container,
};
use interview_gateway::core::realtime::ServerEvent;
use interview_gateway::core::relay::messages::BrowserIncomingMessage;

/// 20ms, 100ms and 1s of 24kHz mono audio
const FRAME_SIZES: &[usize] = &[480, 2_400, 24_000];

fn sine_frame(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / 24_000.0).sin() * 0.5)
        .collect()
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_for_transport");
    group.measurement_time(Duration::from_secs(5));

    for &len in FRAME_SIZES {
        let frame = sine_frame(len);
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &frame, |b, frame| {
            b.iter(|| encode_for_transport(black_box(frame)));
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_from_transport");
    group.measurement_time(Duration::from_secs(5));

    for &len in FRAME_SIZES {
        let encoded = encode_for_transport(&sine_frame(len));
        group.throughput(Throughput::Bytes(encoded.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &encoded, |b, encoded| {
            b.iter(|| decode_from_transport(black_box(encoded)));
        });
    }
    group.finish();
}

fn bench_container(c: &mut Criterion) {
    let mut group = c.benchmark_group("wrap_as_playable_container");

    for &len in FRAME_SIZES {
        let pcm = vec![0x10u8; len * 2];
        group.throughput(Throughput::Bytes(pcm.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &pcm, |b, pcm| {
            b.iter(|| wrap_as_playable_container(black_box(pcm)));
        });
    }
    group.finish();
}

fn bench_event_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_parsing");

    let audio_delta = format!(
        r#"{{"type":"response.audio.delta","response_id":"resp_1","item_id":"item_1","output_index":0,"content_index":0,"delta":"{}"}}"#,
        encode_for_transport(&sine_frame(2_400))
    );
    let transcript_delta = r#"{"type":"response.audio_transcript.delta","response_id":"resp_1","item_id":"item_1","delta":"Miten meni?"}"#;
    let unknown = r#"{"type":"rate_limits.updated","rate_limits":[{"name":"tokens","limit":1000}]}"#;
    let browser_append = format!(
        r#"{{"type":"input_audio_buffer.append","audio":"{}"}}"#,
        encode_for_transport(&sine_frame(480))
    );

    group.throughput(Throughput::Bytes(audio_delta.len() as u64));
    group.bench_function("audio_delta", |b| {
        b.iter(|| {
            let _: Result<ServerEvent, _> = serde_json::from_str(black_box(&audio_delta));
        });
    });

    group.bench_function("transcript_delta", |b| {
        b.iter(|| {
            let _: Result<ServerEvent, _> = serde_json::from_str(black_box(transcript_delta));
        });
    });

    group.bench_function("unknown_event", |b| {
        b.iter(|| {
            let _: Result<ServerEvent, _> = serde_json::from_str(black_box(unknown));
        });
    });

    group.bench_function("browser_append", |b| {
        b.iter(|| {
            let _: Result<BrowserIncomingMessage, _> =
                serde_json::from_str(black_box(&browser_append));
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_encode,
    bench_decode,
    bench_container,
    bench_event_parsing
);
criterion_main!(benches);
