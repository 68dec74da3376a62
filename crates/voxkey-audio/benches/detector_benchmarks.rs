//! Benchmark tests for the per-frame audio path.
//!
//! The capture callback delivers a 0.5 s frame (8000 samples) twice per
//! second, so RMS computation plus detector bookkeeping must stay far below
//! that cadence to leave room for decoding.

use std::time::{Duration, Instant};

use criterion::{criterion_group, criterion_main, Criterion};
use voxkey_audio::{BoundaryConfig, BoundaryDetector};
use voxkey_core::types::AudioFrame;

/// Generate a frame with a deterministic pseudo-speech waveform.
fn generate_frame(seed: usize) -> AudioFrame {
    let samples: Vec<i16> = (0..8000)
        .map(|i| {
            let phase = (i + seed * 31) as f64 * 0.05;
            (phase.sin() * 900.0) as i16
        })
        .collect();
    AudioFrame::new(samples)
}

fn bench_frame_rms(c: &mut Criterion) {
    let frames: Vec<AudioFrame> = (0..64).map(generate_frame).collect();

    let mut group = c.benchmark_group("audio_frame");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("rms_8000_samples", |b| {
        let mut idx = 0usize;
        b.iter(|| {
            let frame = &frames[idx % frames.len()];
            idx += 1;
            frame.rms()
        });
    });

    group.finish();
}

fn bench_detector_observe(c: &mut Criterion) {
    let frames: Vec<AudioFrame> = (0..64).map(generate_frame).collect();
    let quiet = AudioFrame::constant(50);

    let mut group = c.benchmark_group("boundary_detector");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("observe_speech_frame", |b| {
        let config = BoundaryConfig {
            silence_threshold: 500.0,
            silence_duration: Duration::from_secs(5),
            min_submission_interval: Duration::from_secs(1),
        };
        let mut detector = BoundaryDetector::new(config, Instant::now());
        let mut idx = 0usize;
        b.iter(|| {
            let frame = &frames[idx % frames.len()];
            idx += 1;
            detector.observe(frame, Instant::now())
        });
    });

    group.bench_function("observe_silence_frame", |b| {
        let config = BoundaryConfig {
            silence_threshold: 500.0,
            silence_duration: Duration::from_secs(5),
            min_submission_interval: Duration::from_secs(1),
        };
        let mut detector = BoundaryDetector::new(config, Instant::now());
        b.iter(|| detector.observe(&quiet, Instant::now()));
    });

    group.finish();
}

criterion_group!(benches, bench_frame_rms, bench_detector_observe);
criterion_main!(benches);
