use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::f32::consts::PI;

use cadence_dsp::pitch::{PitchAlgorithm, PitchDetector};
use cadence_dsp::{detect_onsets, track_beats, TrackingConfig};

fn click_track(sample_rate: f32, period: f64, total: f64) -> Vec<f32> {
    let len = (total * sample_rate as f64) as usize;
    let mut samples = vec![0.0f32; len];
    let burst = (0.02 * sample_rate as f64) as usize;
    let mut t = 0.0;
    while t < total {
        let start = (t * sample_rate as f64) as usize;
        for i in 0..burst {
            if start + i < len {
                let x = i as f32 / sample_rate;
                let env = 1.0 - i as f32 / burst as f32;
                samples[start + i] = env * (2.0 * PI * 1500.0 * x).sin();
            }
        }
        t += period;
    }
    samples
}

fn bench_onset_detection(c: &mut Criterion) {
    let samples = click_track(44100.0, 0.5, 10.0);
    let config = TrackingConfig::default();
    c.bench_function("detect_onsets_10s", |b| {
        b.iter(|| detect_onsets(black_box(&samples), 44100.0, &config))
    });
}

fn bench_beat_tracking(c: &mut Criterion) {
    let samples = click_track(44100.0, 0.5, 10.0);
    let config = TrackingConfig::default();
    c.bench_function("track_beats_10s", |b| {
        b.iter(|| track_beats(black_box(&samples), 44100.0, &config))
    });
}

fn bench_pitch_detection(c: &mut Criterion) {
    let sample_rate = 44100.0;
    let samples: Vec<f32> = (0..2048)
        .map(|i| (2.0 * PI * 440.0 * i as f32 / sample_rate).sin())
        .collect();
    let mut group = c.benchmark_group("pitch_frame_2048");
    for (name, algorithm) in [
        ("yin", PitchAlgorithm::Yin),
        ("amdf", PitchAlgorithm::Amdf),
        ("spectral_peak", PitchAlgorithm::SpectralPeak),
        ("dynamic_wavelet", PitchAlgorithm::DynamicWavelet),
    ] {
        let mut detector = algorithm.detector(sample_rate, 2048).unwrap();
        group.bench_function(name, |b| {
            b.iter(|| detector.detect(black_box(&samples)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_onset_detection,
    bench_beat_tracking,
    bench_pitch_detection
);
criterion_main!(benches);
