//! End-to-end tests over the dispatch, onset and beat tracking pipeline

use std::f32::consts::PI;
use std::sync::{Arc, Mutex};
use std::thread;

use cadence_dsp::beat::OnsetCollector;
use cadence_dsp::dispatch::{AudioDispatcher, AudioFrame, AudioProcessor};
use cadence_dsp::io::MemoryAudioSource;
use cadence_dsp::pitch::{PitchAlgorithm, PitchProcessor, PitchResult};
use cadence_dsp::{detect_onsets, track_beats, ComplexOnsetDetector, TrackingConfig};

/// Clicks with a decaying tone burst at every beat of the given period.
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

fn sine(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| 0.7 * (2.0 * PI * freq * i as f32 / sample_rate).sin())
        .collect()
}

#[test]
fn test_dispatcher_covers_stream_without_gaps() {
    struct Coverage {
        next_start: Arc<Mutex<f64>>,
    }
    impl AudioProcessor for Coverage {
        fn process(&mut self, frame: &mut AudioFrame) -> bool {
            let mut next = self.next_start.lock().unwrap();
            // Fresh samples of this frame begin where the previous
            // frame's fresh samples ended.
            let fresh_start =
                frame.time_stamp() + frame.overlap() as f64 / frame.sample_rate() as f64;
            assert!((fresh_start - *next).abs() < 1e-9);
            *next = frame.end_time_stamp();
            true
        }
    }

    let source = MemoryAudioSource::new(vec![0.1; 10_000], 44100.0);
    let mut dispatcher = AudioDispatcher::new(Box::new(source), 1024, 512).unwrap();
    let next_start = Arc::new(Mutex::new(0.0));
    dispatcher.add_processor(Box::new(Coverage {
        next_start: Arc::clone(&next_start),
    }));
    dispatcher.run().unwrap();

    // The last frame ends exactly at the stream end.
    let end = *next_start.lock().unwrap();
    assert!((end - 10_000.0 / 44100.0).abs() < 1e-9);
}

#[test]
fn test_pitch_pipeline_tracks_a_sine() {
    let sample_rate = 44100.0;
    let samples = sine(440.0, sample_rate, 44100);
    let results: Arc<Mutex<Vec<PitchResult>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&results);
    let handler = move |result: PitchResult, _time: f64| {
        sink.lock().unwrap().push(result);
    };

    let source = MemoryAudioSource::new(samples, sample_rate);
    let mut dispatcher = AudioDispatcher::new(Box::new(source), 2048, 1024).unwrap();
    let processor =
        PitchProcessor::new(PitchAlgorithm::Yin, sample_rate, 2048, Box::new(handler)).unwrap();
    dispatcher.add_processor(Box::new(processor));
    dispatcher.run().unwrap();

    let results = results.lock().unwrap();
    assert!(results.len() > 30);
    let pitched: Vec<&PitchResult> = results.iter().filter(|r| r.pitched).collect();
    assert!(pitched.len() * 10 >= results.len() * 9);
    for result in &pitched {
        let error = (result.frequency_hz - 440.0).abs() / 440.0;
        assert!(error < 0.01, "estimated {} Hz", result.frequency_hz);
    }
}

#[test]
fn test_onsets_line_up_with_clicks() {
    let sample_rate = 44100.0;
    let period = 0.5;
    let samples = click_track(sample_rate, period, 4.0);
    let onsets = detect_onsets(&samples, sample_rate, &TrackingConfig::default()).unwrap();

    assert!(
        onsets.len() >= 6 && onsets.len() <= 10,
        "expected about 8 onsets, got {}",
        onsets.len()
    );
    for (time, salience) in &onsets {
        let nearest = (time / period).round() * period;
        assert!(
            (time - nearest).abs() < 0.05,
            "onset at {:.3}s is far from a click",
            time
        );
        assert!(*salience > 0.0);
    }
    // Onsets arrive in time order.
    for pair in onsets.windows(2) {
        assert!(pair[0].0 < pair[1].0);
    }
}

#[test]
fn test_beats_follow_a_120_bpm_click_track() {
    let sample_rate = 44100.0;
    let period = 0.5;
    let samples = click_track(sample_rate, period, 8.0);
    let beats = track_beats(&samples, sample_rate, &TrackingConfig::default()).unwrap();

    assert!(beats.len() >= 12, "got {} beats", beats.len());
    let mut intervals: Vec<f64> = beats.windows(2).map(|p| p[1] - p[0]).collect();
    intervals.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let median = intervals[intervals.len() / 2];
    // The winner may settle on the click period or a multiple of it.
    let ratio = median / period;
    let nearest = ratio.round().max(1.0);
    assert!(
        (ratio - nearest).abs() < 0.05,
        "median interval {:.3}s does not fit a {:.1}s grid",
        median,
        period
    );
}

#[test]
fn test_onset_collector_bridges_streaming_to_tracking() {
    let sample_rate = 44100.0;
    let samples = click_track(sample_rate, 0.4, 6.0);
    let config = TrackingConfig::default();

    let collector = OnsetCollector::new();
    let source = MemoryAudioSource::new(samples, sample_rate);
    let mut dispatcher =
        AudioDispatcher::new(Box::new(source), config.buffer_size, config.overlap).unwrap();
    let detector = ComplexOnsetDetector::new(
        config.buffer_size,
        &config.onset,
        Box::new(collector.handler()),
    )
    .unwrap();
    dispatcher.add_processor(Box::new(detector));
    dispatcher.run().unwrap();

    assert!(collector.len() >= 10, "collected {} onsets", collector.len());
    let mut beats = Vec::new();
    let mut sink = |time: f64, _salience: f64| beats.push(time);
    let best = collector
        .track_beats(&config.induction, &config.agent, &mut sink)
        .expect("a winning agent");
    assert!(best.beat_interval() >= 0.3 && best.beat_interval() <= 1.0);
    assert!(!beats.is_empty());
}

#[test]
fn test_stop_from_another_thread() {
    // A long stream, stopped from outside after a few frames.
    let source = MemoryAudioSource::new(vec![0.1; 44100 * 30], 44100.0);
    let mut dispatcher = AudioDispatcher::new(Box::new(source), 1024, 0).unwrap();
    let handle = dispatcher.handle();

    let frames = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&frames);
    struct Count(Arc<Mutex<usize>>);
    impl AudioProcessor for Count {
        fn process(&mut self, _frame: &mut AudioFrame) -> bool {
            *self.0.lock().unwrap() += 1;
            // Pace the loop so the stop request lands mid-stream.
            thread::sleep(std::time::Duration::from_millis(1));
            true
        }
    }
    dispatcher.add_processor(Box::new(Count(counter)));

    let worker = thread::spawn(move || dispatcher.run());
    thread::sleep(std::time::Duration::from_millis(20));
    handle.stop();
    worker.join().unwrap().unwrap();

    // Stopped well before the 30 s stream was exhausted.
    assert!(*frames.lock().unwrap() < 44100 * 30 / 1024);
    assert!(handle.is_stopped());
}

#[test]
fn test_detectors_survive_a_shrunken_final_frame() {
    // Stream length chosen so the final frame is short.
    let sample_rate = 44100.0;
    let mut samples = click_track(sample_rate, 0.5, 2.0);
    samples.truncate(samples.len() - 100);
    let onsets = detect_onsets(&samples, sample_rate, &TrackingConfig::default()).unwrap();
    assert!(!onsets.is_empty());
}
