//! Streaming audio analysis: pitch detection, onset detection and beat
//! tracking over a frame dispatch pipeline.
//!
//! Audio flows from an [`io::AudioSource`] through an
//! [`dispatch::AudioDispatcher`], which windows it into overlapping
//! frames and hands each frame to a chain of
//! [`dispatch::AudioProcessor`]s. Detectors are ordinary processors, so
//! pitch and onset analysis compose freely in one pass over the stream:
//!
//! - [`pitch`]: per-frame fundamental frequency estimation with a choice
//!   of time-domain and spectral detectors.
//! - [`onset`]: detection functions with a shared adaptive peak-picking
//!   tail, reporting onset times and saliences while the stream plays.
//! - [`beat`]: offline tempo induction and multi-agent beat tracking
//!   over the collected onsets of a whole stream.
//!
//! For the common offline cases, [`detect_onsets`] and [`track_beats`]
//! wire the pipeline up over an in-memory buffer:
//!
//! ```
//! use cadence_dsp::{track_beats, TrackingConfig};
//!
//! // Eight clicks at 120 BPM.
//! let sample_rate = 44100.0;
//! let mut samples = vec![0.0f32; 4 * 44100];
//! for beat in 0..8 {
//!     let start = (beat as f64 * 0.5 * sample_rate as f64) as usize;
//!     for i in 0..800 {
//!         let env = 1.0 - i as f32 / 800.0;
//!         samples[start + i] = env * (i as f32 * 0.3).sin();
//!     }
//! }
//!
//! let beats = track_beats(&samples, sample_rate, &TrackingConfig::default())?;
//! println!("tracked {} beats", beats.len());
//! # Ok::<(), cadence_dsp::AnalysisError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod beat;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod io;
pub mod onset;
pub mod pitch;
pub mod util;

pub use beat::OnsetCollector;
pub use config::{AgentConfig, InductionConfig, OnsetConfig, TrackingConfig};
pub use dispatch::{AudioDispatcher, AudioProcessor, DispatcherHandle};
pub use error::AnalysisError;
pub use io::{AudioSource, MemoryAudioSource};
pub use onset::{ComplexOnsetDetector, OnsetHandler};
pub use pitch::{PitchAlgorithm, PitchProcessor, PitchResult};

use std::sync::{Arc, Mutex};

/// Detect onsets in an in-memory buffer of mono samples.
///
/// Runs the complex-domain detector over `samples` and returns the
/// detected onsets as `(time, salience)` pairs in time order.
///
/// # Arguments
///
/// * `samples` - Mono audio samples in `[-1.0, 1.0]`
/// * `sample_rate` - Sample rate in Hz
/// * `config` - Frame geometry and onset detection parameters
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for an empty buffer, a
/// non-positive sample rate or an invalid frame geometry.
pub fn detect_onsets(
    samples: &[f32],
    sample_rate: f32,
    config: &TrackingConfig,
) -> Result<Vec<(f64, f64)>, AnalysisError> {
    validate(samples, sample_rate)?;
    let onsets: Arc<Mutex<Vec<(f64, f64)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&onsets);
    let handler = move |time: f64, salience: f64| {
        sink.lock().unwrap_or_else(|e| e.into_inner()).push((time, salience));
    };

    let source = MemoryAudioSource::new(samples.to_vec(), sample_rate);
    let mut dispatcher =
        AudioDispatcher::new(Box::new(source), config.buffer_size, config.overlap)?;
    let detector =
        ComplexOnsetDetector::new(config.buffer_size, &config.onset, Box::new(handler))?;
    dispatcher.add_processor(Box::new(detector));
    dispatcher.run()?;

    let onsets = onsets.lock().unwrap_or_else(|e| e.into_inner());
    Ok(onsets.clone())
}

/// Track beats in an in-memory buffer of mono samples.
///
/// Detects onsets with the complex-domain detector, induces tempo
/// hypotheses from them and tracks beats with the agent population.
/// Returns the beat times of the winning agent in seconds, or an empty
/// vector when the material yields no beat.
///
/// # Arguments
///
/// * `samples` - Mono audio samples in `[-1.0, 1.0]`
/// * `sample_rate` - Sample rate in Hz
/// * `config` - Frame geometry, onset, induction and agent parameters
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for an empty buffer, a
/// non-positive sample rate or an invalid frame geometry.
pub fn track_beats(
    samples: &[f32],
    sample_rate: f32,
    config: &TrackingConfig,
) -> Result<Vec<f64>, AnalysisError> {
    validate(samples, sample_rate)?;
    let collector = OnsetCollector::new();

    let source = MemoryAudioSource::new(samples.to_vec(), sample_rate);
    let mut dispatcher =
        AudioDispatcher::new(Box::new(source), config.buffer_size, config.overlap)?;
    let detector = ComplexOnsetDetector::new(
        config.buffer_size,
        &config.onset,
        Box::new(collector.handler()),
    )?;
    dispatcher.add_processor(Box::new(detector));
    dispatcher.run()?;

    let mut beats = Vec::new();
    let mut sink = |time: f64, _salience: f64| beats.push(time);
    collector.track_beats(&config.induction, &config.agent, &mut sink);
    Ok(beats)
}

fn validate(samples: &[f32], sample_rate: f32) -> Result<(), AnalysisError> {
    if samples.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "audio buffer is empty".to_string(),
        ));
    }
    if sample_rate <= 0.0 {
        return Err(AnalysisError::InvalidInput(format!(
            "sample rate must be positive, got {}",
            sample_rate
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_rejected() {
        let config = TrackingConfig::default();
        assert!(detect_onsets(&[], 44100.0, &config).is_err());
        assert!(track_beats(&[], 44100.0, &config).is_err());
    }

    #[test]
    fn test_bad_sample_rate_is_rejected() {
        let config = TrackingConfig::default();
        assert!(detect_onsets(&[0.0; 1024], 0.0, &config).is_err());
        assert!(track_beats(&[0.0; 1024], -44100.0, &config).is_err());
    }

    #[test]
    fn test_silence_yields_no_onsets_and_no_beats() {
        let config = TrackingConfig::default();
        let samples = vec![0.0f32; 44100];
        assert!(detect_onsets(&samples, 44100.0, &config).unwrap().is_empty());
        assert!(track_beats(&samples, 44100.0, &config).unwrap().is_empty());
    }
}
