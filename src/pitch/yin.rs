//! Time-domain pitch detection on the normalized difference function
//!
//! # Algorithm
//!
//! 1. Compute the squared difference function `d(tau)` between the frame
//!    and a copy of itself shifted by `tau` samples.
//! 2. Normalize it to the cumulative mean normalized difference `d'(tau)`
//!    with `d'(0) = 1`, which removes the bias towards `tau = 0`.
//! 3. Take the first `tau` where `d'` dips below an absolute threshold,
//!    then walk forward while the function keeps decreasing to land on
//!    the local minimum.
//! 4. Refine `tau` by parabolic interpolation and convert to Hz.
//!
//! When no dip crosses the threshold the global minimum of `d'` is still
//! refined and reported, but the frame is marked unpitched so callers can
//! tell a firm estimate from a best guess.
//!
//! # Reference
//!
//! de Cheveigné and Kawahara, "YIN, a fundamental frequency estimator for
//! speech and music", JASA 111(4), 2002.

use crate::error::AnalysisError;
use crate::pitch::{parabolic_interpolate, PitchDetector, PitchResult};

/// Default dip threshold on the normalized difference function.
pub const DEFAULT_YIN_THRESHOLD: f32 = 0.15;

/// Pitch detector based on the cumulative mean normalized difference
/// function.
pub struct YinDetector {
    sample_rate: f32,
    threshold: f32,
    // d'(tau) for tau in [0, buffer_size / 2)
    scratch: Vec<f32>,
}

impl YinDetector {
    /// Create a detector for `buffer_size`-sample frames at `sample_rate`
    /// Hz with the default threshold.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` for a non-positive sample
    /// rate or a buffer shorter than 8 samples.
    pub fn new(sample_rate: f32, buffer_size: usize) -> Result<Self, AnalysisError> {
        Self::with_threshold(sample_rate, buffer_size, DEFAULT_YIN_THRESHOLD)
    }

    /// Create a detector with an explicit dip threshold. Lower values
    /// demand clearer periodicity before a frame counts as pitched.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` for invalid parameters.
    pub fn with_threshold(
        sample_rate: f32,
        buffer_size: usize,
        threshold: f32,
    ) -> Result<Self, AnalysisError> {
        if sample_rate <= 0.0 {
            return Err(AnalysisError::InvalidInput(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }
        if buffer_size < 8 {
            return Err(AnalysisError::InvalidInput(format!(
                "buffer size must be at least 8 samples, got {}",
                buffer_size
            )));
        }
        if !(0.0..1.0).contains(&threshold) {
            return Err(AnalysisError::InvalidInput(format!(
                "threshold must be in [0, 1), got {}",
                threshold
            )));
        }
        Ok(Self {
            sample_rate,
            threshold,
            scratch: vec![0.0; buffer_size / 2],
        })
    }

    // d(tau), then in-place normalization to d'(tau). Returns false when
    // the frame carries no energy at all.
    fn normalized_difference(&mut self, samples: &[f32], half: usize) -> bool {
        let diff = &mut self.scratch[..half];
        diff[0] = 0.0;
        for tau in 1..half {
            let mut sum = 0.0f32;
            for i in 0..half {
                let delta = samples[i] - samples[i + tau];
                sum += delta * delta;
            }
            diff[tau] = sum;
        }

        let mut running_sum = 0.0f32;
        diff[0] = 1.0;
        for tau in 1..half {
            running_sum += diff[tau];
            if running_sum == 0.0 {
                diff[tau] = 1.0;
            } else {
                diff[tau] *= tau as f32 / running_sum;
            }
        }
        running_sum > 0.0
    }
}

impl PitchDetector for YinDetector {
    fn detect(&mut self, samples: &[f32]) -> PitchResult {
        let half = (samples.len() / 2).min(self.scratch.len());
        if half < 4 {
            return PitchResult::unpitched();
        }
        if !self.normalized_difference(samples, half) {
            // Silent frame
            return PitchResult::unpitched();
        }
        let diff = &self.scratch[..half];

        let mut tau = 2;
        let mut found = false;
        while tau < half {
            if diff[tau] < self.threshold {
                while tau + 1 < half && diff[tau + 1] < diff[tau] {
                    tau += 1;
                }
                found = true;
                break;
            }
            tau += 1;
        }

        if !found {
            // Fall back to the global minimum but flag the estimate.
            let mut min_tau = 2;
            for t in 3..half {
                if diff[t] < diff[min_tau] {
                    min_tau = t;
                }
            }
            tau = min_tau;
        }

        let refined = parabolic_interpolate(diff, tau);
        if refined <= 0.0 {
            return PitchResult::unpitched();
        }
        PitchResult {
            frequency_hz: self.sample_rate / refined,
            confidence: (1.0 - diff[tau]).clamp(0.0, 1.0),
            pitched: found,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_detects_sine_within_one_percent() {
        let sample_rate = 44100.0;
        let mut detector = YinDetector::new(sample_rate, 2048).unwrap();
        for freq in [110.0f32, 220.0, 440.0, 880.0] {
            let samples = sine(freq, sample_rate, 2048);
            let result = detector.detect(&samples);
            assert!(result.pitched, "{} Hz not detected as pitched", freq);
            let error = (result.frequency_hz - freq).abs() / freq;
            assert!(error < 0.01, "{} Hz detected as {}", freq, result.frequency_hz);
            assert!(result.confidence > 0.85);
        }
    }

    #[test]
    fn test_silence_is_unpitched() {
        let mut detector = YinDetector::new(44100.0, 1024).unwrap();
        let result = detector.detect(&[0.0; 1024]);
        assert!(!result.pitched);
        assert_eq!(result.frequency_hz, -1.0);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_noise_is_unpitched() {
        let mut detector = YinDetector::new(44100.0, 1024).unwrap();
        // Deterministic pseudo-noise
        let mut state = 0x2545f491u32;
        let samples: Vec<f32> = (0..1024)
            .map(|_| {
                state = state.wrapping_mul(1664525).wrapping_add(1013904223);
                (state >> 8) as f32 / (1 << 24) as f32 * 2.0 - 1.0
            })
            .collect();
        let result = detector.detect(&samples);
        assert!(!result.pitched);
    }

    #[test]
    fn test_short_frame_is_unpitched() {
        let mut detector = YinDetector::new(44100.0, 2048).unwrap();
        let result = detector.detect(&[0.1, -0.1, 0.1, -0.1]);
        assert!(!result.pitched);
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(YinDetector::new(0.0, 1024).is_err());
        assert!(YinDetector::new(44100.0, 4).is_err());
        assert!(YinDetector::with_threshold(44100.0, 1024, 1.5).is_err());
    }
}
