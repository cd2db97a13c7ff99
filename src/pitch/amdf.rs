//! Average magnitude difference function pitch detection
//!
//! # Algorithm
//!
//! The AMDF of a frame at lag `k` is the mean absolute difference between
//! the frame and itself shifted by `k` samples; it dips at lags matching
//! the signal period. The detector scans the lag range corresponding to
//! the configured frequency range, finds the first dip below an adaptive
//! cutoff between the extremes, refines within half a minimum period, and
//! accepts the lag when the dip is deep relative to the maximum.
//!
//! The inner loop is multiplication-free, which made the method popular
//! on constrained hardware; accuracy is below the normalized-difference
//! detector but the estimates are usable for monophonic material.

use crate::error::AnalysisError;
use crate::pitch::{PitchDetector, PitchResult};

const DEFAULT_MIN_FREQUENCY: f32 = 82.0;
const DEFAULT_MAX_FREQUENCY: f32 = 1000.0;
const SENSITIVITY: f64 = 0.1;
const RATIO: f64 = 5.0;

/// Pitch detector based on the average magnitude difference function.
pub struct AmdfDetector {
    sample_rate: f32,
    min_period: usize,
    max_period: usize,
    amd: Vec<f64>,
}

impl AmdfDetector {
    /// Create a detector for `buffer_size`-sample frames at `sample_rate`
    /// Hz, scanning 82 Hz to 1000 Hz.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` when the parameters are out
    /// of range.
    pub fn new(sample_rate: f32, buffer_size: usize) -> Result<Self, AnalysisError> {
        Self::with_range(
            sample_rate,
            buffer_size,
            DEFAULT_MIN_FREQUENCY,
            DEFAULT_MAX_FREQUENCY,
        )
    }

    /// Create a detector scanning `[min_frequency, max_frequency]` Hz.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` when the frequency range is
    /// empty, non-positive, or does not fit in `buffer_size` samples.
    pub fn with_range(
        sample_rate: f32,
        buffer_size: usize,
        min_frequency: f32,
        max_frequency: f32,
    ) -> Result<Self, AnalysisError> {
        if sample_rate <= 0.0 {
            return Err(AnalysisError::InvalidInput(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }
        if min_frequency <= 0.0 || max_frequency <= min_frequency {
            return Err(AnalysisError::InvalidInput(format!(
                "invalid frequency range [{}, {}]",
                min_frequency, max_frequency
            )));
        }
        let min_period = (sample_rate / max_frequency + 0.5).round() as usize;
        let max_period = (sample_rate / min_frequency + 0.5).round() as usize;
        if max_period >= buffer_size {
            return Err(AnalysisError::InvalidInput(format!(
                "buffer of {} samples is too short for {} Hz at {} Hz sample rate",
                buffer_size, min_frequency, sample_rate
            )));
        }
        Ok(Self {
            sample_rate,
            min_period: min_period.max(1),
            max_period,
            amd: vec![0.0; max_period + 1],
        })
    }
}

impl PitchDetector for AmdfDetector {
    fn detect(&mut self, samples: &[f32]) -> PitchResult {
        let len = samples.len();
        // A shrunken final frame may not cover the lag range.
        let max_period = self.max_period.min(len.saturating_sub(1));
        if max_period <= self.min_period {
            return PitchResult::unpitched();
        }

        for lag in self.min_period..=max_period {
            let mut sum = 0.0f64;
            for u in 0..len - lag {
                sum += (samples[u] - samples[u + lag]).abs() as f64;
            }
            self.amd[lag] = sum / (len - lag) as f64;
        }

        let mut minval = f64::INFINITY;
        let mut maxval = f64::NEG_INFINITY;
        for lag in self.min_period..=max_period {
            minval = minval.min(self.amd[lag]);
            maxval = maxval.max(self.amd[lag]);
        }
        if maxval <= 0.0 {
            // Silent frame
            return PitchResult::unpitched();
        }

        // First dip below the adaptive cutoff, then the best lag within
        // half a minimum period of it.
        let cutoff = SENSITIVITY * (maxval - minval) + minval;
        let mut j = self.min_period;
        while j < max_period && self.amd[j] > cutoff {
            j += 1;
        }
        let search_end = (j + self.min_period / 2).min(max_period);
        let mut minpos = j;
        for lag in j..=search_end {
            if self.amd[lag] < self.amd[minpos] {
                minpos = lag;
            }
        }

        if self.amd[minpos] * RATIO < maxval {
            PitchResult {
                frequency_hz: self.sample_rate / minpos as f32,
                confidence: (1.0 - self.amd[minpos] / maxval).clamp(0.0, 1.0) as f32,
                pitched: true,
            }
        } else {
            PitchResult::unpitched()
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
    fn test_detects_sine_within_two_percent() {
        let sample_rate = 44100.0;
        let mut detector = AmdfDetector::new(sample_rate, 2048).unwrap();
        for freq in [110.0f32, 220.0, 441.0] {
            let samples = sine(freq, sample_rate, 2048);
            let result = detector.detect(&samples);
            assert!(result.pitched, "{} Hz not detected", freq);
            let error = (result.frequency_hz - freq).abs() / freq;
            // Lag resolution is one sample, so tolerance is wider than
            // for interpolating detectors.
            assert!(error < 0.02, "{} Hz detected as {}", freq, result.frequency_hz);
        }
    }

    #[test]
    fn test_silence_is_unpitched() {
        let mut detector = AmdfDetector::new(44100.0, 2048).unwrap();
        let result = detector.detect(&[0.0; 2048]);
        assert!(!result.pitched);
        assert_eq!(result.frequency_hz, -1.0);
    }

    #[test]
    fn test_short_final_frame_is_unpitched() {
        let mut detector = AmdfDetector::new(44100.0, 2048).unwrap();
        let samples = sine(220.0, 44100.0, 100);
        let result = detector.detect(&samples);
        assert!(!result.pitched);
    }

    #[test]
    fn test_rejects_buffer_shorter_than_lag_range() {
        // 82 Hz at 44.1 kHz needs a lag of ~538 samples.
        assert!(AmdfDetector::new(44100.0, 512).is_err());
        assert!(AmdfDetector::with_range(44100.0, 512, 200.0, 100.0).is_err());
    }
}
