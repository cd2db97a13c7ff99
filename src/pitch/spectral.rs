//! Spectral peak pitch detection

use crate::error::AnalysisError;
use crate::pitch::{parabolic_interpolate, PitchDetector, PitchResult};
use crate::util::WindowedFft;

const MIN_FREQUENCY: f32 = 50.0;
const MAX_FREQUENCY: f32 = 4000.0;
// Fraction of total spectral energy the peak must carry to count as
// pitched.
const MIN_PEAK_SHARE: f32 = 0.1;

/// Pitch detector that reports the strongest spectral bin, refined by
/// parabolic interpolation.
///
/// Only reliable for material whose fundamental dominates the spectrum;
/// for harmonically rich sounds the strongest bin may be an overtone.
pub struct SpectralPeakDetector {
    sample_rate: f32,
    fft: WindowedFft,
    magnitude: Vec<f32>,
    min_bin: usize,
    max_bin: usize,
}

impl SpectralPeakDetector {
    /// Create a detector for `buffer_size`-sample frames at `sample_rate`
    /// Hz.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` when the buffer is too short
    /// to resolve the search range.
    pub fn new(sample_rate: f32, buffer_size: usize) -> Result<Self, AnalysisError> {
        if sample_rate <= 0.0 {
            return Err(AnalysisError::InvalidInput(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }
        let fft = WindowedFft::new(buffer_size)?;
        let bins = fft.bins();
        let bin_width = sample_rate / buffer_size as f32;
        let min_bin = (MIN_FREQUENCY / bin_width).ceil() as usize;
        let max_bin = ((MAX_FREQUENCY / bin_width).floor() as usize).min(bins - 1);
        if min_bin >= max_bin {
            return Err(AnalysisError::InvalidInput(format!(
                "buffer of {} samples cannot resolve {} Hz at {} Hz sample rate",
                buffer_size, MIN_FREQUENCY, sample_rate
            )));
        }
        Ok(Self {
            sample_rate,
            fft,
            magnitude: vec![0.0; bins],
            min_bin,
            max_bin,
        })
    }
}

impl PitchDetector for SpectralPeakDetector {
    fn detect(&mut self, samples: &[f32]) -> PitchResult {
        if samples.len() != self.fft.size() {
            // Shrunken final frame
            return PitchResult::unpitched();
        }
        self.fft.magnitude(samples, &mut self.magnitude);

        let mut peak_bin = self.min_bin;
        for bin in self.min_bin..=self.max_bin {
            if self.magnitude[bin] > self.magnitude[peak_bin] {
                peak_bin = bin;
            }
        }
        let total: f32 = self.magnitude.iter().sum();
        if total <= 0.0 {
            return PitchResult::unpitched();
        }
        let share = self.magnitude[peak_bin] / total;

        let refined = parabolic_interpolate(&self.magnitude, peak_bin);
        let frequency = refined * self.sample_rate / self.fft.size() as f32;
        PitchResult {
            frequency_hz: frequency,
            confidence: share.clamp(0.0, 1.0),
            pitched: share >= MIN_PEAK_SHARE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_detects_sine_within_one_percent() {
        let sample_rate = 44100.0;
        let mut detector = SpectralPeakDetector::new(sample_rate, 4096).unwrap();
        for freq in [220.0f32, 441.0, 1000.0] {
            let samples: Vec<f32> = (0..4096)
                .map(|i| (2.0 * PI * freq * i as f32 / sample_rate).sin())
                .collect();
            let result = detector.detect(&samples);
            assert!(result.pitched, "{} Hz not detected", freq);
            let error = (result.frequency_hz - freq).abs() / freq;
            assert!(error < 0.01, "{} Hz detected as {}", freq, result.frequency_hz);
        }
    }

    #[test]
    fn test_silence_is_unpitched() {
        let mut detector = SpectralPeakDetector::new(44100.0, 2048).unwrap();
        let result = detector.detect(&[0.0; 2048]);
        assert!(!result.pitched);
    }

    #[test]
    fn test_mismatched_frame_length_is_unpitched() {
        let mut detector = SpectralPeakDetector::new(44100.0, 2048).unwrap();
        let result = detector.detect(&[0.5; 100]);
        assert!(!result.pitched);
    }
}
