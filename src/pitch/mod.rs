//! Pitch detection
//!
//! Estimates the fundamental frequency of short audio frames. Detectors
//! implement [`PitchDetector`] and are usually driven from a dispatcher
//! chain through [`PitchProcessor`], which forwards every estimate with
//! its time stamp to a [`PitchHandler`].
//!
//! Four detection strategies are provided:
//! - [`PitchAlgorithm::Yin`]: time-domain autocorrelation-style detection
//!   on the cumulative mean normalized difference function. The most
//!   accurate general-purpose choice.
//! - [`PitchAlgorithm::Amdf`]: average magnitude difference function.
//!   Cheaper, multiplication-free inner loop.
//! - [`PitchAlgorithm::SpectralPeak`]: strongest spectral bin with
//!   parabolic refinement. Useful for near-sinusoidal material.
//! - [`PitchAlgorithm::DynamicWavelet`]: extremum-distance tracking
//!   across wavelet approximation levels. Low latency, tuned for voice.

mod amdf;
mod spectral;
mod wavelet;
mod yin;

pub use amdf::AmdfDetector;
pub use spectral::SpectralPeakDetector;
pub use wavelet::WaveletDetector;
pub use yin::YinDetector;

use serde::{Deserialize, Serialize};

use crate::dispatch::{AudioFrame, AudioProcessor};
use crate::error::AnalysisError;

/// A single pitch estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchResult {
    /// Estimated fundamental frequency in Hz, or `-1.0` when the frame is
    /// considered unpitched.
    pub frequency_hz: f32,

    /// Reliability of the estimate in `[0.0, 1.0]`.
    pub confidence: f32,

    /// True when the detector considers the frame pitched.
    pub pitched: bool,
}

impl PitchResult {
    /// An estimate for a frame with no detectable pitch.
    pub fn unpitched() -> Self {
        Self {
            frequency_hz: -1.0,
            confidence: 0.0,
            pitched: false,
        }
    }
}

/// Estimates the fundamental frequency of a frame of samples.
pub trait PitchDetector: Send {
    /// Analyse one frame. Implementations handle frames shorter than
    /// their configured size gracefully, typically returning an
    /// unpitched result.
    fn detect(&mut self, samples: &[f32]) -> PitchResult;
}

/// Receives pitch estimates with their stream position.
pub trait PitchHandler: Send {
    /// Called once per analysed frame.
    fn handle_pitch(&mut self, result: PitchResult, time: f64);
}

impl<F: FnMut(PitchResult, f64) + Send> PitchHandler for F {
    fn handle_pitch(&mut self, result: PitchResult, time: f64) {
        self(result, time)
    }
}

/// Selects a pitch detection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PitchAlgorithm {
    /// Cumulative mean normalized difference detection
    Yin,
    /// Average magnitude difference function detection
    Amdf,
    /// Strongest spectral bin with parabolic refinement
    SpectralPeak,
    /// Extremum-distance tracking across wavelet approximation levels
    DynamicWavelet,
}

impl PitchAlgorithm {
    /// Build a detector for frames of `buffer_size` samples at
    /// `sample_rate` Hz.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` for a non-positive sample
    /// rate or a buffer size too small for the strategy.
    pub fn detector(
        &self,
        sample_rate: f32,
        buffer_size: usize,
    ) -> Result<Box<dyn PitchDetector>, AnalysisError> {
        match self {
            PitchAlgorithm::Yin => Ok(Box::new(YinDetector::new(sample_rate, buffer_size)?)),
            PitchAlgorithm::Amdf => Ok(Box::new(AmdfDetector::new(sample_rate, buffer_size)?)),
            PitchAlgorithm::SpectralPeak => {
                Ok(Box::new(SpectralPeakDetector::new(sample_rate, buffer_size)?))
            }
            PitchAlgorithm::DynamicWavelet => {
                Ok(Box::new(WaveletDetector::new(sample_rate, buffer_size)?))
            }
        }
    }
}

/// Dispatcher stage that runs a [`PitchDetector`] on every frame.
pub struct PitchProcessor {
    detector: Box<dyn PitchDetector>,
    handler: Box<dyn PitchHandler>,
}

impl PitchProcessor {
    /// Create a processor for `algorithm` analysing `buffer_size`-sample
    /// frames at `sample_rate` Hz.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` when the detector rejects the
    /// parameters.
    pub fn new(
        algorithm: PitchAlgorithm,
        sample_rate: f32,
        buffer_size: usize,
        handler: Box<dyn PitchHandler>,
    ) -> Result<Self, AnalysisError> {
        Ok(Self {
            detector: algorithm.detector(sample_rate, buffer_size)?,
            handler,
        })
    }
}

impl AudioProcessor for PitchProcessor {
    fn process(&mut self, frame: &mut AudioFrame) -> bool {
        let result = self.detector.detect(frame.samples());
        self.handler.handle_pitch(result, frame.time_stamp());
        true
    }
}

// Parabolic refinement of a local extremum. Returns the interpolated
// offset of the extremum at index `i` of `data`, staying on `i` at the
// array edges or when the curvature vanishes.
pub(crate) fn parabolic_interpolate(data: &[f32], i: usize) -> f32 {
    if i == 0 || i + 1 >= data.len() {
        return i as f32;
    }
    let s0 = data[i - 1];
    let s1 = data[i];
    let s2 = data[i + 1];
    let denom = 2.0 * (2.0 * s1 - s2 - s0);
    if denom.abs() < f32::EPSILON {
        return i as f32;
    }
    i as f32 + (s2 - s0) / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parabolic_interpolation_at_edges() {
        let data = [1.0, 0.5, 1.0];
        assert_eq!(parabolic_interpolate(&data, 0), 0.0);
        assert_eq!(parabolic_interpolate(&data, 2), 2.0);
    }

    #[test]
    fn test_parabolic_interpolation_symmetric_minimum() {
        // A symmetric dip refines to its own index.
        let data = [1.0, 0.2, 1.0];
        assert!((parabolic_interpolate(&data, 1) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_parabolic_interpolation_skewed_minimum() {
        // The true minimum lies between indices 1 and 2.
        let data = [1.0, 0.3, 0.4, 1.0];
        let refined = parabolic_interpolate(&data, 1);
        assert!(refined > 1.0 && refined < 1.5, "refined: {}", refined);
    }
}
