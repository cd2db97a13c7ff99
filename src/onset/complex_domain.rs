//! Complex-domain onset detection
//!
//! # Algorithm
//!
//! For every spectral bin the current magnitude and phase are compared to
//! a steady-state prediction: the previous magnitude and a phase
//! extrapolated linearly from the last two frames. The detection function
//! sums the magnitude of the complex deviation over all bins:
//!
//! `sum over k of sqrt(|m^2 + m_prev^2 - 2 m m_prev cos(phi - phi_pred)|)`
//!
//! Stationary tones predict well and contribute little; transients break
//! the prediction in magnitude, phase or both. The function responds to
//! percussive attacks and to soft onsets of pitched instruments alike.
//!
//! # Reference
//!
//! Duxbury, Bello, Davies and Sandler, "Complex domain onset detection
//! for musical signals", DAFx 2003.

use crate::config::OnsetConfig;
use crate::dispatch::{AudioFrame, AudioProcessor};
use crate::error::AnalysisError;
use crate::onset::{OnsetEmitter, OnsetHandler};
use crate::util::WindowedFft;

/// Onset detector on the complex-domain deviation function.
pub struct ComplexOnsetDetector {
    fft: WindowedFft,
    magnitude: Vec<f32>,
    phase: Vec<f32>,
    prev_magnitude: Vec<f32>,
    // Phase of the previous and the one before it, per bin
    theta1: Vec<f32>,
    theta2: Vec<f32>,
    emitter: OnsetEmitter,
}

impl ComplexOnsetDetector {
    /// Create a detector for `buffer_size`-sample frames.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` when the frame size or the
    /// configuration is rejected.
    pub fn new(
        buffer_size: usize,
        config: &OnsetConfig,
        handler: Box<dyn OnsetHandler>,
    ) -> Result<Self, AnalysisError> {
        let fft = WindowedFft::new(buffer_size)?;
        let bins = fft.bins();
        Ok(Self {
            fft,
            magnitude: vec![0.0; bins],
            phase: vec![0.0; bins],
            prev_magnitude: vec![0.0; bins],
            theta1: vec![0.0; bins],
            theta2: vec![0.0; bins],
            emitter: OnsetEmitter::new(config, handler)?,
        })
    }

    fn detection_value(&mut self, samples: &[f32]) -> f32 {
        self.fft
            .power_phase(samples, &mut self.magnitude, &mut self.phase);
        let mut value = 0.0f32;
        for bin in 0..self.magnitude.len() {
            let predicted_phase = 2.0 * self.theta1[bin] - self.theta2[bin];
            let m = self.magnitude[bin];
            let m_prev = self.prev_magnitude[bin];
            let deviation = (predicted_phase - self.phase[bin]).cos();
            value += (m * m + m_prev * m_prev - 2.0 * m * m_prev * deviation)
                .abs()
                .sqrt();
            self.theta2[bin] = self.theta1[bin];
            self.theta1[bin] = self.phase[bin];
            self.prev_magnitude[bin] = m;
        }
        value
    }
}

impl AudioProcessor for ComplexOnsetDetector {
    fn process(&mut self, frame: &mut AudioFrame) -> bool {
        if frame.len() != self.fft.size() {
            // Shrunken final frame
            return true;
        }
        let value = self.detection_value(frame.samples());
        self.emitter.frame(value, frame);
        true
    }
}
