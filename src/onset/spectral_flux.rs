//! Spectral flux onset detection

use crate::config::OnsetConfig;
use crate::dispatch::{AudioFrame, AudioProcessor};
use crate::error::AnalysisError;
use crate::onset::{OnsetEmitter, OnsetHandler};
use crate::util::WindowedFft;

/// Onset detector on the half-wave rectified spectral flux.
///
/// The detection function sums the per-bin magnitude increase between
/// consecutive spectra; decreases are ignored. Simpler and cheaper than
/// the complex-domain function, with weaker response to soft onsets that
/// announce themselves mostly in phase.
pub struct SpectralFluxOnsetDetector {
    fft: WindowedFft,
    magnitude: Vec<f32>,
    prev_magnitude: Vec<f32>,
    emitter: OnsetEmitter,
}

impl SpectralFluxOnsetDetector {
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
            prev_magnitude: vec![0.0; bins],
            emitter: OnsetEmitter::new(config, handler)?,
        })
    }
}

impl AudioProcessor for SpectralFluxOnsetDetector {
    fn process(&mut self, frame: &mut AudioFrame) -> bool {
        if frame.len() != self.fft.size() {
            return true;
        }
        self.fft.magnitude(frame.samples(), &mut self.magnitude);
        let mut flux = 0.0f32;
        for (m, m_prev) in self.magnitude.iter().zip(self.prev_magnitude.iter()) {
            flux += (m - m_prev).max(0.0);
        }
        self.prev_magnitude.copy_from_slice(&self.magnitude);
        self.emitter.frame(flux, frame);
        true
    }
}
