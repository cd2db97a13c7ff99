//! Broadband energy rise onset detection

use crate::config::OnsetConfig;
use crate::dispatch::{AudioFrame, AudioProcessor};
use crate::error::AnalysisError;
use crate::onset::{OnsetEmitter, OnsetHandler};
use crate::util::WindowedFft;

// A bin must gain this much over the previous frame to count as rising.
const RISE_THRESHOLD_DB: f32 = 8.0;

/// Onset detector counting bins with a sharp energy rise.
///
/// The detection function is the fraction of spectral bins whose
/// magnitude grew by at least 8 dB since the previous frame. Broadband
/// percussive attacks light up many bins at once, while the slow swells
/// and vibrato of pitched material move few bins this fast, which makes
/// the function robust against tonal content at the cost of missing
/// soft onsets.
pub struct EnergyRiseOnsetDetector {
    fft: WindowedFft,
    magnitude: Vec<f32>,
    prev_magnitude: Vec<f32>,
    emitter: OnsetEmitter,
}

impl EnergyRiseOnsetDetector {
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

impl AudioProcessor for EnergyRiseOnsetDetector {
    fn process(&mut self, frame: &mut AudioFrame) -> bool {
        if frame.len() != self.fft.size() {
            return true;
        }
        self.fft.magnitude(frame.samples(), &mut self.magnitude);
        let mut rising = 0usize;
        for (m, m_prev) in self.magnitude.iter().zip(self.prev_magnitude.iter()) {
            if *m_prev > 0.0 && 10.0 * (m / m_prev).log10() >= RISE_THRESHOLD_DB {
                rising += 1;
            }
        }
        self.prev_magnitude.copy_from_slice(&self.magnitude);
        let value = rising as f32 / self.magnitude.len() as f32;
        self.emitter.frame(value, frame);
        true
    }
}
