//! Onset detection
//!
//! Onset detectors are dispatcher stages that reduce every frame to one
//! detection function value, feed it through a shared peak-picking tail
//! and report confirmed onsets to an [`OnsetHandler`] with their stream
//! time and salience. Three detection functions are provided:
//!
//! - [`ComplexOnsetDetector`]: complex-domain deviation of magnitude and
//!   phase from a steady-state prediction. Responds to both percussive
//!   and soft tonal onsets; the default choice for beat tracking.
//! - [`SpectralFluxOnsetDetector`]: half-wave rectified magnitude
//!   difference between consecutive spectra.
//! - [`EnergyRiseOnsetDetector`]: fraction of bins with a sharp
//!   broadband energy rise, tuned for percussive material.

mod complex_domain;
mod energy;
mod peak_picker;
mod spectral_flux;

pub use complex_domain::ComplexOnsetDetector;
pub use energy::EnergyRiseOnsetDetector;
pub use peak_picker::PeakPicker;
pub use spectral_flux::SpectralFluxOnsetDetector;

use crate::config::OnsetConfig;
use crate::dispatch::AudioFrame;
use crate::error::AnalysisError;

/// Receives confirmed onsets.
pub trait OnsetHandler: Send {
    /// Called once per onset with its time in seconds and its salience,
    /// the thresholded detection function score at the peak.
    fn handle_onset(&mut self, time: f64, salience: f64);
}

impl<F: FnMut(f64, f64) + Send> OnsetHandler for F {
    fn handle_onset(&mut self, time: f64, salience: f64) {
        self(time, salience)
    }
}

// Shared back end of all onset detectors: peak picking, the silence
// gate, latency compensation and debouncing.
pub(crate) struct OnsetEmitter {
    picker: PeakPicker,
    silence_threshold_db: f64,
    min_inter_onset_interval: f64,
    last_onset: f64,
    handler: Box<dyn OnsetHandler>,
}

impl OnsetEmitter {
    pub(crate) fn new(
        config: &OnsetConfig,
        handler: Box<dyn OnsetHandler>,
    ) -> Result<Self, AnalysisError> {
        if config.min_inter_onset_interval < 0.0 {
            return Err(AnalysisError::InvalidInput(format!(
                "minimum inter-onset interval must be non-negative, got {}",
                config.min_inter_onset_interval
            )));
        }
        Ok(Self {
            picker: PeakPicker::new(config.peak_threshold)?,
            silence_threshold_db: config.silence_threshold_db,
            min_inter_onset_interval: config.min_inter_onset_interval,
            last_onset: f64::NEG_INFINITY,
            handler,
        })
    }

    // Feed one detection function value for `frame`. Peaks in silent
    // frames are suppressed; onsets closer together than the minimum
    // interval keep the earlier one.
    pub(crate) fn frame(&mut self, value: f32, frame: &AudioFrame) {
        if !self.picker.process(value) {
            return;
        }
        if frame.is_silence(self.silence_threshold_db) {
            return;
        }
        // Compensate the smoothing and confirmation lag of the picker.
        let delay = frame.overlap() as f64 * 4.3 / frame.sample_rate() as f64;
        let time = (frame.time_stamp() - delay).max(0.0);
        if time - self.last_onset < self.min_inter_onset_interval {
            log::debug!("onset at {:.3}s debounced", time);
            return;
        }
        self.last_onset = time;
        self.handler
            .handle_onset(time, self.picker.last_peak_value() as f64);
    }
}
