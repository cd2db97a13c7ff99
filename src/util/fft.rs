//! Windowed FFT with polar output

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

use crate::error::AnalysisError;

/// An FFT of fixed size with a Hann window applied to the input.
///
/// The forward transform reports the `size / 2` positive-frequency bins
/// in polar form, which is what phase-based onset detection consumes;
/// [`WindowedFft::inverse`] rebuilds a real frame from the same bins.
/// All work buffers are allocated once at construction.
pub struct WindowedFft {
    size: usize,
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl WindowedFft {
    /// Create a transform for `size`-sample inputs.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` when `size` is smaller than 2.
    pub fn new(size: usize) -> Result<Self, AnalysisError> {
        if size < 2 {
            return Err(AnalysisError::InvalidInput(format!(
                "FFT size must be at least 2, got {}",
                size
            )));
        }
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let ifft = planner.plan_fft_inverse(size);
        let scratch_len = fft
            .get_inplace_scratch_len()
            .max(ifft.get_inplace_scratch_len());
        let scratch = vec![Complex::new(0.0, 0.0); scratch_len];
        let window: Vec<f32> = (0..size)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / size as f32).cos())
            .collect();
        Ok(Self {
            size,
            fft,
            ifft,
            window,
            buffer: vec![Complex::new(0.0, 0.0); size],
            scratch,
        })
    }

    /// Input size of the transform.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of positive-frequency bins produced.
    pub fn bins(&self) -> usize {
        self.size / 2
    }

    /// Transform `samples` and write modulus and phase per bin.
    ///
    /// `samples` must hold exactly `size` values; `magnitude` and `phase`
    /// must hold at least `size / 2` values each.
    pub fn power_phase(&mut self, samples: &[f32], magnitude: &mut [f32], phase: &mut [f32]) {
        debug_assert_eq!(samples.len(), self.size);
        self.transform(samples);
        for (bin, value) in self.buffer[..self.size / 2].iter().enumerate() {
            magnitude[bin] = (value.re * value.re + value.im * value.im).sqrt();
            phase[bin] = value.im.atan2(value.re);
        }
    }

    /// Transform `samples` and write the modulus per bin.
    pub fn magnitude(&mut self, samples: &[f32], magnitude: &mut [f32]) {
        debug_assert_eq!(samples.len(), self.size);
        self.transform(samples);
        for (bin, value) in self.buffer[..self.size / 2].iter().enumerate() {
            magnitude[bin] = (value.re * value.re + value.im * value.im).sqrt();
        }
    }

    /// Rebuild a time-domain frame from `size / 2` polar bins.
    ///
    /// The negative-frequency half of the spectrum is restored by
    /// conjugate symmetry and the Nyquist bin is taken as zero, so the
    /// result is the windowed frame the forward transform saw, less any
    /// content at the Nyquist frequency. `magnitude` and `phase` must
    /// hold at least `size / 2` values; `samples` must hold `size`.
    pub fn inverse(&mut self, magnitude: &[f32], phase: &[f32], samples: &mut [f32]) {
        debug_assert_eq!(samples.len(), self.size);
        let half = self.size / 2;
        self.buffer[0] = Complex::from_polar(magnitude[0], phase[0]);
        for bin in 1..half {
            let value = Complex::from_polar(magnitude[bin], phase[bin]);
            self.buffer[bin] = value;
            self.buffer[self.size - bin] = value.conj();
        }
        self.buffer[half] = Complex::new(0.0, 0.0);
        self.ifft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);
        let scale = 1.0 / self.size as f32;
        for (out, value) in samples.iter_mut().zip(self.buffer.iter()) {
            *out = value.re * scale;
        }
    }

    fn transform(&mut self, samples: &[f32]) {
        for (i, (&s, &w)) in samples.iter().zip(self.window.iter()).enumerate() {
            self.buffer[i] = Complex::new(s * w, 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);
    }
}
