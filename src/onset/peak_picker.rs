//! Adaptive peak picking on a streaming detection function
//!
//! # Algorithm
//!
//! Each new detection function value enters a seven-slot sliding window
//! holding five past values, the value under evaluation and one future
//! value. The window is smoothed with a zero-phase low-pass filter, then
//! the evaluated slot is scored against an adaptive floor built from the
//! window's median and mean:
//!
//! `score = smoothed[win_pre] - median - mean * threshold`
//!
//! A peak is reported when the previous score is positive and strictly
//! greater than both its neighbours, so every detection is confirmed by
//! one later value. Reported peaks therefore lag the input by
//! [`PeakPicker::latency`] frames.

use std::cmp::Ordering;

use crate::error::AnalysisError;
use crate::util::Biquad;

// Past and future context around the evaluated slot.
const WIN_PRE: usize = 5;
const WIN_POST: usize = 1;
const WINDOW: usize = WIN_PRE + WIN_POST + 1;

/// Streaming peak picker with an adaptive median/mean threshold.
pub struct PeakPicker {
    threshold: f32,
    // Raw detection function history, newest last
    keep: [f32; WINDOW],
    // Smoothed copy of `keep`, rebuilt every frame
    smoothed: [f32; WINDOW],
    scratch: [f32; WINDOW],
    sorted: [f32; WINDOW],
    // Last three scores; the middle one is tested for a local maximum
    peek: [f32; 3],
    filter: Biquad,
    last_peak_value: f32,
}

impl PeakPicker {
    /// Create a picker with the given threshold. Sensible values lie
    /// between 0.1 and 0.8.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` for a non-positive threshold.
    pub fn new(threshold: f32) -> Result<Self, AnalysisError> {
        if threshold <= 0.0 {
            return Err(AnalysisError::InvalidInput(format!(
                "peak threshold must be positive, got {}",
                threshold
            )));
        }
        Ok(Self {
            threshold,
            keep: [0.0; WINDOW],
            smoothed: [0.0; WINDOW],
            scratch: [0.0; WINDOW],
            sorted: [0.0; WINDOW],
            peek: [0.0; 3],
            filter: Biquad::detection_smoother(),
            last_peak_value: 0.0,
        })
    }

    /// Feed one detection function value. Returns true when the value
    /// fed [`PeakPicker::latency`] calls ago was a peak.
    pub fn process(&mut self, value: f32) -> bool {
        self.keep.copy_within(1.., 0);
        self.keep[WINDOW - 1] = value;

        self.smoothed.copy_from_slice(&self.keep);
        self.filter.smooth(&mut self.smoothed, &mut self.scratch);

        let mean: f32 = self.smoothed.iter().sum::<f32>() / WINDOW as f32;
        self.sorted.copy_from_slice(&self.smoothed);
        self.sorted
            .sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let median = self.sorted[WINDOW / 2];

        self.peek[0] = self.peek[1];
        self.peek[1] = self.peek[2];
        self.peek[2] = self.smoothed[WIN_PRE] - median - mean * self.threshold;

        let is_peak =
            self.peek[1] > 0.0 && self.peek[1] > self.peek[0] && self.peek[1] > self.peek[2];
        if is_peak {
            self.last_peak_value = self.peek[1];
        }
        is_peak
    }

    /// Thresholded score of the most recently confirmed peak.
    pub fn last_peak_value(&self) -> f32 {
        self.last_peak_value
    }

    /// Current threshold.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Change the threshold mid-stream.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` for a non-positive threshold.
    pub fn set_threshold(&mut self, threshold: f32) -> Result<(), AnalysisError> {
        if threshold <= 0.0 {
            return Err(AnalysisError::InvalidInput(format!(
                "peak threshold must be positive, got {}",
                threshold
            )));
        }
        self.threshold = threshold;
        Ok(())
    }

    /// Number of frames between feeding a value and learning whether it
    /// was a peak.
    pub fn latency(&self) -> usize {
        WIN_POST + 1
    }
}
