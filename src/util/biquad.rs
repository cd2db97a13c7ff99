//! Second-order IIR filtering for detection-function smoothing

/// A biquad (two-pole, two-zero) IIR filter in direct form I.
///
/// The filter keeps its output state across calls so that successive
/// windows of a sliding detection function are smoothed consistently.
#[derive(Debug, Clone)]
pub struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    i1: f64,
    i2: f64,
    o1: f64,
    o2: f64,
}

impl Biquad {
    /// Create a filter from its feedforward (`b`) and feedback (`a`)
    /// coefficients.
    pub fn new(b0: f64, b1: f64, b2: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0,
            b1,
            b2,
            a1,
            a2,
            i1: 0.0,
            i2: 0.0,
            o1: 0.0,
            o2: 0.0,
        }
    }

    /// The low-pass filter used to smooth onset detection functions, with
    /// a cutoff around a third of the frame rate's Nyquist frequency.
    pub fn detection_smoother() -> Self {
        Self::new(0.1600, 0.3200, 0.1600, -0.5949, 0.2348)
    }

    /// Filter `data` forwards and then backwards for zero phase delay.
    ///
    /// The input state is initialised by mirroring the first samples of
    /// each pass, so `data` must hold at least 3 values. `scratch` holds
    /// the intermediate reversed signal and must be at least as long as
    /// `data`.
    pub fn smooth(&mut self, data: &mut [f32], scratch: &mut [f32]) {
        let len = data.len();
        debug_assert!(len >= 3);
        debug_assert!(scratch.len() >= len);
        if len < 3 {
            return;
        }

        let mir = 2.0 * data[0] as f64;
        self.i1 = mir - data[2] as f64;
        self.i2 = mir - data[1] as f64;
        self.run(data);

        for j in 0..len {
            scratch[len - j - 1] = data[j];
        }

        let mir = 2.0 * scratch[0] as f64;
        self.i1 = mir - scratch[2] as f64;
        self.i2 = mir - scratch[1] as f64;
        self.run(&mut scratch[..len]);

        for j in 0..len {
            data[j] = scratch[len - j - 1];
        }
    }

    /// Clear both input and output state.
    pub fn reset(&mut self) {
        self.i1 = 0.0;
        self.i2 = 0.0;
        self.o1 = 0.0;
        self.o2 = 0.0;
    }

    fn run(&mut self, data: &mut [f32]) {
        for sample in data.iter_mut() {
            let i0 = *sample as f64;
            let o0 = self.b0 * i0 + self.b1 * self.i1 + self.b2 * self.i2
                - self.a1 * self.o1
                - self.a2 * self.o2;
            *sample = o0 as f32;
            self.i2 = self.i1;
            self.i1 = i0;
            self.o2 = self.o1;
            self.o1 = o0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoothing_preserves_constant_signal() {
        // A unity-gain low-pass filter leaves DC untouched.
        let mut filter = Biquad::detection_smoother();
        let mut data = [1.0f32; 16];
        let mut scratch = [0.0f32; 16];
        filter.smooth(&mut data, &mut scratch);
        for &v in &data {
            assert!((v - 1.0).abs() < 1e-3, "got {}", v);
        }
    }

    #[test]
    fn test_smoothing_attenuates_alternating_signal() {
        let mut filter = Biquad::detection_smoother();
        let mut data = [0.0f32; 16];
        for (i, v) in data.iter_mut().enumerate() {
            *v = if i % 2 == 0 { 1.0 } else { -1.0 };
        }
        let mut scratch = [0.0f32; 16];
        filter.smooth(&mut data, &mut scratch);
        // The alternating component sits at Nyquist and is heavily damped.
        let peak = data.iter().map(|v| v.abs()).fold(0.0f32, f32::max);
        assert!(peak < 0.2, "peak after smoothing: {}", peak);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut filter = Biquad::detection_smoother();
        let mut data = [5.0f32; 8];
        let mut scratch = [0.0f32; 8];
        filter.smooth(&mut data, &mut scratch);
        filter.reset();

        let mut again = [5.0f32; 8];
        let mut fresh_filter = Biquad::detection_smoother();
        fresh_filter.smooth(&mut again, &mut scratch);
        let mut data2 = [5.0f32; 8];
        filter.smooth(&mut data2, &mut scratch);
        for (a, b) in again.iter().zip(data2.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}
