//! Shared signal-processing building blocks

mod biquad;
mod fft;

pub use biquad::Biquad;
pub use fft::WindowedFft;
