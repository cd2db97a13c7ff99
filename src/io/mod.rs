//! Audio source boundary
//!
//! The core consumes mono 32-bit float samples in `[-1.0, 1.0]` through the
//! [`AudioSource`] trait. Concrete providers (file decoders, microphone
//! capture, network pipes) live outside this crate and only have to
//! implement this trait. [`MemoryAudioSource`] is the in-memory reference
//! implementation.

use crate::error::AnalysisError;

/// Describes the arrangement of data in a sample stream.
///
/// The core assumes mono float samples; the remaining fields document the
/// stream for providers that convert from packed integer formats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFormat {
    /// Sample rate in Hz
    pub sample_rate: f32,
    /// Bits per sample of the decoded representation
    pub bits_per_sample: u16,
    /// Number of interleaved channels; the core requires 1
    pub channels: u16,
    /// Size of one sample frame in bytes
    pub frame_size: u16,
}

impl AudioFormat {
    /// A mono 32-bit float format at the given sample rate.
    pub fn mono_f32(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            bits_per_sample: 32,
            channels: 1,
            frame_size: 4,
        }
    }
}

/// A pull-based stream of mono float samples.
///
/// `read` may return fewer samples than requested without that meaning the
/// end of the stream; callers retry until the buffer is full or `None` is
/// returned.
pub trait AudioSource: Send {
    /// The format of the stream.
    fn format(&self) -> AudioFormat;

    /// Read up to `buffer.len()` samples into `buffer`.
    ///
    /// # Returns
    ///
    /// `Some(n)` with the number of samples written (possibly fewer than
    /// requested), or `None` when the end of the stream is reached.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::SourceRead` when the underlying provider
    /// fails.
    fn read(&mut self, buffer: &mut [f32]) -> Result<Option<usize>, AnalysisError>;

    /// Skip `samples` samples. Returns the number actually skipped.
    fn skip(&mut self, samples: u64) -> Result<u64, AnalysisError>;

    /// Total length of the stream in samples, if known beforehand.
    fn total_samples(&self) -> Option<u64>;

    /// Release any resources held by the source.
    fn close(&mut self) -> Result<(), AnalysisError> {
        Ok(())
    }
}

/// An [`AudioSource`] backed by an in-memory sample buffer.
#[derive(Debug, Clone)]
pub struct MemoryAudioSource {
    samples: Vec<f32>,
    position: usize,
    format: AudioFormat,
}

impl MemoryAudioSource {
    /// Create a source over `samples` at `sample_rate` Hz.
    pub fn new(samples: Vec<f32>, sample_rate: f32) -> Self {
        Self {
            samples,
            position: 0,
            format: AudioFormat::mono_f32(sample_rate),
        }
    }

    /// The current read position in samples.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl AudioSource for MemoryAudioSource {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn read(&mut self, buffer: &mut [f32]) -> Result<Option<usize>, AnalysisError> {
        let remaining = self.samples.len() - self.position;
        if remaining == 0 {
            return Ok(None);
        }
        let n = remaining.min(buffer.len());
        buffer[..n].copy_from_slice(&self.samples[self.position..self.position + n]);
        self.position += n;
        Ok(Some(n))
    }

    fn skip(&mut self, samples: u64) -> Result<u64, AnalysisError> {
        let remaining = (self.samples.len() - self.position) as u64;
        let skipped = samples.min(remaining);
        self.position += skipped as usize;
        Ok(skipped)
    }

    fn total_samples(&self) -> Option<u64> {
        Some(self.samples.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source_reads_all_samples() {
        let mut source = MemoryAudioSource::new(vec![0.1, 0.2, 0.3, 0.4, 0.5], 44100.0);
        let mut buffer = [0.0f32; 3];

        assert_eq!(source.read(&mut buffer).unwrap(), Some(3));
        assert_eq!(buffer, [0.1, 0.2, 0.3]);

        // Short read at the tail, then end of stream
        assert_eq!(source.read(&mut buffer).unwrap(), Some(2));
        assert_eq!(&buffer[..2], &[0.4, 0.5]);
        assert_eq!(source.read(&mut buffer).unwrap(), None);
    }

    #[test]
    fn test_memory_source_skip() {
        let mut source = MemoryAudioSource::new(vec![0.0; 100], 44100.0);
        assert_eq!(source.skip(40).unwrap(), 40);
        assert_eq!(source.position(), 40);

        // Skipping past the end is clamped
        assert_eq!(source.skip(100).unwrap(), 60);
        let mut buffer = [0.0f32; 4];
        assert_eq!(source.read(&mut buffer).unwrap(), None);
    }

    #[test]
    fn test_total_samples_known() {
        let source = MemoryAudioSource::new(vec![0.0; 123], 48000.0);
        assert_eq!(source.total_samples(), Some(123));
        assert_eq!(source.format().channels, 1);
    }
}
