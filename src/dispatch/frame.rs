//! The audio frame that flows through the processing chain

/// A window of mono float samples with time metadata.
///
/// The frame and its sample buffer are owned by the dispatcher and reused
/// from frame to frame for performance; a processor must copy any samples
/// it wants to keep beyond its own `process` call. A processor that changes
/// frame geometry (e.g. a resampler) replaces the buffer wholesale with
/// [`AudioFrame::replace_buffer`]; the dispatcher re-reads the buffer
/// length after every processor call instead of caching it.
#[derive(Debug)]
pub struct AudioFrame {
    buffer: Vec<f32>,
    overlap: usize,
    sample_rate: f32,
    start_sample: u64,
    stream_length: Option<u64>,
}

impl AudioFrame {
    pub(crate) fn new(sample_rate: f32, stream_length: Option<u64>) -> Self {
        Self {
            buffer: Vec::new(),
            overlap: 0,
            sample_rate,
            start_sample: 0,
            stream_length,
        }
    }

    /// The samples of this frame.
    pub fn samples(&self) -> &[f32] {
        &self.buffer
    }

    /// Mutable access to the samples, for in-place transforming processors.
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.buffer
    }

    /// Replace the sample buffer wholesale and return the previous one.
    ///
    /// This is the supported way for a processor to change frame geometry;
    /// resizing the buffer in place while downstream processors assume the
    /// old length is not.
    pub fn replace_buffer(&mut self, buffer: Vec<f32>) -> Vec<f32> {
        std::mem::replace(&mut self.buffer, buffer)
    }

    /// Number of samples in this frame.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// True if the frame holds no samples.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Number of samples shared with the previous frame.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Sample rate of the stream in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Time stamp at the beginning of this frame, in seconds since the
    /// start of the stream. Non-decreasing over the life of a dispatcher.
    pub fn time_stamp(&self) -> f64 {
        self.start_sample as f64 / self.sample_rate as f64
    }

    /// Time stamp at the end of this frame, in seconds.
    pub fn end_time_stamp(&self) -> f64 {
        (self.start_sample + self.buffer.len() as u64) as f64 / self.sample_rate as f64
    }

    /// Progress through the stream in `[0, 1]`, or `None` when the stream
    /// length is not known beforehand (e.g. live input).
    pub fn progress(&self) -> Option<f64> {
        self.stream_length.map(|total| {
            if total == 0 {
                return 1.0;
            }
            let end = self.start_sample + self.buffer.len() as u64;
            (end as f64 / total as f64).min(1.0)
        })
    }

    /// Root mean square of the samples in this frame.
    pub fn rms(&self) -> f64 {
        if self.buffer.is_empty() {
            return 0.0;
        }
        let energy: f64 = self.buffer.iter().map(|&s| s as f64 * s as f64).sum();
        (energy / self.buffer.len() as f64).sqrt()
    }

    /// Sound pressure level of this frame in dB.
    pub fn sound_pressure_level(&self) -> f64 {
        if self.buffer.is_empty() {
            return f64::NEG_INFINITY;
        }
        let energy: f64 = self.buffer.iter().map(|&s| s as f64 * s as f64).sum();
        let value = energy.sqrt() / self.buffer.len() as f64;
        20.0 * value.log10()
    }

    /// True when the sound pressure level is below `threshold_db`.
    pub fn is_silence(&self, threshold_db: f64) -> bool {
        self.sound_pressure_level() < threshold_db
    }

    pub(crate) fn set_overlap(&mut self, overlap: usize) {
        self.overlap = overlap;
    }

    pub(crate) fn set_start_sample(&mut self, start_sample: u64) {
        self.start_sample = start_sample;
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut Vec<f32> {
        &mut self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with(samples: &[f32]) -> AudioFrame {
        let mut frame = AudioFrame::new(44100.0, None);
        frame.buffer_mut().extend_from_slice(samples);
        frame
    }

    #[test]
    fn test_time_stamps() {
        let mut frame = frame_with(&[0.0; 1024]);
        frame.set_start_sample(512);
        assert!((frame.time_stamp() - 512.0 / 44100.0).abs() < 1e-12);
        assert!((frame.end_time_stamp() - 1536.0 / 44100.0).abs() < 1e-12);
    }

    #[test]
    fn test_progress_unknown_length() {
        let frame = frame_with(&[0.0; 64]);
        assert_eq!(frame.progress(), None);
    }

    #[test]
    fn test_rms_of_constant_signal() {
        let frame = frame_with(&[0.5; 256]);
        assert!((frame.rms() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_silence_detection() {
        let silent = frame_with(&[0.0; 256]);
        assert!(silent.is_silence(-70.0));

        let loud = frame_with(&[0.9; 256]);
        assert!(!loud.is_silence(-70.0));
    }

    #[test]
    fn test_replace_buffer_changes_length() {
        let mut frame = frame_with(&[0.1; 100]);
        let old = frame.replace_buffer(vec![0.0; 50]);
        assert_eq!(old.len(), 100);
        assert_eq!(frame.len(), 50);
    }
}
