//! Sliding-window frame dispatcher
//!
//! Pulls samples from an [`AudioSource`], slices them into overlapping
//! frames and pushes each frame through an ordered chain of
//! [`AudioProcessor`]s. The first frame is read in full; every subsequent
//! frame keeps the last `overlap` samples of the previous frame and reads
//! `buffer_size - overlap` fresh samples. The final frame of a stream may
//! be shorter than `buffer_size`; it is dispatched shrunken, never
//! zero-padded.
//!
//! The dispatcher is driven by calling [`AudioDispatcher::run`], typically
//! on a dedicated thread. A cloneable [`DispatcherHandle`] allows other
//! threads to stop the run and to edit the processor chain or the frame
//! geometry; edits take effect at the next frame boundary, never in the
//! middle of a frame.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::dispatch::frame::AudioFrame;
use crate::error::AnalysisError;
use crate::io::AudioSource;

/// A stage in the dispatcher's processing chain.
///
/// Processors run in the order they were added. Returning `false` from
/// `process` stops the chain for the current frame; later processors do
/// not see it. `processing_finished` is called exactly once per processor
/// when the stream ends, the run is stopped, or the run aborts on error.
pub trait AudioProcessor: Send {
    /// Process one frame. Return `true` to pass the frame on to the next
    /// processor in the chain.
    fn process(&mut self, frame: &mut AudioFrame) -> bool;

    /// Called once after the last frame has been dispatched.
    fn processing_finished(&mut self) {}
}

/// Identifies a processor in the chain for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessorId(u64);

enum ChainEdit {
    Add(ProcessorId, Box<dyn AudioProcessor>),
    Remove(ProcessorId),
    SetGeometry { buffer_size: usize, overlap: usize },
    Stop,
}

struct Shared {
    stopped: AtomicBool,
    edits: Mutex<VecDeque<ChainEdit>>,
    next_id: AtomicU64,
}

/// Cloneable handle for controlling a running [`AudioDispatcher`] from
/// other threads.
#[derive(Clone)]
pub struct DispatcherHandle {
    shared: Arc<Shared>,
}

impl DispatcherHandle {
    /// Request the run loop to stop. The frame currently being processed
    /// completes; `processing_finished` is then called on every processor.
    pub fn stop(&self) {
        self.shared.stopped.store(true, Ordering::SeqCst);
        self.push(ChainEdit::Stop);
    }

    /// True once `stop` has been requested or the run has finished.
    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::SeqCst)
    }

    /// Append a processor to the chain. Takes effect at the next frame
    /// boundary. Returns an id usable with [`DispatcherHandle::remove_processor`].
    pub fn add_processor(&self, processor: Box<dyn AudioProcessor>) -> ProcessorId {
        let id = ProcessorId(self.shared.next_id.fetch_add(1, Ordering::SeqCst));
        self.push(ChainEdit::Add(id, processor));
        id
    }

    /// Remove a processor from the chain at the next frame boundary. The
    /// removed processor's `processing_finished` is invoked at that point.
    pub fn remove_processor(&self, id: ProcessorId) {
        self.push(ChainEdit::Remove(id));
    }

    /// Change frame size and overlap at the next frame boundary.
    ///
    /// The overlap tail of the last dispatched frame is carried into the
    /// first frame of the new geometry, so no sample is dropped or
    /// duplicated across the change.
    pub fn set_step_size_and_overlap(&self, buffer_size: usize, overlap: usize) {
        self.push(ChainEdit::SetGeometry {
            buffer_size,
            overlap,
        });
    }

    fn push(&self, edit: ChainEdit) {
        let mut edits = self
            .shared
            .edits
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        edits.push_back(edit);
    }
}

/// Drives an [`AudioSource`] through a chain of [`AudioProcessor`]s.
pub struct AudioDispatcher {
    source: Box<dyn AudioSource>,
    processors: Vec<(ProcessorId, Box<dyn AudioProcessor>)>,
    buffer_size: usize,
    overlap: usize,
    frame: AudioFrame,
    samples_read: u64,
    shared: Arc<Shared>,
    finished: bool,
    // Overlap tail carried across a geometry change
    pending_carry: Vec<f32>,
    // True before the first frame and after a geometry change; the next
    // frame is then built from the carry plus a full fresh read.
    rebuild_frame: bool,
}

impl AudioDispatcher {
    /// Create a dispatcher reading `buffer_size`-sample frames with
    /// `overlap` samples shared between consecutive frames.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` when `buffer_size` is zero or
    /// `overlap >= buffer_size`.
    pub fn new(
        source: Box<dyn AudioSource>,
        buffer_size: usize,
        overlap: usize,
    ) -> Result<Self, AnalysisError> {
        if buffer_size == 0 {
            return Err(AnalysisError::InvalidInput(
                "buffer size must be positive".to_string(),
            ));
        }
        if overlap >= buffer_size {
            return Err(AnalysisError::InvalidInput(format!(
                "overlap ({}) must be smaller than buffer size ({})",
                overlap, buffer_size
            )));
        }
        let format = source.format();
        if format.channels != 1 {
            return Err(AnalysisError::InvalidInput(format!(
                "expected a mono source, got {} channels",
                format.channels
            )));
        }
        let frame = AudioFrame::new(format.sample_rate, source.total_samples());
        Ok(Self {
            source,
            processors: Vec::new(),
            buffer_size,
            overlap,
            frame,
            samples_read: 0,
            shared: Arc::new(Shared {
                stopped: AtomicBool::new(false),
                edits: Mutex::new(VecDeque::new()),
                next_id: AtomicU64::new(0),
            }),
            finished: false,
            pending_carry: Vec::new(),
            rebuild_frame: true,
        })
    }

    /// Append a processor to the chain before the run starts.
    pub fn add_processor(&mut self, processor: Box<dyn AudioProcessor>) -> ProcessorId {
        let id = ProcessorId(self.shared.next_id.fetch_add(1, Ordering::SeqCst));
        self.processors.push((id, processor));
        id
    }

    /// A handle for controlling this dispatcher from other threads.
    pub fn handle(&self) -> DispatcherHandle {
        DispatcherHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Sample rate of the underlying source in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.source.format().sample_rate
    }

    /// Skip `seconds` of audio before the first frame is read.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::SourceRead` when the source fails, and
    /// `AnalysisError::InvalidInput` for a negative duration.
    pub fn skip(&mut self, seconds: f64) -> Result<(), AnalysisError> {
        if seconds < 0.0 {
            return Err(AnalysisError::InvalidInput(
                "cannot skip a negative duration".to_string(),
            ));
        }
        let samples = (seconds * self.sample_rate() as f64).round() as u64;
        let skipped = self.source.skip(samples)?;
        self.samples_read += skipped;
        if skipped < samples {
            log::warn!(
                "skip requested {} samples but the source only had {}",
                samples,
                skipped
            );
        }
        Ok(())
    }

    /// Run the dispatch loop until the source is exhausted or the run is
    /// stopped through a [`DispatcherHandle`].
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::SourceRead` when the source fails mid-run.
    /// Processors still receive `processing_finished` on the error path.
    pub fn run(&mut self) -> Result<(), AnalysisError> {
        let result = self.run_inner();
        self.finish();
        result
    }

    fn run_inner(&mut self) -> Result<(), AnalysisError> {
        log::debug!(
            "dispatch starting: buffer_size={}, overlap={}",
            self.buffer_size,
            self.overlap
        );
        loop {
            if self.shared.stopped.load(Ordering::SeqCst) {
                break;
            }
            self.apply_pending_edits();
            if self.shared.stopped.load(Ordering::SeqCst) {
                break;
            }

            let read = if self.rebuild_frame {
                self.rebuild_frame = false;
                self.read_first_frame()?
            } else {
                self.read_next_frame()?
            };
            if read == 0 {
                break;
            }

            let start = self.samples_read - self.frame.len() as u64;
            self.frame.set_start_sample(start);
            for i in 0..self.processors.len() {
                if !self.processors[i].1.process(&mut self.frame) {
                    break;
                }
            }
        }
        Ok(())
    }

    // Fill a whole buffer, or carry the tail of a previous geometry and
    // top it up with fresh samples.
    fn read_first_frame(&mut self) -> Result<usize, AnalysisError> {
        let buf = self.frame.buffer_mut();
        buf.clear();
        buf.extend(self.pending_carry.drain(..));
        let carried = buf.len();
        buf.resize(self.buffer_size, 0.0);

        let fresh = Self::fill(&mut *self.source, &self.shared.stopped, {
            let buf = self.frame.buffer_mut();
            &mut buf[carried..]
        })?;
        let total = carried + fresh;
        self.frame.buffer_mut().truncate(total);
        self.frame.set_overlap(carried);
        self.samples_read += fresh as u64;
        Ok(total)
    }

    fn read_next_frame(&mut self) -> Result<usize, AnalysisError> {
        let step = self.buffer_size - self.overlap;
        {
            let buf = self.frame.buffer_mut();
            // A transforming processor may have replaced the buffer; restore
            // the dispatch geometry before sliding.
            if buf.len() != self.buffer_size {
                buf.resize(self.buffer_size, 0.0);
            }
            buf.copy_within(step.., 0);
        }
        let fresh = Self::fill(&mut *self.source, &self.shared.stopped, {
            let buf = self.frame.buffer_mut();
            &mut buf[self.overlap..]
        })?;
        if fresh == 0 {
            return Ok(0);
        }
        let total = self.overlap + fresh;
        self.frame.buffer_mut().truncate(total);
        self.frame.set_overlap(self.overlap);
        self.samples_read += fresh as u64;
        Ok(total)
    }

    // Retry short reads until the slice is full, the stream ends, or a
    // stop is requested.
    fn fill(
        source: &mut dyn AudioSource,
        stopped: &AtomicBool,
        slice: &mut [f32],
    ) -> Result<usize, AnalysisError> {
        let mut filled = 0;
        while filled < slice.len() {
            if stopped.load(Ordering::SeqCst) {
                break;
            }
            match source.read(&mut slice[filled..])? {
                Some(n) => filled += n,
                None => break,
            }
        }
        Ok(filled)
    }

    fn apply_pending_edits(&mut self) {
        let mut edits = self
            .shared
            .edits
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        while let Some(edit) = edits.pop_front() {
            match edit {
                ChainEdit::Add(id, processor) => {
                    self.processors.push((id, processor));
                }
                ChainEdit::Remove(id) => {
                    if let Some(pos) = self.processors.iter().position(|(pid, _)| *pid == id) {
                        let (_, mut processor) = self.processors.remove(pos);
                        processor.processing_finished();
                    } else {
                        log::warn!("remove requested for an unknown processor id");
                    }
                }
                ChainEdit::SetGeometry {
                    buffer_size,
                    overlap,
                } => {
                    if buffer_size == 0 || overlap >= buffer_size {
                        log::warn!(
                            "ignoring invalid geometry change: buffer_size={}, overlap={}",
                            buffer_size,
                            overlap
                        );
                        continue;
                    }
                    // Carry the shared tail of the last frame into the new
                    // geometry so the stream stays gapless.
                    let len = self.frame.len();
                    if len > 0 {
                        let keep = self.overlap.min(len).min(overlap);
                        let tail = &self.frame.samples()[len - keep..];
                        self.pending_carry = tail.to_vec();
                    }
                    self.buffer_size = buffer_size;
                    self.overlap = overlap;
                    // The next frame is rebuilt from scratch with the carry.
                    self.frame.buffer_mut().clear();
                    self.rebuild_frame = true;
                    log::debug!(
                        "frame geometry changed: buffer_size={}, overlap={}",
                        buffer_size,
                        overlap
                    );
                }
                ChainEdit::Stop => {
                    self.shared.stopped.store(true, Ordering::SeqCst);
                }
            }
        }
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.shared.stopped.store(true, Ordering::SeqCst);
        // Processors queued but never attached still get their teardown.
        {
            let mut edits = self
                .shared
                .edits
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            while let Some(edit) = edits.pop_front() {
                if let ChainEdit::Add(id, processor) = edit {
                    self.processors.push((id, processor));
                }
            }
        }
        for (_, processor) in self.processors.iter_mut() {
            processor.processing_finished();
        }
        if let Err(e) = self.source.close() {
            log::warn!("audio source failed to close: {}", e);
        }
        log::debug!("dispatch finished after {} samples", self.samples_read);
    }
}
