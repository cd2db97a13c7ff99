//! Frame dispatch pipeline
//!
//! Audio analysis in this crate is organised as a chain of processors fed
//! by a dispatcher: the dispatcher pulls samples from an audio source,
//! windows them into overlapping [`AudioFrame`]s and hands every frame to
//! each [`AudioProcessor`] in turn. Detectors (pitch, onset) are plain
//! processors, so chains compose freely.

mod dispatcher;
mod frame;

pub use dispatcher::{AudioDispatcher, AudioProcessor, DispatcherHandle, ProcessorId};
pub use frame::AudioFrame;
