//! Tempo induction and beat tracking
//!
//! Beat tracking runs offline over the onsets of a whole stream, in two
//! stages modelled on the BeatRoot system:
//!
//! 1. [`beat_induction`] clusters inter-onset intervals into tempo
//!    hypotheses and creates one phase-less [`Agent`] per hypothesis.
//! 2. [`AgentSet::beat_track`] replays the onsets through the competing
//!    agents; each agent locks onto a phase, accepts onsets matching its
//!    predicted beat grid, forks on ambiguous onsets and expires when
//!    the onsets leave it behind.
//!
//! The winning agent's beats are completed into a gapless grid with
//! [`Agent::fill_beats`]. [`OnsetCollector`] packages the whole pipeline
//! behind an onset handler that plugs into a dispatcher chain.

mod agent;
mod event;
mod handler;
mod induction;
mod tracking;

pub use agent::{Agent, BeatDecision};
pub use event::{Event, EventList};
pub use handler::OnsetCollector;
pub use induction::beat_induction;
pub use tracking::AgentSet;
