//! Bridging streaming onset detection into offline beat tracking

use std::sync::{Arc, Mutex};

use crate::beat::agent::Agent;
use crate::beat::event::{Event, EventList};
use crate::beat::induction::beat_induction;
use crate::config::{AgentConfig, InductionConfig};
use crate::onset::OnsetHandler;

/// Collects onsets from a running detector and, once the stream has been
/// consumed, runs tempo induction and beat tracking over them.
///
/// The collector is cheaply cloneable; clones share the same onset list,
/// so one clone can sit in a dispatcher chain while another drives the
/// tracking afterwards.
#[derive(Clone, Default)]
pub struct OnsetCollector {
    onsets: Arc<Mutex<EventList>>,
}

impl OnsetCollector {
    /// An empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of onsets collected so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True while no onsets have been collected.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// A snapshot of the collected onsets.
    pub fn onsets(&self) -> EventList {
        self.lock().clone()
    }

    /// Induce tempo hypotheses from the collected onsets, track beats
    /// across them and report each beat of the winning agent to
    /// `handler` as a time/salience pair. Interpolated beats carry zero
    /// salience.
    ///
    /// Returns the winning agent, or `None` when no onsets were
    /// collected or no agent survived tracking.
    pub fn track_beats(
        &self,
        induction: &InductionConfig,
        agents: &AgentConfig,
        handler: &mut dyn OnsetHandler,
    ) -> Option<Agent> {
        let onsets = self.onsets();
        if onsets.is_empty() {
            log::warn!("no onsets collected, skipping beat tracking");
            return None;
        }
        let mut set = beat_induction(&onsets, induction, agents);
        set.beat_track(&onsets);
        let mut best = match set.into_best() {
            Some(agent) => agent,
            None => {
                log::warn!("no agent survived beat tracking");
                return None;
            }
        };
        let end = onsets.events().last().map(|e| e.time).unwrap_or(0.0);
        best.fill_beats(0.0, end);
        for beat in best.beats().iter() {
            handler.handle_onset(beat.time, beat.salience);
        }
        Some(best)
    }

    /// Record one onset. Times are rounded to 10 ms so jitter between
    /// near-simultaneous detections collapses onto the same grid.
    pub fn handle_onset(&self, time: f64, salience: f64) {
        let rounded = (time * 100.0).round() / 100.0;
        self.lock().insert(Event::new(rounded, salience));
    }

    /// An [`OnsetHandler`] feeding this collector, for placing in a
    /// dispatcher chain.
    pub fn handler(&self) -> impl OnsetHandler {
        let collector = self.clone();
        move |time: f64, salience: f64| collector.handle_onset(time, salience)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EventList> {
        self.onsets.lock().unwrap_or_else(|e| e.into_inner())
    }
}
