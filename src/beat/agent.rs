//! A single beat tracking hypothesis
//!
//! An agent pairs a tempo (its beat interval) with a phase (its last
//! confirmed beat time) and scores how well incoming onsets fit the beat
//! times it predicts. Onsets near a prediction are accepted as beats and
//! nudge the tempo; onsets in the outer tolerance window fork a second
//! agent that skips the onset, so both interpretations stay in play.

use crate::beat::event::{Event, EventList};
use crate::config::AgentConfig;

/// Outcome of offering an onset to an agent.
#[derive(Debug)]
pub enum BeatDecision {
    /// The onset was accepted as the agent's next beat.
    Accepted,
    /// The onset was accepted, and its deviation was large enough that a
    /// fork skipping the onset was created. The fork carries the agent's
    /// state from before the acceptance.
    AcceptedWithBranch(Agent),
    /// The agent went too long without a matching onset and marked
    /// itself for removal.
    Expired,
    /// The onset fell outside the agent's tolerance window.
    Ignored,
}

/// One beat tracking hypothesis: a tempo, a phase, and the beats accepted
/// so far.
#[derive(Debug, Clone)]
pub struct Agent {
    id: u64,
    beat_interval: f64,
    initial_beat_interval: f64,
    // Time of the last accepted beat; negative before the first one
    beat_time: f64,
    beat_count: usize,
    phase_score: f64,
    pre_margin: f64,
    post_margin: f64,
    events: EventList,
}

impl Agent {
    /// Create an agent with the given beat interval and no phase yet.
    pub fn new(beat_interval: f64, id: u64, config: &AgentConfig) -> Self {
        Self {
            id,
            beat_interval,
            initial_beat_interval: beat_interval,
            beat_time: -1.0,
            beat_count: 0,
            phase_score: 0.0,
            pre_margin: beat_interval * config.pre_margin_factor,
            post_margin: beat_interval * config.post_margin_factor,
            events: EventList::new(),
        }
    }

    /// Unique id within the tracking run.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current beat interval in seconds.
    pub fn beat_interval(&self) -> f64 {
        self.beat_interval
    }

    /// Time of the last accepted beat, negative before the first one.
    pub fn beat_time(&self) -> f64 {
        self.beat_time
    }

    /// Number of beat periods covered by the accepted beats.
    pub fn beat_count(&self) -> usize {
        self.beat_count
    }

    /// Accumulated salience-weighted fit of onsets to predictions.
    pub fn phase_score(&self) -> f64 {
        self.phase_score
    }

    /// The beats tracked or interpolated so far, in time order.
    pub fn beats(&self) -> &EventList {
        &self.events
    }

    pub(crate) fn mark_for_removal(&mut self) {
        self.phase_score = -1.0;
    }

    pub(crate) fn marked_for_removal(&self) -> bool {
        self.phase_score < 0.0
    }

    fn fork(&self, id: u64) -> Agent {
        let mut clone = self.clone();
        clone.id = id;
        clone
    }

    /// Offer an onset to this agent.
    ///
    /// The first onset an agent sees is always accepted and fixes its
    /// phase. Later onsets are matched against the predicted beat grid:
    /// accepted inside `[-pre_margin, post_margin]` of a prediction, with
    /// a fork when the deviation exceeds the inner margin. Fork ids are
    /// drawn from `next_id`.
    pub(crate) fn consider_as_beat(
        &mut self,
        event: Event,
        config: &AgentConfig,
        next_id: &mut u64,
    ) -> BeatDecision {
        if self.beat_time < 0.0 {
            self.phase_score = event.salience;
            self.beat_time = event.time;
            self.beat_count = 1;
            self.events.push(event);
            return BeatDecision::Accepted;
        }

        let last_event_time = self
            .events
            .events()
            .last()
            .map(|e| e.time)
            .unwrap_or(self.beat_time);
        if event.time - last_event_time > config.expiry_time {
            self.mark_for_removal();
            return BeatDecision::Expired;
        }

        let beats = ((event.time - self.beat_time) / self.beat_interval).round();
        let err = event.time - self.beat_time - beats * self.beat_interval;
        if beats > 0.0 && -self.pre_margin <= err && err <= self.post_margin {
            // The fork is taken before accepting, so it skips this onset.
            let branch = if err.abs() > config.inner_margin {
                let id = *next_id;
                *next_id += 1;
                Some(self.fork(id))
            } else {
                None
            };
            self.accept(event, err, beats as usize, config);
            match branch {
                Some(agent) => BeatDecision::AcceptedWithBranch(agent),
                None => BeatDecision::Accepted,
            }
        } else {
            BeatDecision::Ignored
        }
    }

    fn accept(&mut self, event: Event, err: f64, beats: usize, config: &AgentConfig) {
        self.beat_time = event.time;
        self.events.push(event);
        let corrected = self.beat_interval + err / config.correction_factor;
        if (self.initial_beat_interval - corrected).abs()
            < config.max_change * self.initial_beat_interval
        {
            self.beat_interval = corrected;
        }
        self.beat_count += beats;
        let margin = if err > 0.0 {
            self.post_margin
        } else {
            -self.pre_margin
        };
        let fit = 1.0 - config.conf_factor * err / margin;
        self.phase_score += event.salience * fit;
    }

    /// Replace the tracked beats with a complete beat grid over
    /// `[start, end]`: beats are extrapolated backwards from the first
    /// tracked beat, gaps between tracked beats are interpolated at the
    /// local tempo, and the grid is extended forwards to `end`. Beat
    /// indices are renumbered from 1.
    pub fn fill_beats(&mut self, start: f64, end: f64) {
        if self.events.is_empty() || self.beat_interval <= 0.0 {
            return;
        }
        let tracked = std::mem::take(self.events.events_mut());
        let mut grid: Vec<Event> = Vec::with_capacity(tracked.len());

        let mut lead = Vec::new();
        let mut t = tracked[0].time - self.beat_interval;
        while t >= start {
            lead.push(Event::new(t, 0.0));
            t -= self.beat_interval;
        }
        lead.reverse();
        grid.extend(lead);

        grid.push(tracked[0]);
        let mut prev = tracked[0].time;
        for event in &tracked[1..] {
            let next = event.time;
            // Prefer the slower interpretation when the gap is ambiguous.
            let mut beats = ((next - prev) / self.beat_interval - 0.01).round();
            if beats >= 1.0 {
                let interval = (next - prev) / beats;
                let mut t = prev;
                while beats > 1.5 {
                    t += interval;
                    grid.push(Event::new(t, 0.0));
                    beats -= 1.0;
                }
            }
            grid.push(*event);
            prev = next;
        }

        let mut t = prev + self.beat_interval;
        while t <= end {
            grid.push(Event::new(t, 0.0));
            t += self.beat_interval;
        }

        for (index, beat) in grid.iter_mut().enumerate() {
            beat.beat_index = index + 1;
        }
        *self.events.events_mut() = grid;
    }
}
