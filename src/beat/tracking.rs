//! Multi-agent beat tracking
//!
//! An [`AgentSet`] holds the competing tempo/phase hypotheses produced by
//! induction and feeds every onset to every agent. Agents fork on
//! ambiguous onsets and expire when the onsets leave them behind; after
//! each onset near-identical agents are collapsed so the population stays
//! bounded. The agent with the highest phase score wins.

use std::cmp::Ordering;

use crate::beat::agent::{Agent, BeatDecision};
use crate::beat::event::EventList;
use crate::config::AgentConfig;

// Onsets this far into the stream no longer seed new phase hypotheses.
const NEW_AGENT_WINDOW: f64 = 5.0;

/// The population of beat tracking agents, kept sorted by beat interval.
pub struct AgentSet {
    agents: Vec<Agent>,
    config: AgentConfig,
    next_id: u64,
}

impl AgentSet {
    /// An empty population.
    pub fn new(config: AgentConfig) -> Self {
        Self {
            agents: Vec::new(),
            config,
            next_id: 0,
        }
    }

    /// Add a phase-less agent with the given beat interval.
    pub fn spawn(&mut self, beat_interval: f64) {
        let id = self.next_id;
        self.next_id += 1;
        self.insert(Agent::new(beat_interval, id, &self.config));
    }

    /// Number of live agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// True when no agents are left.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// The agents in beat interval order.
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    fn insert(&mut self, agent: Agent) {
        let pos = self
            .agents
            .partition_point(|a| a.beat_interval() <= agent.beat_interval());
        self.agents.insert(pos, agent);
    }

    /// Feed every onset in `events` to the population, forking, expiring
    /// and deduplicating as the stream progresses.
    pub fn beat_track(&mut self, events: &EventList) {
        for event in events.iter() {
            let mut spawned: Vec<Agent> = Vec::new();
            let mut next_id = self.next_id;
            let mut prev_interval = -1.0;
            let mut group_accepted = false;

            for agent in self.agents.iter_mut() {
                if agent.beat_interval() != prev_interval {
                    // Entering a new tempo group: if the previous group
                    // ignored an early onset, seed an agent with that
                    // tempo and this onset as its phase.
                    if prev_interval >= 0.0 && !group_accepted && event.time < NEW_AGENT_WINDOW {
                        let id = next_id;
                        next_id += 1;
                        let mut fresh = Agent::new(prev_interval, id, &self.config);
                        fresh.consider_as_beat(*event, &self.config, &mut next_id);
                        spawned.push(fresh);
                    }
                    prev_interval = agent.beat_interval();
                    group_accepted = false;
                }
                match agent.consider_as_beat(*event, &self.config, &mut next_id) {
                    BeatDecision::Accepted => group_accepted = true,
                    BeatDecision::AcceptedWithBranch(branch) => {
                        group_accepted = true;
                        spawned.push(branch);
                    }
                    BeatDecision::Expired | BeatDecision::Ignored => {}
                }
            }
            if prev_interval >= 0.0 && !group_accepted && event.time < NEW_AGENT_WINDOW {
                let id = next_id;
                next_id += 1;
                let mut fresh = Agent::new(prev_interval, id, &self.config);
                fresh.consider_as_beat(*event, &self.config, &mut next_id);
                spawned.push(fresh);
            }

            self.next_id = next_id;
            for agent in spawned {
                self.insert(agent);
            }
            self.remove_duplicates();
        }
        log::debug!(
            "beat tracking finished with {} live agents over {} onsets",
            self.agents.len(),
            events.len()
        );
    }

    // Collapse agents with near-identical tempo and phase, keeping the
    // higher phase score. Also drops agents flagged by expiry.
    fn remove_duplicates(&mut self) {
        self.agents.sort_by(|a, b| {
            a.beat_interval()
                .partial_cmp(&b.beat_interval())
                .unwrap_or(Ordering::Equal)
        });
        for i in 0..self.agents.len() {
            if self.agents[i].marked_for_removal() {
                continue;
            }
            for j in i + 1..self.agents.len() {
                if self.agents[j].beat_interval() - self.agents[i].beat_interval()
                    > self.config.duplicate_interval
                {
                    break;
                }
                if (self.agents[i].beat_time() - self.agents[j].beat_time()).abs()
                    > self.config.duplicate_phase
                {
                    continue;
                }
                if self.agents[i].phase_score() < self.agents[j].phase_score() {
                    self.agents[i].mark_for_removal();
                    break;
                } else {
                    self.agents[j].mark_for_removal();
                }
            }
        }
        self.agents.retain(|a| !a.marked_for_removal());
    }

    /// The agent with the highest phase score, if any.
    pub fn best_agent(&self) -> Option<&Agent> {
        self.agents.iter().max_by(|a, b| {
            a.phase_score()
                .partial_cmp(&b.phase_score())
                .unwrap_or(Ordering::Equal)
        })
    }

    /// Consume the set and return the winning agent.
    pub fn into_best(mut self) -> Option<Agent> {
        let best = self.best_agent()?.id();
        let pos = self.agents.iter().position(|a| a.id() == best)?;
        Some(self.agents.swap_remove(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beat::event::Event;
    use crate::beat::induction::beat_induction;
    use crate::config::InductionConfig;

    fn click_onsets(period: f64, count: usize) -> EventList {
        (0..count)
            .map(|i| Event::new(i as f64 * period, 1.0))
            .collect()
    }

    fn track(events: &EventList) -> AgentSet {
        let mut set = beat_induction(
            events,
            &InductionConfig::default(),
            &AgentConfig::default(),
        );
        set.beat_track(events);
        set
    }

    #[test]
    fn test_regular_clicks_are_tracked() {
        let events = click_onsets(0.5, 24);
        let set = track(&events);
        let best = set.best_agent().expect("a winning agent");
        assert!(
            (best.beat_interval() - 0.5).abs() < 0.01,
            "interval: {}",
            best.beat_interval()
        );
        // Every click lands on a predicted beat.
        assert!(best.beats().len() >= 20, "beats: {}", best.beats().len());
        for beat in best.beats().iter() {
            let nearest = (beat.time / 0.5).round() * 0.5;
            assert!((beat.time - nearest).abs() < 0.05);
        }
    }

    #[test]
    fn test_empty_onset_list_leaves_no_winner() {
        let mut set = AgentSet::new(AgentConfig::default());
        set.beat_track(&EventList::new());
        assert!(set.best_agent().is_none());
        assert!(set.into_best().is_none());
    }

    #[test]
    fn test_duplicates_are_collapsed() {
        let mut set = AgentSet::new(AgentConfig::default());
        set.spawn(0.5);
        set.spawn(0.5);
        set.spawn(0.505);
        // Same tempo, same (absent) phase: one survivor per tempo group.
        set.remove_duplicates();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_tracking_tolerates_a_missing_click(){
        let mut events = EventList::new();
        for i in 0..24 {
            if i == 10 {
                continue;
            }
            events.insert(Event::new(i as f64 * 0.5, 1.0));
        }
        let set = track(&events);
        let best = set.best_agent().expect("a winning agent");
        assert!((best.beat_interval() - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_agents_stay_sorted_by_interval() {
        let events = click_onsets(0.4, 20);
        let set = track(&events);
        let intervals: Vec<f64> = set.agents().iter().map(|a| a.beat_interval()).collect();
        for pair in intervals.windows(2) {
            assert!(pair[0] <= pair[1] + 1e-12);
        }
    }
}
