//! Timed events for tempo induction and beat tracking

use serde::{Deserialize, Serialize};

/// An onset or beat with its position in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Time in seconds since the start of the stream
    pub time: f64,

    /// Strength of the event; zero for interpolated beats
    pub salience: f64,

    /// Position in the beat sequence, counted from 1; zero while the
    /// event is an onset rather than a tracked beat
    pub beat_index: usize,
}

impl Event {
    /// An event with no beat position assigned yet.
    pub fn new(time: f64, salience: f64) -> Self {
        Self {
            time,
            salience,
            beat_index: 0,
        }
    }
}

/// A list of events kept sorted by time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventList {
    events: Vec<Event>,
}

impl EventList {
    /// An empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `event` at its position in time order. Events with equal
    /// times keep their insertion order.
    pub fn insert(&mut self, event: Event) {
        let pos = self
            .events
            .partition_point(|e| e.time <= event.time);
        self.events.insert(pos, event);
    }

    /// Append `event`, which must not be earlier than the current last
    /// event.
    pub fn push(&mut self, event: Event) {
        debug_assert!(self
            .events
            .last()
            .map(|last| last.time <= event.time)
            .unwrap_or(true));
        self.events.push(event);
    }

    /// The events in time order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Mutable access in time order.
    pub fn events_mut(&mut self) -> &mut Vec<Event> {
        &mut self.events
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when the list holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate over the events in time order.
    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }
}

impl FromIterator<Event> for EventList {
    fn from_iter<T: IntoIterator<Item = Event>>(iter: T) -> Self {
        let mut list = EventList::new();
        for event in iter {
            list.insert(event);
        }
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_time_order() {
        let mut list = EventList::new();
        list.insert(Event::new(2.0, 1.0));
        list.insert(Event::new(0.5, 1.0));
        list.insert(Event::new(1.0, 1.0));
        let times: Vec<f64> = list.iter().map(|e| e.time).collect();
        assert_eq!(times, vec![0.5, 1.0, 2.0]);
    }

    #[test]
    fn test_collect_from_unsorted_iterator() {
        let list: EventList = [3.0, 1.0, 2.0]
            .iter()
            .map(|&t| Event::new(t, 0.5))
            .collect();
        let times: Vec<f64> = list.iter().map(|e| e.time).collect();
        assert_eq!(times, vec![1.0, 2.0, 3.0]);
    }
}
