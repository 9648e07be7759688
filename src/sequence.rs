//! State versioning through sequence numbers
//!
//! A consumer which polls a producer's state, or receives it whenever the
//! producer feels like sending it, needs a cheap way to tell whether a given
//! snapshot carries anything new. Comparing whole snapshots is expensive and
//! not always possible. Instead, the producer stamps every snapshot with a
//! sequence number which it increments each time its state actually changes,
//! and the consumer remembers the last sequence number it acted upon.
//!
//! Sequence numbers are only meaningful within a single producer instance.

use serde::{Deserialize, Serialize};


/// Snapshot of some state, stamped with its sequence number
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedState<S> {
    /// Sequence number of the state. Zero means that the state was never
    /// updated since the producer was created.
    pub sequence: u64,

    /// The state itself
    pub state: S,
}


/// Producer-side owner of a versioned state
#[derive(Clone, Debug, Default)]
pub struct StateSequencer<S> {
    state: S,
    sequence: u64,
}
//
impl<S> StateSequencer<S> {
    /// Start versioning some initial state, with sequence number zero
    pub fn new(initial: S) -> Self {
        StateSequencer { state: initial, sequence: 0 }
    }

    /// Current state
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Sequence number of the current state
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Update the state, then bump the sequence number
    ///
    /// The new sequence number is only assigned once the update is complete,
    /// so it can never be observed alongside the data of a previous version.
    ///
    pub fn commit<R>(&mut self, update: impl FnOnce(&mut S) -> R) -> R {
        let result = update(&mut self.state);
        self.sequence += 1;
        result
    }
}
//
impl<S: Clone> StateSequencer<S> {
    /// Copy of the current state, stamped with its sequence number
    pub fn snapshot(&self) -> VersionedState<S> {
        VersionedState {
            sequence: self.sequence,
            state: self.state.clone(),
        }
    }
}


/// Consumer-side record of the last sequence number acted upon
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SequenceTracker {
    /// None until the first snapshot has been acted upon, which sits below
    /// every sequence number including the initial zero
    last_processed: Option<u64>,
}
//
impl SequenceTracker {
    /// Start tracking, with no snapshot processed yet
    pub fn new() -> Self {
        SequenceTracker { last_processed: None }
    }

    /// Last sequence number which was acted upon, if any
    pub fn last_processed(&self) -> Option<u64> {
        self.last_processed
    }

    /// Truth that a snapshot with this sequence number carries nothing new
    ///
    /// Anything at or below the last processed sequence number is stale, so
    /// a consumer which skipped some intermediate versions still gets the
    /// right answer.
    ///
    pub fn is_stale(&self, sequence: u64) -> bool {
        self.last_processed.map_or(false, |last| sequence <= last)
    }

    /// Decide whether to act upon a snapshot with this sequence number
    ///
    /// Returns true, and records the sequence number as processed, if the
    /// snapshot is new. Returns false for stale snapshots.
    ///
    pub fn observe(&mut self, sequence: u64) -> bool {
        if self.is_stale(sequence) {
            return false;
        }
        self.last_processed = Some(sequence);
        true
    }
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;

    /// Check that commits bump the sequence number by one after updating
    #[test]
    fn commit_bumps_sequence() {
        let mut sequencer = StateSequencer::new(0i64);
        assert_eq!(sequencer.snapshot(), VersionedState { sequence: 0, state: 0 });

        let old = sequencer.commit(|counter| {
            let old = *counter;
            *counter += 3;
            old
        });
        assert_eq!(old, 0);
        assert_eq!(sequencer.snapshot(), VersionedState { sequence: 1, state: 3 });

        sequencer.commit(|counter| *counter += 3);
        assert_eq!(sequencer.sequence(), 2);
        assert_eq!(*sequencer.state(), 6);
    }

    /// Check that sequence numbers only ever grow
    #[test]
    fn strictly_increasing() {
        let mut sequencer = StateSequencer::new(());
        let mut previous = sequencer.sequence();
        for _ in 0..100 {
            sequencer.commit(|_| ());
            assert_eq!(sequencer.sequence(), previous + 1);
            previous = sequencer.sequence();
        }
    }

    /// Check that a fresh tracker accepts the initial snapshot
    #[test]
    fn fresh_tracker() {
        let mut tracker = SequenceTracker::new();
        assert_eq!(tracker.last_processed(), None);
        assert!(!tracker.is_stale(0));
        assert!(tracker.observe(0));
        assert!(!tracker.observe(0));
        assert_eq!(tracker.last_processed(), Some(0));
    }

    /// Check the staleness scenario of a consumer which processed sequence 5
    #[test]
    fn stale_then_new() {
        let mut tracker = SequenceTracker::new();
        assert!(tracker.observe(5));

        // Sequence 5 again: no action
        assert!(!tracker.observe(5));
        assert_eq!(tracker.last_processed(), Some(5));

        // Sequence 6: action, and 6 becomes the last processed
        assert!(tracker.observe(6));
        assert_eq!(tracker.last_processed(), Some(6));
    }

    /// Check that skipped versions and late re-deliveries are handled
    #[test]
    fn skips_and_redeliveries() {
        let mut tracker = SequenceTracker::new();
        let acted: Vec<u64> = [0, 0, 3, 2, 3, 9, 4, 10]
            .iter()
            .copied()
            .filter(|&sequence| tracker.observe(sequence))
            .collect();
        assert_eq!(acted, vec![0, 3, 9, 10]);
    }

    /// Check that snapshots survive a trip through the boundary encoding
    #[test]
    fn serde_representation() {
        let snapshot = VersionedState { sequence: 4, state: "hello".to_string() };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(json, r#"{"sequence":4,"state":"hello"}"#);
    }
}
