//! Polling-based snapshot delivery
//!
//! This module provides a way to hand versioned snapshots over from a producer
//! thread to a consumer which polls them. It provides maximal performance in
//! scenarios where the consumer only needs the latest state, since neither
//! side ever waits for the other.

use crate::sequence::{SequenceTracker, VersionedState};
use triple_buffer::{Input, Output, TripleBuffer};


/// Set up a snapshot channel, starting from some initial snapshot
pub fn snapshot_channel<S>(initial: &VersionedState<S>)
    -> (SnapshotPublisher<S>, SnapshotReader<S>)
    where S: Clone + Send
{
    let (input, output) = TripleBuffer::new(initial).split();
    (SnapshotPublisher { input },
     SnapshotReader { output, tracker: SequenceTracker::new() })
}


/// Producer interface, used to publish new snapshots
pub struct SnapshotPublisher<S: Send> {
    /// New snapshots will be sent through this triple buffer
    input: Input<VersionedState<S>>,
}
//
impl<S: Send> SnapshotPublisher<S> {
    /// Publish a snapshot, replacing any snapshot which was not read yet
    pub fn publish(&mut self, snapshot: VersionedState<S>) {
        self.input.write(snapshot);
    }
}


/// Consumer interface, used to poll the latest snapshot
pub struct SnapshotReader<S: Send> {
    /// Latest snapshot will be read through this triple buffer
    output: Output<VersionedState<S>>,

    /// Last sequence number handed out by `poll_new`
    tracker: SequenceTracker,
}
//
impl<S: Send> SnapshotReader<S> {
    /// Access the latest snapshot, whether it is new or not
    pub fn latest(&mut self) -> &VersionedState<S> {
        self.output.read()
    }

    /// Access the latest snapshot, if it is newer than the last one which
    /// this method returned
    pub fn poll_new(&mut self) -> Option<&VersionedState<S>> {
        let snapshot = self.output.read();
        if self.tracker.observe(snapshot.sequence) {
            Some(snapshot)
        } else {
            None
        }
    }

    /// Last sequence number handed out by `poll_new`, if any
    pub fn last_processed(&self) -> Option<u64> {
        self.tracker.last_processed()
    }
}
