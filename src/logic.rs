//! Demo state producer
//!
//! `Logic` stands for the expensive, stateful computation which a host wants
//! to keep off its own thread. Every update bumps a counter and rewrites a
//! message, after some simulated work. Updates are rate-limited internally:
//! an update requested before the next tick is due does nothing and returns
//! the current, already seen, snapshot.
//!
//! Results can be consumed in two ways, both shown by the demo binary:
//!
//! - Through the versioned snapshot which every update returns.
//! - Through the change records which a listener receives, one per field.

use crate::change::{ChangeError, StateChange, UntypedStateChange};
use crate::config::LogicConfig;
use crate::sequence::{StateSequencer, VersionedState};
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;
use tracing::{debug, trace};


/// Name of the counter field in change records
pub const COUNTER: &str = "Counter";

/// Name of the message field in change records
pub const MESSAGE: &str = "Message";


/// State of the demo producer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicState {
    pub counter: i64,
    pub message: String,
}
//
impl Default for LogicState {
    fn default() -> Self {
        LogicState {
            counter: 0,
            message: "State not yet updated.".to_owned(),
        }
    }
}


/// Typed change of the demo producer's state
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogicChange {
    Counter { old: Option<i64>, new: i64 },
    Message { old: Option<String>, new: String },
}
//
impl StateChange for LogicChange {
    fn from_untyped(change: &UntypedStateChange) -> Result<Self, ChangeError> {
        match change.target.as_str() {
            COUNTER => Ok(LogicChange::Counter {
                old: change.parse_old()?,
                new: change.parse_new()?,
            }),
            MESSAGE => Ok(LogicChange::Message {
                old: change.old_value.clone(),
                new: change.new_value.clone(),
            }),
            other => Err(ChangeError::UnknownTarget(other.to_owned())),
        }
    }
}


/// Listener of the demo producer's changes
pub type ChangeListener = Box<dyn FnMut(UntypedStateChange) + Send>;


/// Demo state producer
pub struct Logic {
    /// Tuning parameters
    config: LogicConfig,

    /// Driver time before which updates are no-ops
    next_time: f64,

    /// Versioned state
    state: StateSequencer<LogicState>,

    /// Receiver of change records, if any
    listener: Option<ChangeListener>,
}
//
impl Logic {
    /// Set up a producer in its initial state
    pub fn new(config: LogicConfig) -> Self {
        Logic {
            config,
            next_time: 0.0,
            state: StateSequencer::new(LogicState::default()),
            listener: None,
        }
    }

    /// Send change records to a listener
    pub fn with_listener<F>(mut self, listener: F) -> Self
        where F: FnMut(UntypedStateChange) + Send + 'static
    {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Current versioned state
    pub fn snapshot(&self) -> VersionedState<LogicState> {
        self.state.snapshot()
    }

    /// Update the state if a tick is due, and return the current snapshot
    pub fn update(&mut self, time: f64) -> VersionedState<LogicState> {
        if time < self.next_time {
            trace!(time, next_time = self.next_time, "No update due yet");
            return self.state.snapshot();
        }
        self.next_time = time + self.config.tick_period_secs;

        // Some expensive operation
        let work = self.config.work_duration();
        if !work.is_zero() {
            thread::sleep(work);
        }

        let changes = self.state.commit(|state| {
            let new_counter = state.counter + 3;
            let new_message = format!("It is currently t={:.1}s.", time);
            let changes = [
                UntypedStateChange::new(COUNTER, Some(state.counter), new_counter),
                UntypedStateChange::new(MESSAGE,
                                        Some(state.message.clone()),
                                        new_message.clone()),
            ];
            state.counter = new_counter;
            state.message = new_message;
            changes
        });
        debug!(time, sequence = self.state.sequence(), "State updated");

        if let Some(listener) = self.listener.as_mut() {
            for change in changes {
                listener(change);
            }
        }
        self.state.snapshot()
    }
}


/// Result of the demo one-off operation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoobarResult {
    pub foo: i64,
    pub bar: String,
}

/// Demo one-off operation, with some simulated work
pub fn foobar(num: i64, work: Duration) -> FoobarResult {
    if !work.is_zero() {
        thread::sleep(work);
    }
    FoobarResult {
        foo: num + 1337,
        bar: format!("I like {}!", num),
    }
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Check that updates are rate-limited, and that skipped updates return
    /// a stale snapshot
    #[test]
    fn rate_limited_updates() {
        let mut logic = Logic::new(LogicConfig::for_testing());
        assert_eq!(logic.snapshot().sequence, 0);

        let first = logic.update(0.0);
        assert_eq!(first.sequence, 1);
        assert_eq!(first.state.counter, 3);
        assert_eq!(first.state.message, "It is currently t=0.0s.");

        // Not due yet: same snapshot
        assert_eq!(logic.update(0.5), first);

        let second = logic.update(1.0);
        assert_eq!(second.sequence, 2);
        assert_eq!(second.state.counter, 6);
    }

    /// Check that listeners receive one change per field, which convert to
    /// their typed form
    #[test]
    fn change_records() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let c_received = received.clone();
        let mut logic = Logic::new(LogicConfig::for_testing())
            .with_listener(move |change| c_received.lock().unwrap().push(change));

        logic.update(0.0);
        logic.update(0.2);
        logic.update(2.0);

        let typed: Vec<LogicChange> = received.lock().unwrap()
                                              .iter()
                                              .map(|c| LogicChange::from_untyped(c).unwrap())
                                              .collect();
        assert_eq!(typed, vec![
            LogicChange::Counter { old: Some(0), new: 3 },
            LogicChange::Message { old: Some("State not yet updated.".into()),
                                   new: "It is currently t=0.0s.".into() },
            LogicChange::Counter { old: Some(3), new: 6 },
            LogicChange::Message { old: Some("It is currently t=0.0s.".into()),
                                   new: "It is currently t=2.0s.".into() },
        ]);
    }

    /// Check that unknown change targets are rejected
    #[test]
    fn unknown_target() {
        let change = UntypedStateChange::new("Colour", None, "blue");
        assert_eq!(LogicChange::from_untyped(&change),
                   Err(ChangeError::UnknownTarget("Colour".into())));
    }

    /// Check the one-off operation
    #[test]
    fn foobar_result() {
        assert_eq!(foobar(5, Duration::ZERO),
                   FoobarResult { foo: 1342, bar: "I like 5!".into() });
    }
}
