//! Callback-based change delivery
//!
//! This module provides a way for a producer to push its state changes to a
//! listener. It is more flexible than polling, since no change is ever
//! missed, but the listener must be ready to be called at any time. To keep
//! that manageable, listeners are never called from the producer's thread
//! directly: every notification is posted to an executor of the consumer's
//! choosing, typically a `QueueExecutor` drained by the host loop.
//!
//! Changes cross the notifier in their untyped form, like they would cross a
//! foreign boundary, and are converted to their typed form on delivery. Change
//! records which the listener's type does not understand are logged and
//! dropped.

use crate::change::{StateChange, UntypedStateChange};
use crate::executor::Executor;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::error;


/// Producer interface, used to push state changes to a listener
pub struct ChangeNotifier<C, X: Executor> {
    /// Listener, which receives typed changes
    listener: Arc<dyn Fn(C) + Send + Sync>,

    /// Execution context of the listener
    executor: X,

    /// Change type, which is only built on the listener side
    change: PhantomData<fn() -> C>,
}
//
impl<C, X> ChangeNotifier<C, X>
    where C: StateChange + 'static,
          X: Executor
{
    /// Set up a notifier which runs a listener on some executor
    pub fn new<F>(listener: F, executor: X) -> Self
        where F: Fn(C) + Send + Sync + 'static
    {
        ChangeNotifier {
            listener: Arc::new(listener),
            executor,
            change: PhantomData,
        }
    }

    /// Post a change to the listener
    pub fn notify(&self, change: UntypedStateChange) {
        let listener = self.listener.clone();
        self.executor.execute(Box::new(move || {
            match C::from_untyped(&change) {
                Ok(typed) => listener(typed),
                Err(e) => error!(target_field = %change.target, error = %e,
                                 "Unknown state change"),
            }
        }));
    }

    /// Post a JSON-encoded change to the listener
    pub fn notify_json(&self, payload: &str) {
        match UntypedStateChange::from_json(payload) {
            Ok(change) => self.notify(change),
            Err(e) => error!(error = %e, "Undecodable state change"),
        }
    }
}
