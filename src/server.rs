//! Boundary-side interface of correlated requests
//!
//! Whatever sits on the other side of the boundary (a worker thread, a foreign
//! runtime...) reports the fate of a request by invoking one of three
//! callbacks with the request's ID: success, failure, or "not initialized
//! yet". This module provides those callbacks.
//!
//! The boundary is expected to invoke exactly one of them exactly once per
//! request, but nothing bad happens if it does not: answers for unknown or
//! already answered IDs are logged and discarded.

use crate::registry::RequestRegistry;
use crate::response::RequestId;


/// Answer of the boundary to a request, before decoding
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Request processed, with an encoded result
    Success(String),

    /// Request failed, with an encoded error
    Failure(String),

    /// Boundary not ready, request dropped
    Initializing,
}
//
impl CallbackOutcome {
    /// Short name of the outcome, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            CallbackOutcome::Success(_) => "success",
            CallbackOutcome::Failure(_) => "failure",
            CallbackOutcome::Initializing => "initializing",
        }
    }
}


/// Callback handles which a launcher hands over to the boundary
///
/// These handles can be cloned and sent to any thread.
///
pub struct RequestCallbacks<T, E> {
    registry: RequestRegistry<T, E>,
}
//
impl<T, E> RequestCallbacks<T, E> {
    /// Build callbacks which answer requests from a certain registry
    pub(crate) fn new(registry: RequestRegistry<T, E>) -> Self {
        RequestCallbacks { registry }
    }

    /// Report that a request was successfully processed
    pub fn success(&self, id: RequestId, payload: impl Into<String>) {
        self.deliver(id, CallbackOutcome::Success(payload.into()));
    }

    /// Report that a request could not be processed
    pub fn failure(&self, id: RequestId, payload: impl Into<String>) {
        self.deliver(id, CallbackOutcome::Failure(payload.into()));
    }

    /// Report that the boundary dropped a request because it was not ready
    pub fn initializing(&self, id: RequestId) {
        self.deliver(id, CallbackOutcome::Initializing);
    }

    /// Report any outcome, e.g. one received through a message channel
    pub fn deliver(&self, id: RequestId, outcome: CallbackOutcome) {
        self.registry.complete(id, outcome);
    }
}
//
impl<T, E> Clone for RequestCallbacks<T, E> {
    fn clone(&self) -> Self {
        RequestCallbacks { registry: self.registry.clone() }
    }
}
