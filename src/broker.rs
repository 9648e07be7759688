//! Request correlation broker
//!
//! Many boundaries cannot return a result directly. Instead, a call is
//! launched with a set of callbacks, immediately returns an integer request
//! ID, and later reports its outcome by invoking one of the callbacks with
//! that same ID. The broker turns this convention into a single awaitable
//! response per request:
//!
//! ```text
//! caller ── launch(launcher) ──> launcher(callbacks) ──> boundary
//!   │                                  │ returns ID            │
//!   │<── PendingResponse ──────────────┘                       │
//!   │                                                          │
//!   │<── Response ── registry ── success/failure/initializing ─┘
//! ```
//!
//! Each broker holds the decoders which turn the boundary's string payloads
//! into its result and error types. Brokers of the same result and error types
//! may share a registry, in which case the boundary can answer all of them
//! through the same callbacks.

use crate::client::PendingResponse;
use crate::decode::Decoder;
use crate::registry::{Decoders, PendingRequest, RequestRegistry};
use crate::response::RequestId;
use crate::server::{CallbackOutcome, RequestCallbacks};
use std::sync::Arc;
use tokio::sync::oneshot;


/// Bridge from callback-based boundary calls to awaitable responses
pub struct RequestBroker<T, E> {
    /// Requests which are awaiting an answer
    registry: RequestRegistry<T, E>,

    /// Decoders for the answers to this broker's requests
    decoders: Arc<Decoders<T, E>>,
}
//
impl<T, E> RequestBroker<T, E> {
    /// Create a broker with a registry of its own
    pub fn new(success: Decoder<T>, failure: Decoder<E>) -> Self {
        Self::with_registry(RequestRegistry::new(), success, failure)
    }

    /// Create a broker which shares an existing registry
    pub fn with_registry(registry: RequestRegistry<T, E>,
                         success: Decoder<T>,
                         failure: Decoder<E>) -> Self {
        RequestBroker {
            registry,
            decoders: Arc::new(Decoders { success, failure }),
        }
    }

    /// Registry where this broker's requests are tracked
    pub fn registry(&self) -> &RequestRegistry<T, E> {
        &self.registry
    }

    /// Callbacks through which the boundary answers this broker's requests
    pub fn callbacks(&self) -> RequestCallbacks<T, E> {
        RequestCallbacks::new(self.registry.clone())
    }

    /// Launch a request
    ///
    /// The launcher receives the boundary callbacks, starts the boundary call
    /// and returns the ID which the boundary assigned to it. If that ID is
    /// already pending, the returned handle resolves immediately with a
    /// `DuplicateRequest` response.
    ///
    pub fn launch<L>(&self, launcher: L) -> PendingResponse<T, E>
        where L: FnOnce(RequestCallbacks<T, E>) -> RequestId
    {
        // Prepare the completion slot...
        let (completion, receiver) = oneshot::channel();

        // ...start the boundary call...
        let window = self.registry.open_launch();
        let id = launcher(self.callbacks());

        // ...and register it under the ID which the boundary picked
        window.admit(id, PendingRequest::new(completion, self.decoders.clone()));
        PendingResponse::new(id, receiver)
    }

    /// Answer a request successfully, with an encoded result
    pub fn success(&self, id: RequestId, payload: &str) {
        self.registry.complete(id, CallbackOutcome::Success(payload.to_owned()));
    }

    /// Answer a request with an encoded error
    pub fn failure(&self, id: RequestId, payload: &str) {
        self.registry.complete(id, CallbackOutcome::Failure(payload.to_owned()));
    }

    /// Answer a request with "the boundary was not ready yet"
    pub fn initializing(&self, id: RequestId) {
        self.registry.complete(id, CallbackOutcome::Initializing);
    }
}
