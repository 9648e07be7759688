//! Registry of pending correlated requests
//!
//! The registry maps the ID of every in-flight request to the completion slot
//! of its caller. It is shared between the caller side, which registers
//! requests as they are launched, and the boundary side, whose callbacks may
//! fire from any thread. Every registry operation is a single critical
//! section, so whichever callback removes a request first is the only one
//! which gets to resolve it.
//!
//! There is one subtlety which a single-threaded boundary does not have. When
//! the boundary runs on another thread, it may answer a request before the
//! launcher which issued it has even returned its ID to us. Such early answers
//! are parked while launches are in flight, and claimed by the launch which
//! registers their ID. A launch may only claim answers which arrived after it
//! started, so a late duplicate answer to a finished request can never resolve
//! a new request which reuses its ID. Parked answers which no open launch can
//! claim anymore are reported as unknown and discarded.

use crate::decode::Decoder;
use crate::response::{RequestId, Response};
use crate::server::CallbackOutcome;
use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, error, warn};


/// Maximal number of early answers which can be parked at once
pub const MAX_PARKED_ANSWERS: usize = 1024;

/// Shared registry of pending requests
///
/// Cloning a registry yields another handle to the same set of pending
/// requests. Brokers which share a registry can all be answered through the
/// same boundary callbacks.
///
pub struct RequestRegistry<T, E> {
    shared: Arc<Mutex<RegistryState<T, E>>>,
}
//
impl<T, E> RequestRegistry<T, E> {
    /// Create an empty registry
    pub fn new() -> Self {
        RequestRegistry {
            shared: Arc::new(Mutex::new(RegistryState {
                pending: HashMap::new(),
                parked: HashMap::new(),
                open_windows: BTreeSet::new(),
                clock: 0,
            })),
        }
    }

    /// Number of requests awaiting an answer
    pub fn len(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// Truth that no request is awaiting an answer
    pub fn is_empty(&self) -> bool {
        self.shared.lock().pending.is_empty()
    }

    /// Truth that a request with this ID is awaiting an answer
    pub fn contains(&self, id: RequestId) -> bool {
        self.shared.lock().pending.contains_key(&id)
    }

    /// Signal that a launcher is about to run
    ///
    /// Callbacks for unknown IDs are parked until the returned window is
    /// closed, either by admitting the launched request or by being dropped.
    ///
    pub(crate) fn open_launch(&self) -> LaunchWindow<'_, T, E> {
        let mut state = self.shared.lock();
        let ticket = state.tick();
        state.open_windows.insert(ticket);
        LaunchWindow { registry: self, ticket, open: true }
    }

    /// Resolve the request with this ID, if it is still pending
    pub(crate) fn complete(&self, id: RequestId, outcome: CallbackOutcome) {
        // Atomically look up and remove the request...
        let request = {
            let mut state = self.shared.lock();
            match state.pending.remove(&id) {
                Some(request) => request,
                None if !state.open_windows.is_empty() => {
                    // ...which may not have been registered yet
                    let arrival = state.tick();
                    let parked_count = state.parked.len();
                    match state.parked.entry(id) {
                        Entry::Vacant(_) if parked_count >= MAX_PARKED_ANSWERS => {
                            warn!(request_id = id, outcome = outcome.kind(),
                                  "Too many parked answers, answer discarded");
                        }
                        Entry::Vacant(slot) => {
                            debug!(request_id = id, outcome = outcome.kind(),
                                   "Parking answer to a request being launched");
                            slot.insert(ParkedAnswer { arrival, outcome });
                        }
                        Entry::Occupied(_) => {
                            warn!(request_id = id, outcome = outcome.kind(),
                                  "Duplicate answer to a parked request");
                        }
                    }
                    return;
                }
                None => {
                    warn!(request_id = id, outcome = outcome.kind(),
                          "Unknown request id");
                    return;
                }
            }
        };

        // ...then decode and deliver the answer outside of the lock
        request.resolve(id, outcome);
    }
}
//
impl<T, E> Clone for RequestRegistry<T, E> {
    fn clone(&self) -> Self {
        RequestRegistry { shared: self.shared.clone() }
    }
}
//
impl<T, E> Default for RequestRegistry<T, E> {
    fn default() -> Self {
        Self::new()
    }
}


/// Mutex-protected registry contents
struct RegistryState<T, E> {
    /// Requests awaiting an answer, by ID
    pending: HashMap<RequestId, PendingRequest<T, E>>,

    /// Answers which arrived before their request was registered
    parked: HashMap<RequestId, ParkedAnswer>,

    /// Tickets of the launches whose launcher has not returned yet
    open_windows: BTreeSet<u64>,

    /// Logical clock ordering launch openings and answer arrivals
    clock: u64,
}
//
impl<T, E> RegistryState<T, E> {
    /// Advance the logical clock
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Account for a finished launch, and drop the parked answers which no
    /// open launch can claim anymore
    fn close_launch(&mut self, ticket: u64) -> Vec<RequestId> {
        self.open_windows.remove(&ticket);
        let oldest_open = self.open_windows.iter().next().copied();
        let mut stray = Vec::new();
        self.parked.retain(|&id, parked| {
            let claimable = oldest_open.map_or(false, |oldest| parked.arrival > oldest);
            if !claimable {
                stray.push(id);
            }
            claimable
        });
        stray
    }
}


/// Answer waiting for its request to be registered
struct ParkedAnswer {
    /// Logical time at which the answer arrived
    arrival: u64,

    /// The answer itself
    outcome: CallbackOutcome,
}


/// Launch in progress, see `RequestRegistry::open_launch`
pub(crate) struct LaunchWindow<'a, T, E> {
    registry: &'a RequestRegistry<T, E>,
    ticket: u64,
    open: bool,
}
//
impl<'a, T, E> LaunchWindow<'a, T, E> {
    /// Register the request which the launcher has issued under this ID
    pub fn admit(mut self, id: RequestId, request: PendingRequest<T, E>) {
        let (admission, stray) = {
            let mut state = self.registry.shared.lock();
            let admission = if state.pending.contains_key(&id) {
                Admission::Duplicate(request)
            } else {
                // Only answers which arrived during this launch can be for it
                match state.parked.remove(&id) {
                    Some(parked) if parked.arrival > self.ticket => {
                        Admission::AlreadyAnswered(request, parked.outcome)
                    }
                    stale => {
                        state.pending.insert(id, request);
                        Admission::Registered(stale.map(|parked| parked.outcome))
                    }
                }
            };
            self.open = false;
            (admission, state.close_launch(self.ticket))
        };

        match admission {
            Admission::Registered(stale) => {
                if let Some(outcome) = stale {
                    warn!(request_id = id, outcome = outcome.kind(),
                          "Answer predates its request, discarded");
                }
                debug!(request_id = id, "Request registered");
            }
            Admission::Duplicate(request) => {
                error!(request_id = id, "Duplicate request id");
                request.settle(id, Response::DuplicateRequest(id));
            }
            Admission::AlreadyAnswered(request, outcome) => {
                request.resolve(id, outcome);
            }
        }
        report_stray(stray);
    }
}
//
impl<'a, T, E> Drop for LaunchWindow<'a, T, E> {
    /// If the launcher panicked, the launch must still be accounted for
    fn drop(&mut self) {
        if self.open {
            let stray = self.registry.shared.lock().close_launch(self.ticket);
            report_stray(stray);
        }
    }
}

/// Possible fates of a launched request
enum Admission<T, E> {
    Registered(Option<CallbackOutcome>),
    Duplicate(PendingRequest<T, E>),
    AlreadyAnswered(PendingRequest<T, E>, CallbackOutcome),
}

/// Log the parked answers which no launch has claimed
fn report_stray(stray: Vec<RequestId>) {
    for id in stray {
        warn!(request_id = id, "Unknown request id");
    }
}


/// Decoders of the broker which launched a request
pub(crate) struct Decoders<T, E> {
    pub success: Decoder<T>,
    pub failure: Decoder<E>,
}
//
impl<T, E> Decoders<T, E> {
    /// Turn a boundary answer into a response
    fn respond(&self, id: RequestId, outcome: CallbackOutcome) -> Response<T, E> {
        let decoded = match outcome {
            CallbackOutcome::Success(payload) =>
                (self.success)(payload.as_str()).map(Response::Success),
            CallbackOutcome::Failure(payload) =>
                (self.failure)(payload.as_str()).map(Response::Failure),
            CallbackOutcome::Initializing => Ok(Response::Initializing),
        };
        decoded.unwrap_or_else(|e| {
            warn!(request_id = id, error = %e, "Undecodable answer");
            Response::Undecodable(e)
        })
    }
}


/// In-flight request, as stored in the registry
pub(crate) struct PendingRequest<T, E> {
    /// Single-assignment slot which the caller is waiting on
    completion: oneshot::Sender<Response<T, E>>,

    /// Decoders of the broker which launched the request
    decoders: Arc<Decoders<T, E>>,
}
//
impl<T, E> PendingRequest<T, E> {
    /// Set up a new pending request
    pub fn new(completion: oneshot::Sender<Response<T, E>>,
               decoders: Arc<Decoders<T, E>>) -> Self {
        PendingRequest { completion, decoders }
    }

    /// Decode a boundary answer and hand it over to the caller
    fn resolve(self, id: RequestId, outcome: CallbackOutcome) {
        let response = self.decoders.respond(id, outcome);
        self.settle(id, response);
    }

    /// Hand a response over to the caller
    fn settle(self, id: RequestId, response: Response<T, E>) {
        if self.completion.send(response).is_err() {
            debug!(request_id = id, "Caller stopped waiting, answer discarded");
        }
    }
}
