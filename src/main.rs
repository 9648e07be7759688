//! Demo host loop
//!
//! This binary plays the part of a host application with a periodic loop,
//! which keeps an expensive, stateful computation off its own thread in the
//! three ways supported by the library:
//!
//! - Push events: a single-flight scheduler runs updates on worker threads,
//!   and the resulting change records are posted back to the host loop.
//!   The same updates also return versioned snapshots, which the host polls.
//! - Correlated calls: the host asks a simulated boundary worker for the
//!   latest state through request-ID-keyed callbacks, and only acts upon
//!   responses whose sequence number is new.
//! - A one-off awaited request, answered by the same boundary worker.
//!
//! Set `RUST_LOG=debug` to see the plumbing at work.

use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use threaded_async_bridge::config::LogicConfig;
use threaded_async_bridge::decode;
use threaded_async_bridge::executor::{QueueExecutor, ThreadExecutor};
use threaded_async_bridge::logic::{self, FoobarResult, Logic, LogicChange, LogicState};
use threaded_async_bridge::multithread::callback::ChangeNotifier;
use threaded_async_bridge::multithread::polling;
use threaded_async_bridge::{PendingResponse, RequestBroker, RequestCallbacks, RequestError,
                            RequestId, SequenceTracker, SingleFlightScheduler, VersionedState};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;


/// Period of the host loop
const TICK: Duration = Duration::from_millis(100);

/// Number of host loop iterations
const TICKS: usize = 40;

/// Time during which the boundary worker rejects requests as "initializing"
const WARMUP: Duration = Duration::from_millis(300);


type Snapshot = VersionedState<LogicState>;


/// Requests understood by the boundary worker
enum Command {
    Update {
        id: RequestId,
        time: f64,
        callbacks: RequestCallbacks<Snapshot, String>,
    },
    Foobar {
        id: RequestId,
        num: i64,
        callbacks: RequestCallbacks<FoobarResult, String>,
    },
}


/// Simulated boundary: a worker thread which can only be reached by messages,
/// and which answers through request callbacks with JSON payloads
struct Boundary {
    commands: Sender<Command>,
    next_id: AtomicI32,
    worker: JoinHandle<()>,
}
//
impl Boundary {
    /// Start the boundary worker
    fn spawn(config: LogicConfig) -> io::Result<Self> {
        let (commands, inbox) = mpsc::channel::<Command>();
        let worker = thread::Builder::new()
            .name("boundary".to_owned())
            .spawn(move || {
                let started = Instant::now();
                let mut logic = Logic::new(config.clone());
                for command in inbox {
                    let ready = started.elapsed() >= WARMUP;
                    match command {
                        Command::Update { id, callbacks, .. } if !ready => {
                            callbacks.initializing(id)
                        }
                        Command::Update { id, time, callbacks } => {
                            match serde_json::to_string(&logic.update(time)) {
                                Ok(json) => callbacks.success(id, json),
                                Err(e) => callbacks.failure(id, e.to_string()),
                            }
                        }
                        Command::Foobar { id, num, callbacks } => {
                            let result = logic::foobar(num, config.work_duration());
                            match serde_json::to_string(&result) {
                                Ok(json) => callbacks.success(id, json),
                                Err(e) => callbacks.failure(id, e.to_string()),
                            }
                        }
                    }
                }
            })?;
        Ok(Boundary { commands, next_id: AtomicI32::new(1), worker })
    }

    /// Ask for the latest state, updating it if due
    fn update(&self, time: f64, callbacks: RequestCallbacks<Snapshot, String>) -> RequestId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Err(mpsc::SendError(command)) =
            self.commands.send(Command::Update { id, time, callbacks })
        {
            if let Command::Update { callbacks, .. } = command {
                callbacks.failure(id, "boundary worker is gone");
            }
        }
        id
    }

    /// Run the one-off operation
    fn foobar(&self, num: i64, callbacks: RequestCallbacks<FoobarResult, String>) -> RequestId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Err(mpsc::SendError(command)) =
            self.commands.send(Command::Foobar { id, num, callbacks })
        {
            if let Command::Foobar { callbacks, .. } = command {
                callbacks.failure(id, "boundary worker is gone");
            }
        }
        id
    }

    /// Stop the boundary worker once it is done with its inbox
    fn shutdown(self) {
        drop(self.commands);
        if self.worker.join().is_err() {
            error!("Boundary worker panicked");
        }
    }
}


/// Act upon a pushed state change
fn display_change(change: LogicChange) {
    match change {
        LogicChange::Counter { new, .. } => info!(counter = new, "Event: counter changed"),
        LogicChange::Message { new, .. } => info!(message = %new, "Event: message changed"),
    }
}


fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env()
                             .unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let config = LogicConfig::from_env();
    info!(?config, "Starting demo host loop");

    // Push events: changes are posted back to the host loop, and snapshots
    // returned by the updates are published for the host loop to poll
    let (host_executor, host_queue) = QueueExecutor::new();
    let notifier = ChangeNotifier::<LogicChange, _>::new(display_change, host_executor);
    let event_logic = Mutex::new(
        Logic::new(config.clone()).with_listener(move |change| notifier.notify(change))
    );
    let (publisher, mut reader) = polling::snapshot_channel(&event_logic.lock().snapshot());
    let publisher = Arc::new(Mutex::new(publisher));
    let scheduler = SingleFlightScheduler::new(
        move |time: f64| event_logic.lock().update(time),
        ThreadExecutor::new("logic-update"),
    );

    // Correlated calls: the boundary answers through the brokers' callbacks
    let boundary = Boundary::spawn(config)?;
    let updates = RequestBroker::new(decode::json::<Snapshot>(), decode::verbatim());
    let foobars = RequestBroker::new(decode::json::<FoobarResult>(), decode::verbatim());
    let mut tracker = SequenceTracker::new();
    let mut in_flight: Option<PendingResponse<Snapshot, String>> = None;

    let started = Instant::now();
    for _ in 0..TICKS {
        let time = started.elapsed().as_secs_f64();

        let publisher = publisher.clone();
        scheduler.trigger_with(time, move |snapshot| publisher.lock().publish(snapshot));
        host_queue.run_pending();
        if let Some(snapshot) = reader.poll_new() {
            info!(sequence = snapshot.sequence, counter = snapshot.state.counter,
                  "Poll: new snapshot");
        }

        if in_flight.is_none() {
            in_flight = Some(updates.launch(|callbacks| boundary.update(time, callbacks)));
        }
        if let Some(response) = in_flight.as_mut().and_then(|pending| pending.try_take()) {
            in_flight = None;
            match response.into_result() {
                Ok(snapshot) if tracker.observe(snapshot.sequence) => {
                    info!(sequence = snapshot.sequence,
                          counter = snapshot.state.counter,
                          message = %snapshot.state.message,
                          "Call: new state");
                }
                Ok(snapshot) => {
                    debug!(sequence = snapshot.sequence, "Call: nothing new");
                }
                Err(RequestError::NotReady) => {
                    debug!("Call: boundary still initializing");
                }
                Err(e) => warn!(error = %e, "Failed to run operation"),
            }
        }

        thread::sleep(TICK);
    }

    // One-off request, which the host is willing to wait for
    let response = foobars.launch(|callbacks| boundary.foobar(42, callbacks)).wait();
    match response.into_result() {
        Ok(result) => info!(foo = result.foo, bar = %result.bar, "Foobar done"),
        Err(e) => error!(error = %e, "Failed to run operation"),
    }

    if let Some(pending) = in_flight {
        debug!(request_id = pending.id(), "Leaving a request unanswered");
    }
    boundary.shutdown();
    Ok(())
}
