//! Single-flight update scheduling
//!
//! A host driver typically wants to kick off some expensive update on every
//! tick, without ever waiting for it, and without ever running two of them at
//! once. The scheduler guarantees exactly that: at most one run of the update
//! operation is in flight at any time, and triggers which arrive while a run
//! is in flight are dropped rather than queued.
//!
//! ```text
//!            trigger() wins the CAS
//!   Idle ──────────────────────────> Running
//!    ^                                  │ trigger() -> Dropped
//!    └──────────────────────────────────┘
//!       operation returned or panicked
//! ```
//!
//! The operation is free to apply its own rate limiting on top of this, e.g.
//! to do nothing when called before its next tick is due. The scheduler only
//! decides whether it is safe to start a run, not whether a run is needed.

use crate::executor::Executor;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, trace};


/// Expensive update operation, parametrized by the driver's current time
///
/// Operations can either push their results to some consumer by themselves,
/// or return them to be handed over to a completion callback.
///
pub trait UpdateOperation: Send + Sync + 'static {
    /// Result of one run of the operation
    type Output: Send + 'static;

    /// Run the operation once
    fn run(&self, time: f64) -> Self::Output;
}
//
impl<F, R> UpdateOperation for F
    where F: Fn(f64) -> R + Send + Sync + 'static,
          R: Send + 'static
{
    type Output = R;

    fn run(&self, time: f64) -> R {
        self(time)
    }
}


/// Result of a trigger attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// A new run of the operation was started
    Started,

    /// A run was already in flight, so this trigger was ignored
    Dropped,
}


/// Scheduler which never runs its operation concurrently with itself
pub struct SingleFlightScheduler<Op: UpdateOperation, X: Executor> {
    /// Operation to be run
    operation: Arc<Op>,

    /// Execution context of the runs
    executor: X,

    /// Truth that a run is in flight
    in_progress: Arc<AtomicBool>,
}
//
impl<Op: UpdateOperation, X: Executor> SingleFlightScheduler<Op, X> {
    /// Set up a scheduler for some operation and executor
    pub fn new(operation: Op, executor: X) -> Self {
        SingleFlightScheduler {
            operation: Arc::new(operation),
            executor,
            in_progress: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Truth that a run of the operation is in flight
    pub fn is_running(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Start a run of the operation, unless one is already in flight
    ///
    /// The operation's output, if any, is discarded. Use this for operations
    /// which push their results to consumers by themselves.
    ///
    pub fn trigger(&self, time: f64) -> Trigger {
        self.trigger_with(time, |_| {})
    }

    /// Start a run of the operation, unless one is already in flight, and
    /// hand its output over to a completion callback
    ///
    /// The in-flight flag is cleared before the callback is invoked, so the
    /// callback may readily trigger the next run. If the operation panics,
    /// the panic is logged and the callback is not invoked.
    ///
    pub fn trigger_with<F>(&self, time: f64, on_complete: F) -> Trigger
        where F: FnOnce(Op::Output) + Send + 'static
    {
        // Try to become the one run in flight. The relaxed pre-check avoids
        // contending on the flag's cache line from a busy driver loop.
        if self.in_progress.load(Ordering::Relaxed)
           || self.in_progress
                  .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                  .is_err()
        {
            trace!(time, "Update already in flight, trigger dropped");
            return Trigger::Dropped;
        }

        // From now on, the flag is released whenever this guard is dropped,
        // whether the job runs to completion, panics, or never runs at all
        let guard = FlightGuard { flag: self.in_progress.clone() };
        let operation = self.operation.clone();
        self.executor.execute(Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| operation.run(time)));
            drop(guard);
            match outcome {
                Ok(output) => on_complete(output),
                Err(payload) => {
                    error!(time, panic = panic_message(&*payload), "Update operation panicked");
                }
            }
        }));
        Trigger::Started
    }
}


/// Scoped release of the in-flight flag
struct FlightGuard {
    flag: Arc<AtomicBool>,
}
//
impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}


/// Extract a printable message from a panic payload
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic payload>"
    }
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{InlineExecutor, ThreadExecutor};
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::sync::Mutex;
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(5);

    /// Check that an idle scheduler starts runs, and reports being idle
    /// again afterwards
    #[test]
    fn inline_runs() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c_counter = counter.clone();
        let scheduler = SingleFlightScheduler::new(
            move |_time: f64| { c_counter.fetch_add(1, Ordering::Relaxed); },
            InlineExecutor::new(),
        );
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.trigger(0.0), Trigger::Started);
        assert_eq!(scheduler.trigger(1.0), Trigger::Started);
        assert_eq!(counter.load(Ordering::Relaxed), 2);
        assert!(!scheduler.is_running());
    }

    /// Check that outputs are handed over to the completion callback
    #[test]
    fn output_delivery() {
        let scheduler = SingleFlightScheduler::new(|time: f64| time * 2.0,
                                                   InlineExecutor::new());
        let (tx, rx) = mpsc::channel();
        scheduler.trigger_with(1.5, move |output| tx.send(output).unwrap());
        assert_eq!(rx.try_recv(), Ok(3.0));
    }

    /// Check that triggers are dropped while a run is in flight, and that a
    /// new run can start once the previous one is done
    #[test]
    fn single_flight() {
        // The operation counts its runs, and blocks until released
        let runs = Arc::new(AtomicUsize::new(0));
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let c_runs = runs.clone();
        let scheduler = SingleFlightScheduler::new(
            move |_time: f64| {
                c_runs.fetch_add(1, Ordering::SeqCst);
                release_rx.lock().unwrap().recv_timeout(TIMEOUT).unwrap();
            },
            ThreadExecutor::new("single-flight-test"),
        );

        // First run starts, overlapping triggers are dropped
        let (done_tx, done_rx) = mpsc::channel();
        let c_done_tx = done_tx.clone();
        assert_eq!(scheduler.trigger_with(0.0, move |()| c_done_tx.send(()).unwrap()),
                   Trigger::Started);
        assert!(scheduler.is_running());
        for i in 1..=10 {
            assert_eq!(scheduler.trigger(0.01 * i as f64), Trigger::Dropped);
        }

        // Once the run is done, a new one can start
        release_tx.send(()).unwrap();
        done_rx.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(scheduler.trigger_with(0.6, move |()| done_tx.send(()).unwrap()),
                   Trigger::Started);
        release_tx.send(()).unwrap();
        done_rx.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    /// Check that triggering a background run returns while the operation
    /// is still in progress
    #[test]
    fn trigger_does_not_block() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let scheduler = SingleFlightScheduler::new(
            move |_time: f64| {
                entered_tx.send(()).unwrap();
                release_rx.lock().unwrap().recv_timeout(TIMEOUT).unwrap();
            },
            ThreadExecutor::new("non-blocking-test"),
        );

        // The operation cannot finish before being released below, so
        // reaching this point means that trigger() did not wait for it
        let (done_tx, done_rx) = mpsc::channel();
        assert_eq!(scheduler.trigger_with(0.0, move |()| done_tx.send(()).unwrap()),
                   Trigger::Started);
        entered_rx.recv_timeout(TIMEOUT).unwrap();
        assert!(scheduler.is_running());
        assert_eq!(done_rx.try_recv(), Err(mpsc::TryRecvError::Empty));

        // Release the operation, and let it complete
        release_tx.send(()).unwrap();
        done_rx.recv_timeout(TIMEOUT).unwrap();
    }

    /// Check the timing scenario of a slow operation triggered at t=0 (runs),
    /// t=100ms (dropped) and t=600ms (runs again)
    #[test]
    fn timed_triggers() {
        let runs = Arc::new(AtomicUsize::new(0));
        let c_runs = runs.clone();
        let scheduler = SingleFlightScheduler::new(
            move |_time: f64| {
                c_runs.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(500));
            },
            ThreadExecutor::default(),
        );

        assert_eq!(scheduler.trigger(0.0), Trigger::Started);
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(scheduler.trigger(0.1), Trigger::Dropped);

        // Leave some slack for thread scheduling past the 500ms mark
        let deadline = std::time::Instant::now() + TIMEOUT;
        while scheduler.is_running() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        let (done_tx, done_rx) = mpsc::channel();
        assert_eq!(scheduler.trigger_with(0.6, move |()| done_tx.send(()).unwrap()),
                   Trigger::Started);
        done_rx.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    /// Check that a panicking operation neither reaches the caller nor leaves
    /// the scheduler stuck
    #[test]
    fn panic_releases_flag() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c_calls = calls.clone();
        let scheduler = SingleFlightScheduler::new(
            move |time: f64| -> f64 {
                if time < 1.0 {
                    panic!("expensive update failed");
                }
                time
            },
            InlineExecutor::new(),
        );

        let c_calls_1 = c_calls.clone();
        let started = scheduler.trigger_with(0.0, move |_| {
            c_calls_1.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(started, Trigger::Started);
        assert!(!scheduler.is_running());
        assert_eq!(calls.load(Ordering::Relaxed), 0);

        let started = scheduler.trigger_with(2.0, move |_| {
            c_calls.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(started, Trigger::Started);
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    /// Check that concurrent triggers start a single run
    #[test]
    fn concurrent_triggers() {
        const TRIGGERERS: usize = 8;
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let scheduler = Arc::new(SingleFlightScheduler::new(
            move |_time: f64| { release_rx.lock().unwrap().recv_timeout(TIMEOUT).unwrap(); },
            ThreadExecutor::default(),
        ));

        let barrier = Arc::new(std::sync::Barrier::new(TRIGGERERS));
        let triggerers: Vec<_> = (0..TRIGGERERS).map(|_| {
            let scheduler = scheduler.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                barrier.wait();
                scheduler.trigger(0.0)
            })
        }).collect();
        let started = triggerers.into_iter()
                                .map(|t| t.join().unwrap())
                                .filter(|t| *t == Trigger::Started)
                                .count();
        assert_eq!(started, 1);
        release_tx.send(()).unwrap();
    }

    /// Check that the flag is released if the executor drops the job
    #[test]
    fn dropped_job_releases_flag() {
        struct Blackhole;
        impl Executor for Blackhole {
            fn execute(&self, _job: crate::executor::Job) {}
        }

        let scheduler = SingleFlightScheduler::new(|_time: f64| {}, Blackhole);
        assert_eq!(scheduler.trigger(0.0), Trigger::Started);
        assert!(!scheduler.is_running());
    }
}
