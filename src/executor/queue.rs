//! Queueing executor, for deliveries to a host loop
//!
//! Hosts which are driven by a periodic loop (frames, ticks...) usually want
//! results of background work to be acted upon from that loop, not from
//! whichever worker thread produced them. A `QueueExecutor` can be handed to
//! the workers, and the host drains the matching `JobQueue` once per loop
//! iteration.

use crate::executor::{Executor, Job};
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::warn;


/// Executor which defers jobs to the owner of a `JobQueue`
#[derive(Clone)]
pub struct QueueExecutor {
    sender: Sender<Job>,
}
//
impl QueueExecutor {
    /// Create a queueing executor along with the queue it feeds
    pub fn new() -> (QueueExecutor, JobQueue) {
        let (sender, receiver) = mpsc::channel();
        (QueueExecutor { sender }, JobQueue { receiver })
    }
}
//
impl Executor for QueueExecutor {
    fn execute(&self, job: Job) {
        if self.sender.send(job).is_err() {
            warn!("Job queue is gone, job dropped");
        }
    }
}


/// Queue of jobs awaiting execution on the host thread
pub struct JobQueue {
    receiver: Receiver<Job>,
}
//
impl JobQueue {
    /// Run every job which is queued right now, and tell how many ran
    pub fn run_pending(&self) -> usize {
        let mut count = 0;
        while let Ok(job) = self.receiver.try_recv() {
            job();
            count += 1;
        }
        count
    }
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;

    /// Check that jobs only run when the queue is drained, on the draining
    /// thread
    #[test]
    fn deferred_until_drained() {
        let (executor, queue) = QueueExecutor::new();
        let ran_on = Arc::new(Mutex::new(Vec::new()));

        // Submit jobs from another thread
        let worker_ran_on = ran_on.clone();
        thread::spawn(move || {
            for _ in 0..3 {
                let ran_on = worker_ran_on.clone();
                executor.execute(Box::new(move || {
                    ran_on.lock().unwrap().push(thread::current().id());
                }));
            }
        }).join().unwrap();
        assert!(ran_on.lock().unwrap().is_empty());

        // Drain them from this one
        assert_eq!(queue.run_pending(), 3);
        assert_eq!(queue.run_pending(), 0);
        let ran_on = ran_on.lock().unwrap();
        assert_eq!(ran_on.len(), 3);
        assert!(ran_on.iter().all(|id| *id == thread::current().id()));
    }

    /// Check that submitting to a dropped queue is harmless
    #[test]
    fn queue_dropped() {
        let (executor, queue) = QueueExecutor::new();
        drop(queue);
        let called = Arc::new(AtomicBool::new(false));
        let c_called = called.clone();
        executor.execute(Box::new(move || c_called.store(true, Ordering::Relaxed)));
        assert!(!called.load(Ordering::Relaxed));
    }
}
