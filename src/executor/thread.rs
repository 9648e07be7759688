//! Thread-spawning executor
//!
//! Each job gets a thread of its own. Spawning a thread is not free, but it is
//! negligible next to the kind of work which this crate moves off the host
//! thread, and it guarantees that a long job never delays another one.

use crate::executor::{Executor, Job};
use std::thread;
use tracing::error;


/// Executor which runs every job on a new thread
#[derive(Clone, Debug)]
pub struct ThreadExecutor {
    /// Name given to spawned threads
    name: String,
}
//
impl ThreadExecutor {
    /// Create an executor whose threads bear a certain name
    pub fn new(name: impl Into<String>) -> Self {
        ThreadExecutor { name: name.into() }
    }
}
//
impl Default for ThreadExecutor {
    fn default() -> Self {
        Self::new("bridge-worker")
    }
}
//
impl Executor for ThreadExecutor {
    fn execute(&self, job: Job) {
        // If spawning fails, the job is dropped without running
        let spawned = thread::Builder::new()
            .name(self.name.clone())
            .spawn(job);
        if let Err(e) = spawned {
            error!(thread = %self.name, error = %e, "Failed to spawn worker thread");
        }
    }
}
