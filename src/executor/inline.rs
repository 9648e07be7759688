//! Inline executor, implementing synchronous job execution
//!
//! This executor follows the traditional pattern of directly running jobs on
//! the thread which submits them. It makes a poor choice for expensive work,
//! since the submitter is blocked until the job is done, but it is handy in
//! tests and for short deliveries which are already on the right thread.

use crate::executor::{Executor, Job};


/// Executor which runs jobs on the calling thread
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineExecutor;
//
impl InlineExecutor {
    /// Create a new inline executor
    pub fn new() -> Self {
        InlineExecutor
    }
}
//
impl Executor for InlineExecutor {
    fn execute(&self, job: Job) {
        job();
    }
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Make sure that jobs are run before execute() returns
    #[test]
    fn runs_immediately() {
        // This job will increment a counter if called
        let counter = Arc::new(AtomicUsize::new(0));
        let c_counter = counter.clone();

        // Check that it is called exactly once, synchronously
        let executor = InlineExecutor::new();
        executor.execute(Box::new(move || {
            c_counter.fetch_add(1, Ordering::Relaxed);
        }));
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }
}
