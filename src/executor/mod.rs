//! Execution contexts for background work and deliveries
//!
//! Work which is triggered from the host thread, like an expensive state
//! update, must run somewhere else for the host to remain responsive. And
//! conversely, results which are produced on a worker often need to be brought
//! back to the host thread before they are acted upon. Both directions boil
//! down to "run this job on that execution context", which is what an
//! executor does.
//!
//! Three executors are provided:
//!
//! - `InlineExecutor` runs jobs directly on the calling thread. It defeats the
//!   purpose of background work, but makes for deterministic tests.
//! - `ThreadExecutor` runs each job on a freshly spawned thread.
//! - `QueueExecutor` queues jobs until the owner of the matching `JobQueue`
//!   runs them, which is how results are posted back to a host loop.

pub mod inline;
pub mod queue;
pub mod thread;

pub use self::inline::InlineExecutor;
pub use self::queue::{JobQueue, QueueExecutor};
pub use self::thread::ThreadExecutor;


/// Unit of work which an executor can run
pub type Job = Box<dyn FnOnce() + Send + 'static>;


/// Something which can run jobs on some execution context
///
/// An executor may fail to run a job, e.g. because no thread could be
/// spawned. In that case it must drop the job, so that any resource held by
/// the job is released, and report the problem through the log.
///
pub trait Executor: Send + Sync {
    /// Run a job, possibly later and on another thread
    fn execute(&self, job: Job);
}
//
impl<X: Executor + ?Sized> Executor for std::sync::Arc<X> {
    fn execute(&self, job: Job) {
        (**self).execute(job);
    }
}
