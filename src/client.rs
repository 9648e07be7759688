//! Caller-side interface of correlated requests
//!
//! Launching a request yields a `PendingResponse`, which eventually resolves
//! into the request's final `Response`. How the caller synchronizes with it is
//! up to the caller:
//!
//! - Async code can simply `.await` it.
//! - Threads which have nothing better to do can block on it with `wait()`.
//! - Periodic loops, like a frame or tick driver, can check on it with
//!   `try_take()` without ever blocking.

use crate::response::{RequestId, Response};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot::{self, error::TryRecvError};


/// Handle to the future response of a correlated request
#[must_use = "a request's response is lost if its handle is dropped"]
pub struct PendingResponse<T, E> {
    /// ID which the boundary assigned to the request
    id: RequestId,

    /// Single-assignment slot which the registry will fill
    receiver: oneshot::Receiver<Response<T, E>>,
}
//
impl<T, E> PendingResponse<T, E> {
    /// Wrap the receiving end of a completion slot
    pub(crate) fn new(id: RequestId,
                      receiver: oneshot::Receiver<Response<T, E>>) -> Self {
        PendingResponse { id, receiver }
    }

    /// ID which the boundary assigned to the request
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Block the current thread until the response is available
    ///
    /// This must not be called from within an async execution context, use
    /// `.await` there instead.
    ///
    pub fn wait(self) -> Response<T, E> {
        self.receiver.blocking_recv().unwrap_or(Response::Abandoned)
    }

    /// Check whether the response is available, without blocking
    ///
    /// A response can only be taken once: after this returned `Some`, the
    /// handle has served its purpose and should be dropped.
    ///
    pub fn try_take(&mut self) -> Option<Response<T, E>> {
        match self.receiver.try_recv() {
            Ok(response) => Some(response),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Response::Abandoned),
        }
    }
}
//
impl<T, E> Future for PendingResponse<T, E> {
    type Output = Response<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Response::Abandoned))
    }
}
