//! Facilities to represent the outcome of correlated requests
//!
//! A request sent across the boundary ends up in exactly one of a handful of
//! final states. The boundary may answer with a success or failure payload, it
//! may tell us that it was not ready to take the request yet, or the request
//! may never have been registered in the first place. We also need to cover
//! the cases where the payload could not be decoded, and where nobody is left
//! to answer at all.

use crate::decode::DecodeError;
use thiserror::Error;


/// Correlation identifier, assigned by the boundary when a request is launched
pub type RequestId = i32;


/// Final outcome of a correlated request
///
/// Every variant is final: once a `Response` has been produced for a request,
/// no other response will ever be produced for it.
///
#[derive(Clone, Debug, PartialEq)]
pub enum Response<T, E> {
    /// The boundary processed the request successfully
    Success(T),

    /// The boundary reported an application-level failure
    Failure(E),

    /// The boundary was still warming up and dropped the request
    ///
    /// This is a non-error miss: the caller may simply try again later.
    ///
    Initializing,

    /// The launcher returned an ID which was already pending
    ///
    /// This is a boundary contract violation. The earlier request keeps its
    /// registration, this one is answered immediately so that its caller does
    /// not hang.
    ///
    DuplicateRequest(RequestId),

    /// The boundary answered, but its payload could not be decoded
    Undecodable(DecodeError),

    /// Every handle to the request registry was dropped before the boundary
    /// answered, so no answer can ever arrive
    Abandoned,
}
//
impl<T, E> Response<T, E> {
    /// Truth that the boundary processed the request successfully
    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }

    /// Decoded result, if any
    pub fn result(&self) -> Option<&T> {
        match self {
            Response::Success(result) => Some(result),
            _ => None,
        }
    }

    /// Decoded boundary error, if any
    ///
    /// Only `Failure` carries an error payload. The other non-success
    /// outcomes are told apart by their variant alone.
    ///
    pub fn error(&self) -> Option<&E> {
        match self {
            Response::Failure(error) => Some(error),
            _ => None,
        }
    }

    /// Convert into a `Result`, for callers that only care about success
    pub fn into_result(self) -> Result<T, RequestError<E>> {
        match self {
            Response::Success(result) => Ok(result),
            Response::Failure(error) => Err(RequestError::Failed(error)),
            Response::Initializing => Err(RequestError::NotReady),
            Response::DuplicateRequest(id) => Err(RequestError::DuplicateRequest(id)),
            Response::Undecodable(error) => Err(RequestError::Decode(error)),
            Response::Abandoned => Err(RequestError::Abandoned),
        }
    }
}


/// Error view of a non-successful response
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RequestError<E> {
    /// The boundary reported a failure
    #[error("request failed: {0}")]
    Failed(E),

    /// The boundary was not ready to process the request
    #[error("boundary not ready yet")]
    NotReady,

    /// The launcher returned an ID which was already pending
    #[error("duplicate request id: {0}")]
    DuplicateRequest(RequestId),

    /// The boundary payload could not be decoded
    #[error(transparent)]
    Decode(DecodeError),

    /// No answer can ever arrive
    #[error("request abandoned before the boundary answered")]
    Abandoned,
}
