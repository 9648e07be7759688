//! Moving computed state across a thread or runtime boundary
//!
//! Picture yourself in a situation where: your host application runs some
//! periodic loop (a game loop, a UI event loop...), and you want to delegate
//! expensive work to another execution context, such as a background thread
//! or a sandboxed foreign runtime which can only be reached through callbacks.
//! You do not want the host loop to wait for that work, you do not want two
//! copies of it running at once, and you do not want to redo host-side work
//! when the worker has nothing new to say.
//!
//! This crate provides the plumbing for that, in three layers:
//!
//! - The request broker (`broker`) turns a boundary call which reports its
//!   outcome through request-ID-keyed callbacks into a single response which
//!   can be awaited, waited for, or polled. Every request is resolved at most
//!   once, and misbehaving boundaries (duplicate or unknown IDs, malformed
//!   payloads) are logged rather than allowed to crash or hang the caller.
//! - The single-flight scheduler (`scheduler`) can be triggered on every
//!   host tick, but never runs its update operation concurrently with itself.
//!   Triggers which arrive while an update is in flight are dropped.
//! - The state sequencer (`sequence`) stamps every state snapshot with a
//!   monotonically increasing sequence number, so that consumers can tell a
//!   new snapshot from a re-delivery of an old one.
//!
//! Executors (`executor`) decide where background work and deliveries run,
//! and the `multithread` module provides polling and push-based delivery of
//! versioned state. The `logic` module contains a small demo producer, which
//! the demo binary wires to a simulated boundary.

pub mod broker;
pub mod change;
pub mod client;
pub mod config;
pub mod decode;
pub mod executor;
pub mod logic;
pub mod multithread;
pub mod registry;
pub mod response;
pub mod scheduler;
pub mod sequence;
pub mod server;

pub use broker::RequestBroker;
pub use client::PendingResponse;
pub use decode::{DecodeError, Decoder};
pub use registry::RequestRegistry;
pub use response::{RequestError, RequestId, Response};
pub use scheduler::{SingleFlightScheduler, Trigger, UpdateOperation};
pub use sequence::{SequenceTracker, StateSequencer, VersionedState};
pub use server::{CallbackOutcome, RequestCallbacks};
