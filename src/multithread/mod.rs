//! Delivery of versioned state from a worker thread to its consumer
//!
//! Once a background update has produced new state, the consumer on the host
//! side has to learn about it. Two delivery mechanisms are proposed:
//!
//! - Polling is suitable when a consumer only wants to periodically check
//!   the latest state and does not care about the intermediate ones, as is
//!   the case for display refreshes. Snapshots are handed over through a
//!   lock-free triple buffer, and sequence numbers tell fresh ones from
//!   re-reads of an old one.
//! - Callbacks push every change record to a listener, on an execution
//!   context of the consumer's choosing (typically a queue drained by the
//!   host loop).

pub mod callback;
pub mod polling;
