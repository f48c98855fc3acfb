//! Scheduling primitives owned by a simulation
//!
//! ActionQueue (per-round buckets), ActiveActionTracker (multi-round work in
//! flight) and Mailbox (messages held until their delivery round). All three
//! are plain data embedded in the Simulation aggregate; only the round
//! processor mutates them during reconciliation.

pub mod active;
pub mod mailbox;
pub mod queue;

pub use active::ActiveActionTracker;
pub use mailbox::Mailbox;
pub use queue::ActionQueue;
