//! Nullable collaborators for deterministic consensus testing.
//!
//! The consensus core reaches its environment only through injected traits:
//! the event sink / timer scheduler and the proposal verifier. This crate
//! provides controllable in-memory implementations that:
//! - Record every raised event for inspection
//! - Fire timers only when the test advances time
//! - Never touch a real clock or network
//!
//! Usage: hand the consensus core a clone of the nullable, keep the original
//! as the test's inspection handle.

pub mod scheduler;
pub mod verifier;

pub use scheduler::NullScheduler;
pub use verifier::NullVerifier;
