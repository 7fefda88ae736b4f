//! Fundamental types for the lattice agreement core.
//!
//! This crate defines the newtypes shared across every other crate in the
//! workspace: message identifiers, voter identifiers, and the ordered
//! `(epoch, round)` slot used for acceptance windows and pool pruning.

pub mod id;
pub mod slot;
pub mod voter;

pub use id::{DataId, VoteId};
pub use slot::Slot;
pub use voter::VoterId;
