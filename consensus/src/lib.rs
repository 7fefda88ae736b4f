//! Consensus: BFT agreement over a hash-linked proposal chain.
//!
//! Voters take turns proposing; a round succeeds when a quorum of
//! `n - (n-1)/3` voters (more than two thirds, tolerating `f < n/3` faults)
//! endorses the same proposal under the same commit target. Failed rounds
//! re-run on the same candidate; a success commits the candidate's parent
//! and cascades the new candidate into every pending later round.
//!
//! ## Module overview
//!
//! - [`consensus`]: Orchestrator with the acceptance window, routing,
//!   worklist, and the candidate-change cascade.
//! - [`election`]: Per-round quorum-resolution state machine.
//! - [`round`]: Per-slot acceptance shell with timeout escalation.
//! - [`epoch`]: Voter set, quorum arithmetic, proposer rotation.
//! - [`message`]: Data and Vote messages and their Real/None/Lazy kinds.
//! - [`message_pool`], [`data_pool`], [`vote_pool`]: Keyed stores with
//!   slot-ordered watermark pruning.
//! - [`round_pool`], [`epoch_pool`]: The active round window and the
//!   registered epochs.
//! - [`factory`]: Injected message construction and verification.
//! - [`event`]: Events, timers, and the injected sink.
//! - [`error`]: Consensus error types.

pub mod consensus;
pub mod data_pool;
pub mod election;
pub mod epoch;
pub mod epoch_pool;
pub mod error;
pub mod event;
pub mod factory;
pub mod message;
pub mod message_pool;
pub mod round;
pub mod round_pool;
pub mod vote_pool;

pub use consensus::Consensus;
pub use data_pool::DataPool;
pub use election::{Delivery, Election, RoundCtx};
pub use epoch::Epoch;
pub use epoch_pool::EpochPool;
pub use error::ConsensusError;
pub use event::{
    Event, EventPayload, EventSink, RoundOutcome, TimerEvent, TIMEOUT_PROPOSE, TIMEOUT_VOTE,
};
pub use factory::{DataFactory, DataVerifier, StandardFactory, VoteFactory, VoteVerifier};
pub use message::{Data, Kind, Message, Vote};
pub use message_pool::MessagePool;
pub use round::Round;
pub use round_pool::RoundPool;
pub use vote_pool::VotePool;
