//! Events the core raises toward its collaborators.
//!
//! The core never touches the network or a timer directly. Everything
//! outward-facing goes through an injected [`EventSink`]: broadcast requests
//! for the gossip layer, round-end notifications for the embedding node, and
//! delayed timer requests that re-enter through
//! [`Consensus::handle_timeout`](crate::consensus::Consensus::handle_timeout).
//!
//! Each raised event carries a determinism flag. Locally/causally triggered
//! events (self-broadcast after proposing, round-end notifications) are
//! deterministic given the same inputs and are processed before
//! timing-triggered events of the same logical time, which keeps the state
//! that must be persisted for deterministic replay small.

use crate::message::{Data, Vote};
use lattice_types::{DataId, Slot};
use serde::{Deserialize, Serialize};

/// Ticks to wait for a proposal before the round votes on its own.
pub const TIMEOUT_PROPOSE: u64 = 2;

/// Ticks to wait for quorum consensus before synthesizing Lazy votes.
pub const TIMEOUT_VOTE: u64 = 2;

/// An event raised by the core.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    /// Whether the event is causally determined by already-processed input.
    pub deterministic: bool,
    pub payload: EventPayload,
}

impl Event {
    pub fn deterministic(payload: EventPayload) -> Self {
        Self {
            deterministic: true,
            payload,
        }
    }

    pub fn external(payload: EventPayload) -> Self {
        Self {
            deterministic: false,
            payload,
        }
    }
}

/// What the event carries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum EventPayload {
    /// Ask the gossip collaborator to relay a proposal.
    BroadcastData(Data),
    /// Ask the gossip collaborator to relay a ballot.
    BroadcastVote(Vote),
    /// A round resolved for the first time.
    RoundEnded(RoundOutcome),
}

/// The outcome of a resolved round.
///
/// `success = true` carries the newly agreed candidate and its commit target
/// (the candidate's parent); a None/Lazy resolution carries neither.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub epoch_num: u64,
    pub round_num: u64,
    pub success: bool,
    pub candidate_id: Option<DataId>,
    pub commit_id: Option<DataId>,
}

/// A delayed callback requested from the scheduling collaborator.
///
/// Timers re-enter as ordinary non-deterministic events; stale timers are
/// harmless no-ops because the round's acceptance filters reject input for
/// slots it has moved past.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerEvent {
    /// No proposal arrived within `TIMEOUT_PROPOSE`.
    Propose { slot: Slot },
    /// Quorum voters were heard but no group reached quorum within
    /// `TIMEOUT_VOTE`.
    Vote { slot: Slot },
}

impl TimerEvent {
    pub fn slot(&self) -> Slot {
        match self {
            TimerEvent::Propose { slot } | TimerEvent::Vote { slot } => *slot,
        }
    }
}

/// The injected scheduling capability.
pub trait EventSink {
    /// Emit an event for the embedding node / gossip layer.
    fn raise(&mut self, event: Event);

    /// Request `timer` to re-enter after `delay` ticks.
    fn schedule(&mut self, delay: u64, timer: TimerEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_slot_extraction() {
        let slot = Slot::new(1, 2);
        assert_eq!(TimerEvent::Propose { slot }.slot(), slot);
        assert_eq!(TimerEvent::Vote { slot }.slot(), slot);
    }

    #[test]
    fn determinism_flag() {
        let outcome = RoundOutcome {
            epoch_num: 0,
            round_num: 0,
            success: false,
            candidate_id: None,
            commit_id: None,
        };
        assert!(Event::deterministic(EventPayload::RoundEnded(outcome.clone())).deterministic);
        assert!(!Event::external(EventPayload::RoundEnded(outcome)).deterministic);
    }
}
