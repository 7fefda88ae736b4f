use lattice_types::{DataId, VoterId};
use thiserror::Error;

/// Errors raised by the agreement core.
///
/// Two tiers: protocol-level rejections are expected under adversarial or
/// lagging peers and are dropped silently at the orchestrator boundary;
/// invariant violations indicate a bug or an impossible state and propagate.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConsensusError {
    #[error("message epoch is outside the acceptance window")]
    InvalidEpoch,

    #[error("message round is outside the acceptance window")]
    InvalidRound,

    #[error("{0} is not the designated proposer for this round")]
    InvalidProposer(VoterId),

    #[error("{0} is not a voter in this epoch")]
    InvalidVoter(VoterId),

    #[error("a proposal with this id was already received")]
    AlreadyProposed,

    #[error("voter {0} already cast a vote in this round")]
    AlreadyVoted(VoterId),

    #[error("epoch {0} is not tracked")]
    UnknownEpoch(u64),

    #[error("data {0} not found in the pool")]
    DataIdNotFound(DataId),

    #[error("round result was already set")]
    AlreadyCompleted,
}

impl ConsensusError {
    /// Whether this is a protocol-level rejection (drop the message, carry
    /// on) rather than an invariant violation (fatal to the round).
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            ConsensusError::DataIdNotFound(_) | ConsensusError::AlreadyCompleted
        )
    }
}
