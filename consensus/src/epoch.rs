//! Epoch: an immutable voter set for a span of rounds.
//!
//! A new `Epoch` instance is created whenever the voter set changes; an
//! existing instance is never mutated. The quorum threshold is fixed at
//! construction so that agreement tolerates a Byzantine minority of fewer
//! than one third of the voters.

use crate::error::ConsensusError;
use crate::message::Data;
use lattice_types::VoterId;
use serde::{Deserialize, Serialize};

/// The voter set and proposer rotation for a span of rounds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Epoch {
    /// Monotonic epoch index.
    pub num: u64,
    /// Ordered, unique voter identifiers.
    voters: Vec<VoterId>,
    /// Minimum vote count for agreement: `n - (n - 1) / 3`.
    quorum_num: usize,
}

impl Epoch {
    /// Build an epoch over an ordered, unique voter list.
    ///
    /// With `n` voters the quorum is `n - (n - 1) / 3`, which is strictly
    /// greater than `2n/3`: any two quorums intersect in at least one honest
    /// voter as long as fewer than `n/3` voters are faulty.
    ///
    /// # Panics
    ///
    /// Panics if `voters` is empty. An epoch with no voters has no proposer
    /// rotation and a quorum of zero.
    pub fn new(num: u64, voters: Vec<VoterId>) -> Self {
        assert!(!voters.is_empty(), "epoch requires at least one voter");
        let n = voters.len();
        let quorum_num = n - (n - 1) / 3;
        Self {
            num,
            voters,
            quorum_num,
        }
    }

    pub fn voters(&self) -> &[VoterId] {
        &self.voters
    }

    pub fn voters_num(&self) -> usize {
        self.voters.len()
    }

    pub fn quorum_num(&self) -> usize {
        self.quorum_num
    }

    /// The voter designated to propose in the given round.
    ///
    /// Rotates deterministically through the voter list.
    pub fn get_proposer_id(&self, round_num: u64) -> &VoterId {
        &self.voters[(round_num % self.voters.len() as u64) as usize]
    }

    /// Whether `id` is a recognized voter of this epoch.
    pub fn is_voter(&self, id: &VoterId) -> bool {
        self.voters.contains(id)
    }

    /// Check that `id` is the designated proposer for `round_num`.
    pub fn verify_proposer(&self, id: &VoterId, round_num: u64) -> Result<(), ConsensusError> {
        if self.get_proposer_id(round_num) == id {
            Ok(())
        } else {
            Err(ConsensusError::InvalidProposer(id.clone()))
        }
    }

    /// Check that `id` is a recognized voter, optionally at a given position
    /// in the voter list.
    pub fn verify_voter(
        &self,
        id: &VoterId,
        index: Option<usize>,
    ) -> Result<(), ConsensusError> {
        let ok = match index {
            Some(i) => self.voters.get(i) == Some(id),
            None => self.is_voter(id),
        };
        if ok {
            Ok(())
        } else {
            Err(ConsensusError::InvalidVoter(id.clone()))
        }
    }

    /// Validate a proposal against this epoch: the proposer must match the
    /// rotation, and every embedded `prev_vote` must come from the voter at
    /// its position in the voter list.
    pub fn verify_data(&self, data: &Data) -> Result<(), ConsensusError> {
        self.verify_proposer(&data.proposer_id, data.round_num)?;
        for (i, vote) in data.prev_votes.iter().enumerate() {
            self.verify_voter(&vote.voter_id, Some(i))?;
        }
        Ok(())
    }
}
