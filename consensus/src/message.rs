//! Protocol messages: proposals (Data) and ballots (Vote).
//!
//! Every message is one of three kinds:
//!
//! - **Real**: an actual proposal or endorsement.
//! - **None**: an explicit "no valid proposal / rejection" for the round.
//!   None Data is synthesized locally and carries the same id on every node;
//!   it is never gossiped as a distinct network object.
//! - **Lazy**: a locally synthesized timeout placeholder that lets a round
//!   terminate without agreement.
//!
//! The kind is an explicit tag rather than a sentinel-id comparison, so the
//! three-way classification cannot drift out of sync with the id scheme.

use lattice_types::{DataId, Slot, VoteId, VoterId};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// The three message kinds shared by Data and Vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Kind {
    Real,
    None,
    Lazy,
}

impl Kind {
    pub fn is_real(&self) -> bool {
        matches!(self, Kind::Real)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Kind::None)
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self, Kind::Lazy)
    }

    /// Whether a result of this kind conclusively decides the round.
    /// Real and None are determinative; Lazy is not.
    pub fn is_determinative(&self) -> bool {
        !self.is_lazy()
    }
}

/// The base contract shared by Data and Vote: a stable key plus the
/// `(epoch, round)` slot the message belongs to.
pub trait Message {
    type Key: Copy + Eq + std::hash::Hash;

    fn key(&self) -> Self::Key;
    fn epoch_num(&self) -> u64;
    fn round_num(&self) -> u64;

    fn slot(&self) -> Slot {
        Slot::new(self.epoch_num(), self.round_num())
    }
}

/// A proposal for the next item of the hash-linked chain.
///
/// `prev_votes` is the quorum justification for the parent: exactly one entry
/// per voter of the epoch, in epoch order, with Lazy placeholders for voters
/// whose recorded vote was absent or divergent. Equality and hashing are by
/// `id` only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Data {
    pub id: DataId,
    /// Chain height; strictly increasing along `prev_id` links.
    pub number: u64,
    pub prev_id: DataId,
    pub proposer_id: VoterId,
    pub epoch_num: u64,
    pub round_num: u64,
    pub kind: Kind,
    pub prev_votes: Vec<Vote>,
}

impl PartialEq for Data {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Data {}

impl Hash for Data {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Message for Data {
    type Key = DataId;

    fn key(&self) -> DataId {
        self.id
    }

    fn epoch_num(&self) -> u64 {
        self.epoch_num
    }

    fn round_num(&self) -> u64 {
        self.round_num
    }
}

/// A ballot endorsing (or rejecting) a proposal.
///
/// `data_id` names the endorsed proposal; for None and Lazy votes it is the
/// deterministic id of the round's None/Lazy Data, so ballots of the same
/// kind group together across nodes. `commit_id` is the endorsed proposal's
/// parent for Real votes and zero otherwise; tallies group by
/// `(data_id, commit_id)` so votes cast under conflicting histories never
/// combine toward a quorum.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub data_id: DataId,
    pub commit_id: DataId,
    pub voter_id: VoterId,
    pub epoch_num: u64,
    pub round_num: u64,
    pub kind: Kind,
}

impl PartialEq for Vote {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Vote {}

impl Hash for Vote {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Message for Vote {
    type Key = VoteId;

    fn key(&self) -> VoteId {
        self.id
    }

    fn epoch_num(&self) -> u64 {
        self.epoch_num
    }

    fn round_num(&self) -> u64 {
        self.round_num
    }
}
