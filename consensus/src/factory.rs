//! Message construction and verification collaborators.
//!
//! The core never decides what a Data or Vote looks like internally; ids,
//! payloads, and cryptographic material are the application's business. It
//! only requires that the None/Lazy constructors are deterministic given
//! identical inputs, so the synthesized placeholders carry the same id on
//! every node and ballots for them group together.
//!
//! [`StandardFactory`] is the stock implementation: ids are blake2 digests
//! over a domain tag and the identifying fields.

use crate::message::{Data, Kind, Vote};
use blake2::{Blake2s256, Digest};
use lattice_types::{DataId, VoteId, VoterId};

/// Builds proposals.
pub trait DataFactory {
    /// A real proposal extending `prev_id` at chain height `number`,
    /// justified by `prev_votes`.
    fn create_data(
        &self,
        number: u64,
        prev_id: DataId,
        epoch_num: u64,
        round_num: u64,
        prev_votes: Vec<Vote>,
    ) -> Data;

    /// The round's explicit "no valid proposal". Deterministic: identical
    /// inputs must produce an identical id on every node.
    fn create_none_data(&self, epoch_num: u64, round_num: u64, proposer_id: VoterId) -> Data;

    /// The round's timeout placeholder. Deterministic, like
    /// [`create_none_data`](DataFactory::create_none_data).
    fn create_lazy_data(&self, epoch_num: u64, round_num: u64, proposer_id: VoterId) -> Data;
}

/// Builds ballots.
pub trait VoteFactory {
    /// A real vote endorsing `data`; the commit target is the endorsed
    /// proposal's parent.
    fn create_vote(&self, data: &Data, voter_id: VoterId) -> Vote;

    /// An explicit rejection; `data_id` is the round's None Data id.
    fn create_none_vote(&self, epoch_num: u64, round_num: u64, voter_id: VoterId) -> Vote;

    /// A timeout placeholder for an absent voter; `data_id` is the round's
    /// Lazy Data id.
    fn create_lazy_vote(&self, epoch_num: u64, round_num: u64, voter_id: VoterId) -> Vote;
}

/// Application-defined proposal verification (signatures, payload validity).
///
/// A rejection means the local node votes None on the proposal; it is not a
/// protocol error.
pub trait DataVerifier {
    fn verify(&self, data: &Data) -> anyhow::Result<()>;
}

/// Application-defined ballot verification (signatures, authorship).
///
/// Runs at the ingress boundary before a vote is stored or counted; a
/// rejection drops the vote. Applies to everything entering through the
/// worklist, including self-delivered votes.
pub trait VoteVerifier {
    fn verify(&self, vote: &Vote) -> anyhow::Result<()>;
}

// ── Standard implementation ─────────────────────────────────────────────

/// Stock factory deriving ids from blake2 digests.
///
/// None/Lazy ids hash only `(tag, epoch, round)`: the proposer is itself a
/// function of the epoch and round, so the derivation stays deterministic
/// across nodes without hashing it. Real proposals are authored by the local
/// node, whose identity the factory carries.
#[derive(Clone, Debug)]
pub struct StandardFactory {
    local_id: VoterId,
}

impl StandardFactory {
    pub fn new(local_id: VoterId) -> Self {
        Self { local_id }
    }
}

fn digest(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2s256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

fn none_data_id(epoch_num: u64, round_num: u64) -> DataId {
    DataId::new(digest(&[
        b"lattice.data.none",
        &epoch_num.to_be_bytes(),
        &round_num.to_be_bytes(),
    ]))
}

fn lazy_data_id(epoch_num: u64, round_num: u64) -> DataId {
    DataId::new(digest(&[
        b"lattice.data.lazy",
        &epoch_num.to_be_bytes(),
        &round_num.to_be_bytes(),
    ]))
}

impl DataFactory for StandardFactory {
    fn create_data(
        &self,
        number: u64,
        prev_id: DataId,
        epoch_num: u64,
        round_num: u64,
        prev_votes: Vec<Vote>,
    ) -> Data {
        let mut hasher = Blake2s256::new();
        hasher.update(b"lattice.data.real");
        hasher.update(self.local_id.as_str().as_bytes());
        hasher.update(number.to_be_bytes());
        hasher.update(prev_id.as_bytes());
        hasher.update(epoch_num.to_be_bytes());
        hasher.update(round_num.to_be_bytes());
        for vote in &prev_votes {
            hasher.update(vote.id.as_bytes());
        }
        let id = DataId::new(hasher.finalize().into());
        Data {
            id,
            number,
            prev_id,
            proposer_id: self.local_id.clone(),
            epoch_num,
            round_num,
            kind: Kind::Real,
            prev_votes,
        }
    }

    fn create_none_data(&self, epoch_num: u64, round_num: u64, proposer_id: VoterId) -> Data {
        Data {
            id: none_data_id(epoch_num, round_num),
            number: 0,
            prev_id: DataId::ZERO,
            proposer_id,
            epoch_num,
            round_num,
            kind: Kind::None,
            prev_votes: Vec::new(),
        }
    }

    fn create_lazy_data(&self, epoch_num: u64, round_num: u64, proposer_id: VoterId) -> Data {
        Data {
            id: lazy_data_id(epoch_num, round_num),
            number: 0,
            prev_id: DataId::ZERO,
            proposer_id,
            epoch_num,
            round_num,
            kind: Kind::Lazy,
            prev_votes: Vec::new(),
        }
    }
}

impl VoteFactory for StandardFactory {
    fn create_vote(&self, data: &Data, voter_id: VoterId) -> Vote {
        let id = VoteId::new(digest(&[
            b"lattice.vote.real",
            data.id.as_bytes(),
            voter_id.as_str().as_bytes(),
            &data.epoch_num.to_be_bytes(),
            &data.round_num.to_be_bytes(),
        ]));
        Vote {
            id,
            data_id: data.id,
            commit_id: data.prev_id,
            voter_id,
            epoch_num: data.epoch_num,
            round_num: data.round_num,
            kind: Kind::Real,
        }
    }

    fn create_none_vote(&self, epoch_num: u64, round_num: u64, voter_id: VoterId) -> Vote {
        let id = VoteId::new(digest(&[
            b"lattice.vote.none",
            voter_id.as_str().as_bytes(),
            &epoch_num.to_be_bytes(),
            &round_num.to_be_bytes(),
        ]));
        Vote {
            id,
            data_id: none_data_id(epoch_num, round_num),
            commit_id: DataId::ZERO,
            voter_id,
            epoch_num,
            round_num,
            kind: Kind::None,
        }
    }

    fn create_lazy_vote(&self, epoch_num: u64, round_num: u64, voter_id: VoterId) -> Vote {
        let id = VoteId::new(digest(&[
            b"lattice.vote.lazy",
            voter_id.as_str().as_bytes(),
            &epoch_num.to_be_bytes(),
            &round_num.to_be_bytes(),
        ]));
        Vote {
            id,
            data_id: lazy_data_id(epoch_num, round_num),
            commit_id: DataId::ZERO,
            voter_id,
            epoch_num,
            round_num,
            kind: Kind::Lazy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory(local: &str) -> StandardFactory {
        StandardFactory::new(VoterId::new(local))
    }

    #[test]
    fn none_data_is_deterministic_across_instances() {
        let a = factory("node-a").create_none_data(1, 2, VoterId::new("p"));
        let b = factory("node-b").create_none_data(1, 2, VoterId::new("p"));
        // Same id regardless of which node synthesized it.
        assert_eq!(a.id, b.id);
        assert!(a.kind.is_none());
    }

    #[test]
    fn lazy_and_none_ids_differ() {
        let none = factory("a").create_none_data(1, 2, VoterId::new("p"));
        let lazy = factory("a").create_lazy_data(1, 2, VoterId::new("p"));
        assert_ne!(none.id, lazy.id);
        assert!(lazy.kind.is_lazy());
    }

    #[test]
    fn ids_depend_on_slot() {
        let a = factory("a").create_none_data(1, 2, VoterId::new("p"));
        let b = factory("a").create_none_data(1, 3, VoterId::new("p"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn none_vote_groups_on_none_data() {
        let none = factory("a").create_none_data(1, 2, VoterId::new("p"));
        let va = factory("a").create_none_vote(1, 2, VoterId::new("a"));
        let vb = factory("b").create_none_vote(1, 2, VoterId::new("b"));
        assert_eq!(va.data_id, none.id);
        assert_eq!(vb.data_id, none.id);
        assert_ne!(va.id, vb.id);
        assert!(va.commit_id.is_zero());
    }

    #[test]
    fn lazy_vote_groups_on_lazy_data() {
        let lazy = factory("a").create_lazy_data(3, 0, VoterId::new("p"));
        let vote = factory("a").create_lazy_vote(3, 0, VoterId::new("a"));
        assert_eq!(vote.data_id, lazy.id);
        assert!(vote.kind.is_lazy());
    }

    #[test]
    fn real_vote_commits_to_parent() {
        let f = factory("node-a");
        let data = f.create_data(5, DataId::new([4; 32]), 0, 1, Vec::new());
        let vote = f.create_vote(&data, VoterId::new("a"));
        assert_eq!(vote.data_id, data.id);
        assert_eq!(vote.commit_id, data.prev_id);
        assert_eq!(data.proposer_id, VoterId::new("node-a"));
        assert!(vote.kind.is_real());
    }

    #[test]
    fn real_data_id_covers_prev_votes() {
        let f = factory("node-a");
        let justification = vec![f.create_lazy_vote(0, 0, VoterId::new("a"))];
        let a = f.create_data(1, DataId::ZERO, 0, 1, Vec::new());
        let b = f.create_data(1, DataId::ZERO, 0, 1, justification);
        assert_ne!(a.id, b.id);
    }
}
