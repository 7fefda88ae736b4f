//! Integration tests exercising the full agreement loop:
//! proposal → gossip → quorum → candidate change → next round.
//!
//! A small simulated cluster wires several consensus cores together through
//! nullable schedulers, relaying each core's broadcast requests to the
//! others, the plumbing a real node does through its gossip layer.

use lattice_consensus::{
    Consensus, Data, DataFactory, Epoch, Kind, RoundOutcome, StandardFactory, TimerEvent, Vote,
    VoteFactory, TIMEOUT_PROPOSE, TIMEOUT_VOTE,
};
use lattice_nullables::{NullScheduler, NullVerifier};
use lattice_types::{DataId, Slot, VoterId};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn voters(n: usize) -> Vec<VoterId> {
    (0..n).map(|i| VoterId::new(format!("voter-{i}"))).collect()
}

fn genesis() -> Data {
    Data {
        id: DataId::new([1; 32]),
        number: 0,
        prev_id: DataId::ZERO,
        proposer_id: VoterId::new("voter-0"),
        epoch_num: 0,
        round_num: 0,
        kind: Kind::Real,
        prev_votes: Vec::new(),
    }
}

fn make_node(local: &str) -> (Consensus, NullScheduler) {
    let scheduler = NullScheduler::new();
    let factory = StandardFactory::new(VoterId::new(local));
    let consensus = Consensus::new(
        VoterId::new(local),
        Box::new(factory.clone()),
        Box::new(factory),
        Box::new(NullVerifier::new()),
        Box::new(NullVerifier::new()),
        Box::new(scheduler.clone()),
    );
    (consensus, scheduler)
}

fn bootstrapped(local: &str, n: usize) -> (Consensus, NullScheduler) {
    let (mut node, scheduler) = make_node(local);
    node.initialize(None, Epoch::new(0, voters(n)), 1, genesis(), Vec::new())
        .unwrap();
    (node, scheduler)
}

/// A proposal authored by the designated proposer of `round_num`, justified
/// by per-voter lazy placeholders for the candidate's slot.
fn proposal(candidate: &Data, epoch_num: u64, round_num: u64, n: usize) -> Data {
    let proposer = format!("voter-{}", round_num % n as u64);
    let factory = StandardFactory::new(VoterId::new(proposer));
    let prev_votes = voters(n)
        .into_iter()
        .map(|v| factory.create_lazy_vote(candidate.epoch_num, candidate.round_num, v))
        .collect();
    factory.create_data(
        candidate.number + 1,
        candidate.id,
        epoch_num,
        round_num,
        prev_votes,
    )
}

fn vote(data: &Data, voter: &str) -> Vote {
    StandardFactory::new(VoterId::new(voter)).create_vote(data, VoterId::new(voter))
}

fn none_vote(epoch_num: u64, round_num: u64, voter: &str) -> Vote {
    StandardFactory::new(VoterId::new(voter)).create_none_vote(
        epoch_num,
        round_num,
        VoterId::new(voter),
    )
}

// ---------------------------------------------------------------------------
// Simulated cluster
// ---------------------------------------------------------------------------

struct Cluster {
    nodes: Vec<(Consensus, NullScheduler)>,
    relayed_data: Vec<usize>,
    relayed_votes: Vec<usize>,
}

impl Cluster {
    /// `live` indexes into the epoch's voter set; silent voters exist in the
    /// epoch but run no node.
    fn new(epoch_size: usize, live: &[usize]) -> Self {
        let nodes: Vec<(Consensus, NullScheduler)> = live
            .iter()
            .map(|i| bootstrapped(&format!("voter-{i}"), epoch_size))
            .collect();
        let relayed_data = vec![0; nodes.len()];
        let relayed_votes = vec![0; nodes.len()];
        let mut cluster = Self {
            nodes,
            relayed_data,
            relayed_votes,
        };
        cluster.sweep();
        cluster
    }

    /// One gossip sweep: relay every not-yet-relayed broadcast to every
    /// other node.
    fn sweep(&mut self) {
        for i in 0..self.nodes.len() {
            let datas = self.nodes[i].1.broadcast_data();
            let votes = self.nodes[i].1.broadcast_votes();
            let new_datas: Vec<Data> = datas[self.relayed_data[i]..].to_vec();
            let new_votes: Vec<Vote> = votes[self.relayed_votes[i]..].to_vec();
            self.relayed_data[i] = datas.len();
            self.relayed_votes[i] = votes.len();

            for j in 0..self.nodes.len() {
                if i == j {
                    continue;
                }
                for data in &new_datas {
                    self.nodes[j].0.receive_data(data.clone()).unwrap();
                }
                for vote in &new_votes {
                    self.nodes[j].0.receive_vote(vote.clone()).unwrap();
                }
            }
        }
    }

    /// Advance every scheduler and feed the due timers back in, then gossip.
    fn tick(&mut self, ticks: u64) {
        for (node, scheduler) in &mut self.nodes {
            for timer in scheduler.advance(ticks) {
                node.handle_timeout(timer).unwrap();
            }
        }
        self.sweep();
    }

    /// The outcomes every node agrees on so far (nodes may be a gossip
    /// sweep apart; the shared prefix must be identical).
    fn agreed_outcomes(&self) -> Vec<RoundOutcome> {
        let all: Vec<Vec<RoundOutcome>> = self
            .nodes
            .iter()
            .map(|(_, scheduler)| scheduler.round_outcomes())
            .collect();
        let min_len = all.iter().map(|o| o.len()).min().unwrap_or(0);
        for outcomes in &all {
            assert_eq!(outcomes[..min_len], all[0][..min_len]);
        }
        all[0][..min_len].to_vec()
    }
}

// ---------------------------------------------------------------------------
// 1. Happy path: rotating proposers, advancing chain
// ---------------------------------------------------------------------------

#[test]
fn four_voter_cluster_agrees_and_advances() {
    let mut cluster = Cluster::new(4, &[0, 1, 2, 3]);
    for _ in 0..6 {
        cluster.sweep();
    }

    // Every node resolved the same rounds with the same candidates, all
    // successful.
    let agreed = cluster.agreed_outcomes();
    assert!(agreed.len() >= 2, "chain should have advanced");
    assert!(agreed.iter().all(|o| o.success));

    let frontier = cluster.nodes[0].0.frontier_slot().unwrap();
    assert!(frontier > Slot::new(0, 2));
}

// ---------------------------------------------------------------------------
// 2. Liveness: silent proposer, then recovery
// ---------------------------------------------------------------------------

#[test]
fn silent_proposer_times_out_then_next_round_succeeds() {
    // voter-1 (round 1's proposer) runs no node.
    let mut cluster = Cluster::new(4, &[0, 2, 3]);
    cluster.sweep();
    assert!(cluster.nodes[0].1.round_outcomes().is_empty());

    // Propose timeout: the three live voters vote None, which reaches the
    // quorum of 3 and fails the round.
    cluster.tick(TIMEOUT_PROPOSE);
    cluster.sweep();
    let outcomes = cluster.nodes[0].1.round_outcomes();
    assert_eq!(outcomes.len(), 1);
    assert!(!outcomes[0].success);

    // Round 2's proposer (voter-2) is live: same candidate, success.
    for _ in 0..3 {
        cluster.sweep();
    }
    let agreed = cluster.agreed_outcomes();
    assert!(agreed.len() >= 2);
    assert!(agreed[1].success);
    assert_eq!(agreed[1].commit_id, Some(genesis().id));
}

// ---------------------------------------------------------------------------
// 3. Deadlock: split votes, lazy fill via vote timeout
// ---------------------------------------------------------------------------

#[test]
fn split_votes_resolve_by_vote_timeout() {
    let (mut node, scheduler) = bootstrapped("voter-0", 4);
    let a = proposal(&genesis(), 0, 1, 4);

    // voter-0 endorses the proposal; voter-1 does too; voter-2 votes None;
    // voter-3 stays silent. Three voters heard, no group at quorum.
    node.receive_data(a.clone()).unwrap();
    node.receive_vote(vote(&a, "voter-1")).unwrap();
    node.receive_vote(none_vote(0, 1, "voter-2")).unwrap();
    assert!(scheduler.round_outcomes().is_empty());

    // The propose timer fires first (already voted: no-op), then the vote
    // timer fills voter-3 with a Lazy placeholder: every voter accounted
    // for, still no quorum: the round fails.
    for timer in scheduler.advance(TIMEOUT_PROPOSE + TIMEOUT_VOTE) {
        node.handle_timeout(timer).unwrap();
    }
    let outcomes = scheduler.round_outcomes();
    assert_eq!(outcomes.len(), 1);
    assert!(!outcomes[0].success);

    // The failed round stays at the frontier; round 2 re-runs on the same
    // candidate.
    assert_eq!(node.frontier_slot(), Some(Slot::new(0, 1)));
    assert_eq!(
        node.round(&Slot::new(0, 2)).unwrap().candidate_id(),
        genesis().id
    );
}

// ---------------------------------------------------------------------------
// 4. The 4-voter example: 3 Real succeed, 2 Real + 2 None fail
// ---------------------------------------------------------------------------

#[test]
fn three_real_votes_succeed() {
    let (mut node, scheduler) = bootstrapped("voter-9", 4);
    let a = proposal(&genesis(), 0, 1, 4);

    node.receive_data(a.clone()).unwrap();
    for voter in ["voter-0", "voter-1", "voter-2"] {
        node.receive_vote(vote(&a, voter)).unwrap();
    }

    let outcomes = scheduler.round_outcomes();
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].success);
    assert_eq!(outcomes[0].candidate_id, Some(a.id));
    assert_eq!(outcomes[0].commit_id, Some(genesis().id));
}

#[test]
fn two_real_two_none_fail_and_keep_candidate() {
    let (mut node, scheduler) = bootstrapped("voter-9", 4);
    let a = proposal(&genesis(), 0, 1, 4);

    node.receive_data(a.clone()).unwrap();
    node.receive_vote(vote(&a, "voter-0")).unwrap();
    node.receive_vote(vote(&a, "voter-1")).unwrap();
    node.receive_vote(none_vote(0, 1, "voter-2")).unwrap();
    node.receive_vote(none_vote(0, 1, "voter-3")).unwrap();

    // All four voters heard, best group at 2 < 3: failure, candidate kept.
    let outcomes = scheduler.round_outcomes();
    assert_eq!(outcomes.len(), 1);
    assert!(!outcomes[0].success);
    assert_eq!(
        node.round(&Slot::new(0, 2)).unwrap().candidate_id(),
        genesis().id
    );
}

// ---------------------------------------------------------------------------
// 5. Safety: equivocating proposer cannot split agreement
// ---------------------------------------------------------------------------

#[test]
fn equivocating_proposer_cannot_split_agreement() {
    // voter-1 authors two distinct round-1 proposals. Honest voters each
    // vote once; the quorum intersection forces both observers to the same
    // winner regardless of delivery order.
    let a = proposal(&genesis(), 0, 1, 4);
    let factory = StandardFactory::new(VoterId::new("voter-1"));
    // A different justification set gives the equivocation a distinct id.
    let alt_votes: Vec<Vote> = voters(4)
        .into_iter()
        .map(|v| factory.create_none_vote(0, 0, v))
        .collect();
    let mut a2 = factory.create_data(1, genesis().id, 0, 1, alt_votes);
    a2.prev_votes.clear();
    assert_ne!(a.id, a2.id);

    let (mut x, sched_x) = bootstrapped("voter-8", 4);
    let (mut y, sched_y) = bootstrapped("voter-9", 4);

    let ballots = [vote(&a, "voter-0"), vote(&a, "voter-1"), vote(&a, "voter-2")];

    // X sees only the honest proposal.
    x.receive_data(a.clone()).unwrap();
    for b in &ballots {
        x.receive_vote(b.clone()).unwrap();
    }

    // Y sees the equivocation first and voter-3's endorsement of it.
    y.receive_data(a2.clone()).unwrap();
    y.receive_vote(vote(&a2, "voter-3")).unwrap();
    y.receive_data(a.clone()).unwrap();
    for b in &ballots {
        y.receive_vote(b.clone()).unwrap();
    }

    let wx = sched_x.round_outcomes();
    let wy = sched_y.round_outcomes();
    assert_eq!(wx.len(), 1);
    assert_eq!(wy.len(), 1);
    assert_eq!(wx[0].candidate_id, Some(a.id));
    assert_eq!(wx[0].candidate_id, wy[0].candidate_id);
}

// ---------------------------------------------------------------------------
// 6. Buffered proposals and idempotent re-delivery
// ---------------------------------------------------------------------------

#[test]
fn out_of_order_rounds_resolve_after_candidate_change() {
    let (mut node, scheduler) = bootstrapped("voter-9", 4);
    let a = proposal(&genesis(), 0, 1, 4);
    let b = proposal(&a, 0, 2, 4);

    // Round 2 material arrives entirely before round 1 resolves.
    node.receive_data(b.clone()).unwrap();
    for voter in ["voter-0", "voter-1", "voter-2"] {
        node.receive_vote(vote(&b, voter)).unwrap();
    }
    assert!(scheduler.round_outcomes().is_empty());

    node.receive_data(a.clone()).unwrap();
    for voter in ["voter-0", "voter-1", "voter-2"] {
        node.receive_vote(vote(&a, voter)).unwrap();
    }

    // Round 1 resolving re-points round 2 at A and re-delivers B; the
    // already-recorded votes then resolve round 2 in the same pump.
    let outcomes = scheduler.round_outcomes();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].candidate_id, Some(a.id));
    assert_eq!(outcomes[1].candidate_id, Some(b.id));
    assert_eq!(node.frontier_slot(), Some(Slot::new(0, 3)));
}

#[test]
fn redelivered_history_changes_nothing() {
    let (mut node, scheduler) = bootstrapped("voter-9", 4);
    let a = proposal(&genesis(), 0, 1, 4);

    node.receive_data(a.clone()).unwrap();
    for voter in ["voter-0", "voter-1", "voter-2"] {
        node.receive_vote(vote(&a, voter)).unwrap();
    }
    let outcomes = scheduler.round_outcomes();
    let (datas, votes) = (node.stored_data(), node.stored_votes());

    node.receive_data(a.clone()).unwrap();
    for voter in ["voter-0", "voter-1", "voter-2", "voter-3"] {
        node.receive_vote(vote(&a, voter)).unwrap();
    }

    assert_eq!(scheduler.round_outcomes(), outcomes);
    assert_eq!(node.stored_data(), datas);
    assert_eq!(node.stored_votes(), votes);
}

// ---------------------------------------------------------------------------
// 7. Epoch transition
// ---------------------------------------------------------------------------

#[test]
fn epoch_transition_enters_at_round_zero_and_drops_stale_epoch() {
    let (mut node, scheduler) = bootstrapped("voter-9", 4);
    let a = proposal(&genesis(), 0, 1, 4);
    node.receive_data(a.clone()).unwrap();
    for voter in ["voter-0", "voter-1", "voter-2"] {
        node.receive_vote(vote(&a, voter)).unwrap();
    }

    // New epoch, new voter set, entering at round 0 on the inherited
    // candidate.
    node.round_start(Epoch::new(1, voters(4)), 0).unwrap();
    assert_eq!(node.round(&Slot::new(1, 0)).unwrap().candidate_id(), a.id);

    // A proposal for epoch 1 round 0 resolves normally.
    let b = proposal(&a, 1, 0, 4);
    node.receive_data(b.clone()).unwrap();
    for voter in ["voter-0", "voter-1", "voter-2"] {
        node.receive_vote(vote(&b, voter)).unwrap();
    }
    let outcomes = scheduler.round_outcomes();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[1].candidate_id, Some(b.id));

    // Messages from the settled part of epoch 0 are dropped without effect.
    let votes_before = node.stored_votes();
    node.receive_vote(vote(&a, "voter-3")).unwrap();
    assert_eq!(node.stored_votes(), votes_before);
}

// ---------------------------------------------------------------------------
// 8. Stale timers
// ---------------------------------------------------------------------------

#[test]
fn timers_for_pruned_rounds_are_ignored() {
    let (mut node, scheduler) = bootstrapped("voter-9", 4);
    let a = proposal(&genesis(), 0, 1, 4);
    node.receive_data(a.clone()).unwrap();
    for voter in ["voter-0", "voter-1", "voter-2"] {
        node.receive_vote(vote(&a, voter)).unwrap();
    }
    assert_eq!(node.frontier_slot(), Some(Slot::new(0, 2)));

    // Round 1's propose timer fires after the round is gone.
    for timer in scheduler.advance(TIMEOUT_PROPOSE) {
        node.handle_timeout(timer).unwrap();
    }
    assert_eq!(scheduler.round_outcomes().len(), 1);

    node.handle_timeout(TimerEvent::Vote {
        slot: Slot::new(0, 1),
    })
    .unwrap();
    assert_eq!(scheduler.round_outcomes().len(), 1);
}
