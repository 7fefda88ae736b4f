//! Election: the per-round quorum-resolution state machine.
//!
//! One election accumulates the round's proposals and ballots and decides the
//! outcome. The state machine is started → (proposed?) → voted? → ended:
//! a node casts exactly one vote per round (never zero, never more than one),
//! and the result, once set, is monotone: it never reverts or changes for
//! the lifetime of the election.
//!
//! Resolution rules, in priority order:
//!
//! 1. A `(data_id, commit_id)` vote group reaching the quorum resolves the
//!    round to that data; a determinative (Real/None) group outranks a Lazy
//!    one. At most one determinative and one lazy group can reach quorum
//!    simultaneously.
//! 2. Failing that, once every voter of the epoch has a recorded vote, the
//!    round resolves to its Lazy Data (liveness without agreement).
//! 3. Otherwise the round stays open.

use crate::epoch::Epoch;
use crate::error::ConsensusError;
use crate::event::{Event, EventPayload, EventSink, RoundOutcome};
use crate::factory::{DataFactory, DataVerifier, VoteFactory};
use crate::message::{Data, Vote};
use lattice_types::{DataId, Slot, VoterId};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// A message awaiting local processing.
///
/// Self-authored proposals and votes, and buffered proposals unblocked by a
/// candidate change, are queued here and drained by the orchestrator's
/// worklist, never recursed on the call stack.
#[derive(Clone, Debug)]
pub enum Delivery {
    Data(Data),
    Vote(Vote),
}

/// The capabilities an election needs while processing one delivery.
///
/// Passed down the call chain so the core holds no ambient/global state.
pub struct RoundCtx<'a> {
    pub local_id: &'a VoterId,
    pub data_factory: &'a dyn DataFactory,
    pub vote_factory: &'a dyn VoteFactory,
    pub verifier: &'a dyn DataVerifier,
    pub sink: &'a mut dyn EventSink,
    pub outbox: &'a mut VecDeque<Delivery>,
}

/// The round's working set: candidate proposals in arrival order plus one
/// recorded vote per voter (first wins).
struct ElectionMessages {
    datas: Vec<Data>,
    votes: HashMap<VoterId, Vote>,
}

impl ElectionMessages {
    fn new() -> Self {
        Self {
            datas: Vec::new(),
            votes: HashMap::new(),
        }
    }

    fn insert_data(&mut self, data: Data) -> Result<(), ConsensusError> {
        if self.datas.iter().any(|d| d.id == data.id) {
            return Err(ConsensusError::AlreadyProposed);
        }
        self.datas.push(data);
        Ok(())
    }

    fn insert_vote(&mut self, vote: Vote) -> Result<(), ConsensusError> {
        if self.votes.contains_key(&vote.voter_id) {
            return Err(ConsensusError::AlreadyVoted(vote.voter_id));
        }
        self.votes.insert(vote.voter_id.clone(), vote);
        Ok(())
    }

    /// Vote counts grouped by `(data_id, commit_id)`. Ballots for the same
    /// data under diverging commit targets never combine.
    fn tally(&self) -> HashMap<(DataId, DataId), usize> {
        let mut groups: HashMap<(DataId, DataId), usize> = HashMap::new();
        for vote in self.votes.values() {
            *groups.entry((vote.data_id, vote.commit_id)).or_insert(0) += 1;
        }
        groups
    }
}

/// Per-round accumulator and quorum-resolution algorithm.
pub struct Election {
    epoch: Arc<Epoch>,
    slot: Slot,
    /// The agreed parent this round's proposal must extend.
    candidate: Data,
    messages: ElectionMessages,
    proposed: bool,
    voted: bool,
    result: Option<Data>,
}

impl Election {
    pub fn new(epoch: Arc<Epoch>, slot: Slot, candidate: Data) -> Self {
        Self {
            epoch,
            slot,
            candidate,
            messages: ElectionMessages::new(),
            proposed: false,
            voted: false,
            result: None,
        }
    }

    pub fn candidate(&self) -> &Data {
        &self.candidate
    }

    /// Candidate-change cascade entry: an earlier round resolved, so this
    /// still-open round must extend the new candidate instead.
    pub fn set_candidate(&mut self, candidate: Data) {
        if self.result.is_none() {
            self.candidate = candidate;
        }
    }

    pub fn result(&self) -> Option<&Data> {
        self.result.as_ref()
    }

    pub fn result_id(&self) -> Option<DataId> {
        self.result.as_ref().map(|d| d.id)
    }

    pub fn has_data(&self, id: &DataId) -> bool {
        self.messages.datas.iter().any(|d| d.id == *id)
    }

    pub fn has_vote_from(&self, voter: &VoterId) -> bool {
        self.messages.votes.contains_key(voter)
    }

    pub fn distinct_voters(&self) -> usize {
        self.messages.votes.len()
    }

    /// Voters of the epoch with no recorded vote yet.
    pub fn absent_voters(&self) -> Vec<VoterId> {
        self.epoch
            .voters()
            .iter()
            .filter(|v| !self.messages.votes.contains_key(*v))
            .cloned()
            .collect()
    }

    /// Whether any `(data_id, commit_id)` group has reached the quorum.
    pub fn any_group_at_quorum(&self) -> bool {
        let quorum = self.epoch.quorum_num();
        self.messages.tally().values().any(|n| *n >= quorum)
    }

    /// Open the round: synthesize and store the None and Lazy Data (both are
    /// required so the round can always terminate, even with zero real
    /// proposals), and, if the local node is this round's proposer, build and
    /// broadcast a proposal extending the candidate.
    pub fn round_start(
        &mut self,
        ctx: &mut RoundCtx<'_>,
        candidate_votes: &[Vote],
    ) -> Result<(), ConsensusError> {
        let proposer = self.epoch.get_proposer_id(self.slot.round_num).clone();
        let none = ctx
            .data_factory
            .create_none_data(self.slot.epoch_num, self.slot.round_num, proposer.clone());
        let lazy = ctx
            .data_factory
            .create_lazy_data(self.slot.epoch_num, self.slot.round_num, proposer.clone());
        // Duplicates are fine on a re-start.
        let _ = self.messages.insert_data(none);
        let _ = self.messages.insert_data(lazy);

        if proposer == *ctx.local_id && !self.proposed {
            let prev_votes = self.build_prev_votes(ctx, candidate_votes);
            let data = ctx.data_factory.create_data(
                self.candidate.number + 1,
                self.candidate.id,
                self.slot.epoch_num,
                self.slot.round_num,
                prev_votes,
            );
            ctx.sink
                .raise(Event::deterministic(EventPayload::BroadcastData(
                    data.clone(),
                )));
            // Self-delivery: the proposal re-enters as if received.
            ctx.outbox.push_back(Delivery::Data(data));
        }
        Ok(())
    }

    /// Assemble the `prev_votes` justification for a new proposal: one slot
    /// per voter of the epoch, in epoch order. A voter's recorded vote is
    /// used only if it endorses the candidate under the majority commit
    /// target; divergent or missing votes become Lazy placeholders, so the
    /// justification always has exactly `voters_num` auditable entries.
    fn build_prev_votes(&self, ctx: &RoundCtx<'_>, recorded: &[Vote]) -> Vec<Vote> {
        let usable: Vec<&Vote> = recorded
            .iter()
            .filter(|v| v.data_id == self.candidate.id && v.round_num == self.candidate.round_num)
            .collect();

        let mut counts: HashMap<DataId, usize> = HashMap::new();
        for vote in &usable {
            *counts.entry(vote.commit_id).or_insert(0) += 1;
        }
        let majority = counts
            .into_iter()
            .max_by_key(|(commit_id, n)| (*n, *commit_id))
            .map(|(commit_id, _)| commit_id);

        self.epoch
            .voters()
            .iter()
            .map(|voter| {
                usable
                    .iter()
                    .find(|v| v.voter_id == *voter && Some(v.commit_id) == majority)
                    .map(|v| (*v).clone())
                    .unwrap_or_else(|| {
                        ctx.vote_factory.create_lazy_vote(
                            self.candidate.epoch_num,
                            self.candidate.round_num,
                            voter.clone(),
                        )
                    })
            })
            .collect()
    }

    /// Accept a proposal, recompute the result, and cast this node's single
    /// vote if it has not voted yet.
    pub fn receive_data(
        &mut self,
        ctx: &mut RoundCtx<'_>,
        data: Data,
    ) -> Result<(), ConsensusError> {
        self.messages.insert_data(data.clone())?;
        if data.kind.is_real() && self.epoch.get_proposer_id(self.slot.round_num) == &data.proposer_id
        {
            self.proposed = true;
        }
        self.update(ctx)?;

        if !self.voted && self.result.is_none() {
            let vote = if self.verify_for_vote(ctx, &data) {
                ctx.vote_factory.create_vote(&data, ctx.local_id.clone())
            } else {
                ctx.vote_factory.create_none_vote(
                    self.slot.epoch_num,
                    self.slot.round_num,
                    ctx.local_id.clone(),
                )
            };
            self.cast_vote(ctx, vote);
        }
        Ok(())
    }

    /// Accept a ballot (one per voter, first wins) and recompute the result.
    pub fn receive_vote(
        &mut self,
        ctx: &mut RoundCtx<'_>,
        vote: Vote,
    ) -> Result<(), ConsensusError> {
        self.messages.insert_vote(vote)?;
        self.update(ctx)
    }

    /// No proposal arrived in time: cast the explicit rejection so the round
    /// can still terminate. A no-op once this node has voted or the round has
    /// a result.
    pub fn propose_timeout(&mut self, ctx: &mut RoundCtx<'_>) -> Result<(), ConsensusError> {
        if self.voted || self.result.is_some() {
            return Ok(());
        }
        let vote = ctx.vote_factory.create_none_vote(
            self.slot.epoch_num,
            self.slot.round_num,
            ctx.local_id.clone(),
        );
        self.cast_vote(ctx, vote);
        Ok(())
    }

    /// A proposal is vote-worthy if it is this node's own, or it connects to
    /// the candidate at the next chain height, is not a timeout placeholder,
    /// and passes the application verifier. Any failure means a None vote.
    fn verify_for_vote(&self, ctx: &RoundCtx<'_>, data: &Data) -> bool {
        if data.proposer_id == *ctx.local_id {
            return true;
        }
        data.prev_id == self.candidate.id
            && data.number == self.candidate.number + 1
            && !data.kind.is_lazy()
            && ctx.verifier.verify(data).is_ok()
    }

    fn cast_vote(&mut self, ctx: &mut RoundCtx<'_>, vote: Vote) {
        self.voted = true;
        ctx.sink
            .raise(Event::deterministic(EventPayload::BroadcastVote(
                vote.clone(),
            )));
        // Self-delivery: the vote is counted through the same path as any
        // other voter's.
        ctx.outbox.push_back(Delivery::Vote(vote));
    }

    /// Recompute the result. Monotone: once set, later recomputations are
    /// no-ops.
    pub fn update(&mut self, ctx: &mut RoundCtx<'_>) -> Result<(), ConsensusError> {
        if self.result.is_some() {
            return Ok(());
        }

        let quorum = self.epoch.quorum_num();
        let tally = self.messages.tally();

        let mut lazy_winner: Option<Data> = None;
        let mut winner: Option<Data> = None;
        for data in &self.messages.datas {
            let reached = tally
                .iter()
                .any(|((data_id, _), n)| *data_id == data.id && *n >= quorum);
            if !reached {
                continue;
            }
            if data.kind.is_determinative() {
                winner = Some(data.clone());
                break;
            }
            if lazy_winner.is_none() {
                lazy_winner = Some(data.clone());
            }
        }

        let mut chosen = winner.or(lazy_winner);
        if chosen.is_none() && self.messages.votes.len() == self.epoch.voters_num() {
            // Every voter was heard but nothing reached quorum: resolve to
            // the Lazy Data so the round terminates without agreement.
            chosen = Some(self.lazy_data(ctx));
        }

        match chosen {
            Some(result) => self.complete(ctx, result),
            None => Ok(()),
        }
    }

    fn lazy_data(&self, ctx: &RoundCtx<'_>) -> Data {
        self.messages
            .datas
            .iter()
            .find(|d| d.kind.is_lazy())
            .cloned()
            .unwrap_or_else(|| {
                let proposer = self.epoch.get_proposer_id(self.slot.round_num).clone();
                ctx.data_factory.create_lazy_data(
                    self.slot.epoch_num,
                    self.slot.round_num,
                    proposer,
                )
            })
    }

    /// Set the result and raise the round-end notification, exactly once.
    fn complete(&mut self, ctx: &mut RoundCtx<'_>, result: Data) -> Result<(), ConsensusError> {
        if self.result.is_some() {
            return Err(ConsensusError::AlreadyCompleted);
        }
        let outcome = if result.kind.is_real() {
            RoundOutcome {
                epoch_num: self.slot.epoch_num,
                round_num: self.slot.round_num,
                success: true,
                candidate_id: Some(result.id),
                commit_id: Some(result.prev_id),
            }
        } else {
            RoundOutcome {
                epoch_num: self.slot.epoch_num,
                round_num: self.slot.round_num,
                success: false,
                candidate_id: None,
                commit_id: None,
            }
        };
        self.result = Some(result);
        ctx.sink
            .raise(Event::deterministic(EventPayload::RoundEnded(outcome)));
        Ok(())
    }
}
