//! Consensus: the orchestrator over epochs, rounds, and message pools.
//!
//! All input funnels through here: gossip deliveries, timer callbacks, and
//! the node's own proposals and votes (queued on the worklist and re-consumed
//! through the same paths as remote input). The orchestrator enforces the
//! acceptance window, verifies message authorship against the epoch, stores
//! everything in the pools, routes into the owning round, and runs the
//! candidate-change cascade when a routed delivery resolves a round.
//!
//! Error handling is two-tier: protocol rejections (stale slots, wrong
//! proposer, duplicates) are logged at debug and dropped; byzantine or
//! delayed peers must never abort local progress. Invariant violations
//! propagate to the caller.

use crate::data_pool::DataPool;
use crate::election::{Delivery, RoundCtx};
use crate::epoch::Epoch;
use crate::epoch_pool::EpochPool;
use crate::error::ConsensusError;
use crate::event::{EventSink, TimerEvent};
use crate::factory::{DataFactory, DataVerifier, VoteFactory, VoteVerifier};
use crate::message::{Data, Message, Vote};
use crate::round::Round;
use crate::round_pool::RoundPool;
use crate::vote_pool::VotePool;
use lattice_types::{Slot, VoterId};
use std::collections::VecDeque;
use tracing::{debug, error};

pub struct Consensus {
    local_id: VoterId,
    data_factory: Box<dyn DataFactory>,
    vote_factory: Box<dyn VoteFactory>,
    data_verifier: Box<dyn DataVerifier>,
    vote_verifier: Box<dyn VoteVerifier>,
    sink: Box<dyn EventSink>,
    epochs: EpochPool,
    rounds: RoundPool,
    data_pool: DataPool,
    vote_pool: VotePool,
    /// Deliveries awaiting local processing: self-authored messages and
    /// buffered proposals unblocked by a candidate change. Drained
    /// run-to-completion after every entry point; never recursed.
    worklist: VecDeque<Delivery>,
}

impl Consensus {
    pub fn new(
        local_id: VoterId,
        data_factory: Box<dyn DataFactory>,
        vote_factory: Box<dyn VoteFactory>,
        data_verifier: Box<dyn DataVerifier>,
        vote_verifier: Box<dyn VoteVerifier>,
        sink: Box<dyn EventSink>,
    ) -> Self {
        Self {
            local_id,
            data_factory,
            vote_factory,
            data_verifier,
            vote_verifier,
            sink,
            epochs: EpochPool::new(),
            rounds: RoundPool::new(),
            data_pool: DataPool::new(),
            vote_pool: VotePool::new(),
            worklist: VecDeque::new(),
        }
    }

    pub fn local_id(&self) -> &VoterId {
        &self.local_id
    }

    /// Slot of the oldest unresolved-or-failed round; the acceptance
    /// window's lower bound.
    pub fn frontier_slot(&self) -> Option<Slot> {
        self.rounds.first_slot()
    }

    pub fn round(&self, slot: &Slot) -> Option<&Round> {
        self.rounds.get(slot)
    }

    pub fn stored_data(&self) -> usize {
        self.data_pool.len()
    }

    pub fn stored_votes(&self) -> usize {
        self.vote_pool.len()
    }

    /// Bootstrap: register the epoch(s), seed the pools with the agreed
    /// candidate and its justifying votes, and start the given round on it.
    pub fn initialize(
        &mut self,
        prev_epoch: Option<Epoch>,
        epoch: Epoch,
        round_num: u64,
        candidate: Data,
        candidate_votes: Vec<Vote>,
    ) -> Result<(), ConsensusError> {
        if let Some(prev) = prev_epoch {
            self.epochs.register(prev);
        }
        let epoch_num = epoch.num;
        self.epochs.register(epoch);

        self.data_pool.insert(candidate.clone());
        for vote in candidate_votes {
            self.vote_pool.insert(vote);
        }

        self.start_round(Slot::new(epoch_num, round_num), candidate)?;
        self.pump()
    }

    /// External round-start signal (epoch transitions arrive this way).
    /// Stale signals are ignored.
    pub fn round_start(&mut self, epoch: Epoch, round_num: u64) -> Result<(), ConsensusError> {
        let slot = Slot::new(epoch.num, round_num);
        self.epochs.register(epoch);

        if let Some(frontier) = self.rounds.first_slot() {
            if slot < frontier {
                debug!(%slot, %frontier, "stale round start ignored");
                return Ok(());
            }
        }

        let candidate = match self.rounds.get(&slot) {
            Some(round) => round.candidate().clone(),
            None => match self.inherited_candidate() {
                Ok(candidate) => candidate,
                Err(err) => return absorb(Err(err)),
            },
        };
        absorb(self.start_round(slot, candidate))?;
        self.pump()
    }

    /// A proposal arrived (from gossip or the worklist).
    pub fn receive_data(&mut self, data: Data) -> Result<(), ConsensusError> {
        self.worklist.push_back(Delivery::Data(data));
        self.pump()
    }

    /// A ballot arrived (from gossip or the worklist).
    pub fn receive_vote(&mut self, vote: Vote) -> Result<(), ConsensusError> {
        self.worklist.push_back(Delivery::Vote(vote));
        self.pump()
    }

    /// A requested timer fired. Timers for rounds that have since been
    /// pruned are stale and ignored.
    pub fn handle_timeout(&mut self, timer: TimerEvent) -> Result<(), ConsensusError> {
        let slot = timer.slot();
        if !self.rounds.contains(&slot) {
            debug!(%slot, "stale timer ignored");
            return Ok(());
        }
        let routed = match timer {
            TimerEvent::Propose { slot } => {
                self.with_round(slot, |round, ctx| round.handle_propose_timeout(ctx))
            }
            TimerEvent::Vote { slot } => {
                self.with_round(slot, |round, ctx| round.handle_vote_timeout(ctx))
            }
        };
        absorb(routed)?;
        self.pump()
    }

    // ── Worklist ────────────────────────────────────────────────────────

    /// Drain the worklist to completion. The queue bounds the cascade: each
    /// buffered proposal is consumed at most once per delivery, and chained
    /// proposals carry strictly increasing numbers.
    fn pump(&mut self) -> Result<(), ConsensusError> {
        while let Some(delivery) = self.worklist.pop_front() {
            let handled = match delivery {
                Delivery::Data(data) => self.handle_data(data),
                Delivery::Vote(vote) => self.handle_vote(vote),
            };
            absorb(handled)?;
        }
        Ok(())
    }

    fn handle_data(&mut self, data: Data) -> Result<(), ConsensusError> {
        // Proposals are self-justifying: their embedded prev_votes go
        // through ordinary vote handling first and may resolve the round
        // they belong to. Lazy placeholders carry no voter intent and are
        // skipped.
        for vote in data.prev_votes.clone() {
            if vote.kind.is_lazy() {
                continue;
            }
            absorb(self.handle_vote(vote))?;
        }

        if !data.kind.is_real() {
            // None/Lazy data is synthesized locally per round, never
            // accepted off the wire.
            return Err(ConsensusError::InvalidProposer(data.proposer_id));
        }

        let slot = data.slot();
        self.check_window(slot)?;
        let epoch = self
            .epochs
            .get(slot.epoch_num)
            .ok_or(ConsensusError::UnknownEpoch(slot.epoch_num))?
            .clone();
        epoch.verify_data(&data)?;

        self.data_pool.insert(data.clone());
        self.ensure_round(slot)?;

        let round = self
            .rounds
            .get(&slot)
            .ok_or(ConsensusError::InvalidRound)?;
        if data.prev_id != round.candidate_id() {
            // Buffered: stays in the pool until a candidate change makes it
            // relevant (or pruning discards it).
            debug!(%slot, id = ?data.id, "proposal does not extend the current candidate, buffered");
            return Ok(());
        }
        self.with_round(slot, move |round, ctx| round.receive_data(ctx, data))
    }

    fn handle_vote(&mut self, vote: Vote) -> Result<(), ConsensusError> {
        if vote.kind.is_lazy() {
            // Lazy votes are synthesized locally on vote timeout, never
            // accepted off the wire. A forged one would occupy a voter's
            // single ballot slot.
            return Err(ConsensusError::InvalidVoter(vote.voter_id));
        }

        let slot = vote.slot();
        self.check_window(slot)?;
        let epoch = self
            .epochs
            .get(slot.epoch_num)
            .ok_or(ConsensusError::UnknownEpoch(slot.epoch_num))?
            .clone();
        epoch.verify_voter(&vote.voter_id, None)?;
        if let Err(err) = self.vote_verifier.verify(&vote) {
            debug!(%slot, voter = vote.voter_id.as_str(), error = %err, "ballot failed verification");
            return Err(ConsensusError::InvalidVoter(vote.voter_id));
        }

        self.vote_pool.insert(vote.clone());
        self.ensure_round(slot)?;
        self.with_round(slot, move |round, ctx| round.receive_vote(ctx, vote))
    }

    // ── Acceptance window and round creation ────────────────────────────

    /// Reject slots strictly older than the frontier, and anything past the
    /// next epoch boundary (a new epoch always enters at round 0).
    fn check_window(&self, slot: Slot) -> Result<(), ConsensusError> {
        let Some(frontier) = self.rounds.first_slot() else {
            return Err(ConsensusError::InvalidRound);
        };
        if slot.epoch_num < frontier.epoch_num {
            return Err(ConsensusError::InvalidEpoch);
        }
        if slot.epoch_num == frontier.epoch_num && slot.round_num < frontier.round_num {
            return Err(ConsensusError::InvalidRound);
        }
        if slot.epoch_num > frontier.epoch_num + 1 {
            return Err(ConsensusError::InvalidEpoch);
        }
        if slot.epoch_num == frontier.epoch_num + 1 && slot.round_num != 0 {
            return Err(ConsensusError::InvalidEpoch);
        }
        Ok(())
    }

    /// Get-or-create the round for `slot`. Created rounds inherit their
    /// candidate from the frontier and stay unstarted until the chain
    /// reaches them.
    fn ensure_round(&mut self, slot: Slot) -> Result<(), ConsensusError> {
        if self.rounds.contains(&slot) {
            return Ok(());
        }
        let epoch = self
            .epochs
            .get(slot.epoch_num)
            .ok_or(ConsensusError::UnknownEpoch(slot.epoch_num))?
            .clone();
        let candidate = self.inherited_candidate()?;
        self.rounds.insert(Round::new(epoch, slot, candidate));
        Ok(())
    }

    /// The candidate a new round extends: the frontier's Real result if it
    /// has one, else the frontier's own candidate. Must be resolvable in the
    /// data pool; a dangling candidate id is an invariant violation.
    fn inherited_candidate(&self) -> Result<Data, ConsensusError> {
        let frontier = self.rounds.first().ok_or(ConsensusError::InvalidRound)?;
        let candidate_id = match frontier.result() {
            Some(result) if result.kind.is_real() => result.id,
            _ => frontier.candidate_id(),
        };
        self.data_pool
            .get(&candidate_id)
            .cloned()
            .ok_or(ConsensusError::DataIdNotFound(candidate_id))
    }

    /// Get-or-create the round for `slot` on `candidate` and start it
    /// (arming the propose timeout and, if the local node is the proposer,
    /// broadcasting a proposal).
    fn start_round(&mut self, slot: Slot, candidate: Data) -> Result<(), ConsensusError> {
        if !self.rounds.contains(&slot) {
            let epoch = self
                .epochs
                .get(slot.epoch_num)
                .ok_or(ConsensusError::UnknownEpoch(slot.epoch_num))?
                .clone();
            self.rounds
                .insert(Round::new(epoch, slot, candidate.clone()));
        }
        let candidate_votes = self.vote_pool.votes_for_data(&candidate.id);
        self.with_round(slot, move |round, ctx| round.start(ctx, &candidate_votes))
    }

    // ── Routing and the candidate-change cascade ────────────────────────

    /// Run `f` against the round at `slot` with a delivery context, then
    /// fire the cascade if the call resolved the round.
    fn with_round<F>(&mut self, slot: Slot, f: F) -> Result<(), ConsensusError>
    where
        F: FnOnce(&mut Round, &mut RoundCtx<'_>) -> Result<(), ConsensusError>,
    {
        let Self {
            local_id,
            data_factory,
            vote_factory,
            data_verifier,
            sink,
            rounds,
            worklist,
            ..
        } = self;
        let round = rounds.get_mut(&slot).ok_or(ConsensusError::InvalidRound)?;
        let before = round.result_id();
        let mut ctx = RoundCtx {
            local_id,
            data_factory: data_factory.as_ref(),
            vote_factory: vote_factory.as_ref(),
            verifier: data_verifier.as_ref(),
            sink: sink.as_mut(),
            outbox: worklist,
        };
        f(&mut *round, &mut ctx)?;
        let resolved = before.is_none() && round.result_id().is_some();

        if resolved {
            self.on_round_resolved(slot)?;
        }
        Ok(())
    }

    /// The round at `slot` just got its result.
    ///
    /// A Real result `C` settles everything up to `slot`: garbage-collect
    /// epochs, rounds, and committed history; re-point every pending later
    /// round at `C`; re-deliver buffered proposals extending `C`; start the
    /// next round on `C`. A None/Lazy result only opens the next round, with
    /// the candidate unchanged, so the failed round stays as the frontier.
    fn on_round_resolved(&mut self, slot: Slot) -> Result<(), ConsensusError> {
        let round = self.rounds.get(&slot).ok_or(ConsensusError::InvalidRound)?;
        let Some(result) = round.result().cloned() else {
            return Ok(());
        };

        if result.kind.is_real() {
            self.epochs.prune_below(slot.epoch_num.saturating_sub(1));
            self.rounds.prune_through(slot);
            self.rounds.set_candidate_after(slot, &result);

            // The result's parent is now committed; everything strictly
            // older than it is settled history.
            let committed = self
                .data_pool
                .get(&result.prev_id)
                .cloned()
                .ok_or(ConsensusError::DataIdNotFound(result.prev_id))?;
            self.data_pool.prune_below(committed.slot());
            self.vote_pool.prune_below(committed.slot());

            for child in self.data_pool.children_of(&result.id) {
                self.worklist.push_back(Delivery::Data(child));
            }
            self.start_round(slot.next_round(), result)
        } else {
            debug!(%slot, "round failed, next round keeps the candidate");
            let candidate = self
                .rounds
                .get(&slot)
                .ok_or(ConsensusError::InvalidRound)?
                .candidate()
                .clone();
            self.start_round(slot.next_round(), candidate)
        }
    }
}

/// Boundary classifier: swallow protocol rejections (debug-logged),
/// propagate invariant violations (error-logged).
fn absorb(result: Result<(), ConsensusError>) -> Result<(), ConsensusError> {
    match result {
        Ok(()) => Ok(()),
        Err(err) if err.is_rejection() => {
            debug!(error = %err, "message dropped");
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "consensus invariant violated");
            Err(err)
        }
    }
}
