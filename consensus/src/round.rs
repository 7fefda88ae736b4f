//! Round: the per-`(epoch, round)` acceptance shell around an Election.
//!
//! The round filters input by slot, forwards accepted messages to its
//! election, and owns the two timeout escalations: a propose timeout that
//! lets the node vote None when no proposal arrives, and a vote timeout that
//! synthesizes Lazy votes for absent voters once quorum-many voters were
//! heard without any group reaching quorum consensus.
//!
//! Stale timeouts are harmless: every entry point is a no-op once the round
//! has a result, and slot filters reject messages for rounds that have moved
//! past.

use crate::election::{Election, RoundCtx};
use crate::epoch::Epoch;
use crate::error::ConsensusError;
use crate::event::{TimerEvent, TIMEOUT_PROPOSE, TIMEOUT_VOTE};
use crate::message::{Data, Vote};
use lattice_types::{DataId, Slot, VoterId};
use std::sync::Arc;

pub struct Round {
    epoch: Arc<Epoch>,
    slot: Slot,
    election: Election,
    started: bool,
    vote_timeout_armed: bool,
}

impl Round {
    /// Create a round extending `candidate`. Rounds are created lazily, when
    /// a message first references their slot; [`start`](Round::start) runs
    /// separately.
    pub fn new(epoch: Arc<Epoch>, slot: Slot, candidate: Data) -> Self {
        let election = Election::new(epoch.clone(), slot, candidate);
        Self {
            epoch,
            slot,
            election,
            started: false,
            vote_timeout_armed: false,
        }
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn epoch(&self) -> &Arc<Epoch> {
        &self.epoch
    }

    pub fn candidate(&self) -> &Data {
        self.election.candidate()
    }

    pub fn candidate_id(&self) -> DataId {
        self.election.candidate().id
    }

    pub fn set_candidate(&mut self, candidate: Data) {
        self.election.set_candidate(candidate);
    }

    pub fn result(&self) -> Option<&Data> {
        self.election.result()
    }

    pub fn result_id(&self) -> Option<DataId> {
        self.election.result_id()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn has_vote_from(&self, voter: &VoterId) -> bool {
        self.election.has_vote_from(voter)
    }

    /// Open the round: run the election's start (None/Lazy data, possibly a
    /// proposal) and arm the propose timeout.
    pub fn start(
        &mut self,
        ctx: &mut RoundCtx<'_>,
        candidate_votes: &[Vote],
    ) -> Result<(), ConsensusError> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        self.election.round_start(ctx, candidate_votes)?;
        ctx.sink
            .schedule(TIMEOUT_PROPOSE, TimerEvent::Propose { slot: self.slot });
        Ok(())
    }

    /// Accept a proposal for this slot and re-tally any votes that arrived
    /// before it.
    pub fn receive_data(
        &mut self,
        ctx: &mut RoundCtx<'_>,
        data: Data,
    ) -> Result<(), ConsensusError> {
        self.check_slot(data.epoch_num, data.round_num)?;
        self.election.receive_data(ctx, data)
    }

    /// Accept a ballot for this slot; afterwards decide whether the round is
    /// deadlocked enough to arm the vote timeout.
    pub fn receive_vote(
        &mut self,
        ctx: &mut RoundCtx<'_>,
        vote: Vote,
    ) -> Result<(), ConsensusError> {
        self.check_slot(vote.epoch_num, vote.round_num)?;
        self.election.receive_vote(ctx, vote)?;
        self.maybe_arm_vote_timeout(ctx);
        Ok(())
    }

    /// No proposal within `TIMEOUT_PROPOSE`: vote None so the round can end.
    pub fn handle_propose_timeout(&mut self, ctx: &mut RoundCtx<'_>) -> Result<(), ConsensusError> {
        self.election.propose_timeout(ctx)
    }

    /// No quorum consensus within `TIMEOUT_VOTE` of deadlock detection:
    /// synthesize a Lazy vote for every voter not yet heard from. These are
    /// local placeholders, never gossiped.
    pub fn handle_vote_timeout(&mut self, ctx: &mut RoundCtx<'_>) -> Result<(), ConsensusError> {
        if self.election.result().is_some() {
            return Ok(());
        }
        for voter in self.election.absent_voters() {
            let lazy = ctx.vote_factory.create_lazy_vote(
                self.slot.epoch_num,
                self.slot.round_num,
                voter,
            );
            self.election.receive_vote(ctx, lazy)?;
            if self.election.result().is_some() {
                break;
            }
        }
        Ok(())
    }

    /// Quorum-many distinct voters without any group at quorum means the
    /// votes are split; arm the escalation once.
    fn maybe_arm_vote_timeout(&mut self, ctx: &mut RoundCtx<'_>) {
        if self.vote_timeout_armed || self.election.result().is_some() {
            return;
        }
        if self.election.distinct_voters() >= self.epoch.quorum_num()
            && !self.election.any_group_at_quorum()
        {
            ctx.sink
                .schedule(TIMEOUT_VOTE, TimerEvent::Vote { slot: self.slot });
            self.vote_timeout_armed = true;
        }
    }

    fn check_slot(&self, epoch_num: u64, round_num: u64) -> Result<(), ConsensusError> {
        if epoch_num != self.slot.epoch_num {
            return Err(ConsensusError::InvalidEpoch);
        }
        if round_num != self.slot.round_num {
            return Err(ConsensusError::InvalidRound);
        }
        Ok(())
    }
}
