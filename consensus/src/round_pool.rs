//! Active rounds, ordered by slot.
//!
//! The first entry is the frontier: the oldest round still without a Real
//! resolution. A Real resolution at some slot prunes every round up to and
//! including it and re-points the candidates of the survivors.

use crate::message::Data;
use crate::round::Round;
use lattice_types::Slot;
use std::collections::BTreeMap;

#[derive(Default)]
pub struct RoundPool {
    rounds: BTreeMap<Slot, Round>,
}

impl RoundPool {
    pub fn new() -> Self {
        Self {
            rounds: BTreeMap::new(),
        }
    }

    /// Slot of the oldest retained round.
    pub fn first_slot(&self) -> Option<Slot> {
        self.rounds.keys().next().copied()
    }

    pub fn first(&self) -> Option<&Round> {
        self.rounds.values().next()
    }

    pub fn get(&self, slot: &Slot) -> Option<&Round> {
        self.rounds.get(slot)
    }

    pub fn get_mut(&mut self, slot: &Slot) -> Option<&mut Round> {
        self.rounds.get_mut(slot)
    }

    pub fn contains(&self, slot: &Slot) -> bool {
        self.rounds.contains_key(slot)
    }

    pub fn insert(&mut self, round: Round) {
        self.rounds.insert(round.slot(), round);
    }

    /// Drop every round at or before `slot`. Used when a Real resolution at
    /// `slot` settles everything up to it, failed rounds included.
    pub fn prune_through(&mut self, slot: Slot) -> usize {
        let keep = self.rounds.split_off(&slot.next_round());
        let removed = self.rounds.len();
        self.rounds = keep;
        removed
    }

    /// Re-point the candidate of every round after `slot` at `candidate`.
    /// Rounds that already resolved keep their result.
    pub fn set_candidate_after(&mut self, slot: Slot, candidate: &Data) {
        for round in self.rounds.range_mut(slot.next_round()..).map(|(_, r)| r) {
            round.set_candidate(candidate.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }
}
