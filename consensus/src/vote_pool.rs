//! Ballot store with a by-proposal index.
//!
//! Votes are de-duplicated by id. The by-data index answers "which recorded
//! votes endorse this proposal", the lookup a new proposer needs to
//! assemble the `prev_votes` justification for its candidate.

use crate::message::Vote;
use crate::message_pool::MessagePool;
use lattice_types::{DataId, Slot, VoteId};
use std::collections::HashMap;

pub struct VotePool {
    pool: MessagePool<Vote>,
    /// Endorsed data id -> ids of stored votes.
    by_data: HashMap<DataId, Vec<VoteId>>,
}

impl VotePool {
    pub fn new() -> Self {
        Self {
            pool: MessagePool::new(),
            by_data: HashMap::new(),
        }
    }

    /// Store a vote. Duplicates (by id) are rejected.
    pub fn insert(&mut self, vote: Vote) -> bool {
        let id = vote.id;
        let data_id = vote.data_id;
        if !self.pool.insert(vote) {
            return false;
        }
        self.by_data.entry(data_id).or_default().push(id);
        true
    }

    pub fn get(&self, id: &VoteId) -> Option<&Vote> {
        self.pool.get(id)
    }

    pub fn contains(&self, id: &VoteId) -> bool {
        self.pool.contains(id)
    }

    /// Every recorded vote endorsing `data_id`.
    pub fn votes_for_data(&self, data_id: &DataId) -> Vec<Vote> {
        self.by_data
            .get(data_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.pool.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Range-prune everything strictly older than `watermark`.
    pub fn prune_below(&mut self, watermark: Slot) -> usize {
        let removed = self.pool.prune_below(watermark);
        for vote in &removed {
            if let Some(ids) = self.by_data.get_mut(&vote.data_id) {
                ids.retain(|id| *id != vote.id);
                if ids.is_empty() {
                    self.by_data.remove(&vote.data_id);
                }
            }
        }
        removed.len()
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}

impl Default for VotePool {
    fn default() -> Self {
        Self::new()
    }
}
