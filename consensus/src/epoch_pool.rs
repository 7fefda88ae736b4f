//! Registered epochs, keyed by number.
//!
//! Only the current epoch and its predecessor matter to the agreement loop:
//! late messages from the previous epoch may still resolve rounds there, but
//! anything older is unconditionally stale.

use crate::epoch::Epoch;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Default)]
pub struct EpochPool {
    epochs: BTreeMap<u64, Arc<Epoch>>,
}

impl EpochPool {
    pub fn new() -> Self {
        Self {
            epochs: BTreeMap::new(),
        }
    }

    /// Register an epoch. Re-registering a number keeps the original.
    pub fn register(&mut self, epoch: Epoch) -> Arc<Epoch> {
        self.epochs
            .entry(epoch.num)
            .or_insert_with(|| Arc::new(epoch))
            .clone()
    }

    pub fn get(&self, num: u64) -> Option<&Arc<Epoch>> {
        self.epochs.get(&num)
    }

    pub fn contains(&self, num: u64) -> bool {
        self.epochs.contains_key(&num)
    }

    pub fn latest_num(&self) -> Option<u64> {
        self.epochs.keys().next_back().copied()
    }

    /// Drop every epoch older than `num`. Callers pass `current - 1` so the
    /// previous epoch stays addressable.
    pub fn prune_below(&mut self, num: u64) -> usize {
        let keep = self.epochs.split_off(&num);
        let removed = self.epochs.len();
        self.epochs = keep;
        removed
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }
}
