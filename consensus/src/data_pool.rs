//! Proposal store with a parent-link index.
//!
//! On top of the keyed store, the data pool tracks `prev_id -> children` so
//! the candidate-change cascade can find every buffered proposal that extends
//! a newly agreed candidate without scanning the pool.

use crate::message::Data;
use crate::message_pool::MessagePool;
use lattice_types::{DataId, Slot};
use std::collections::HashMap;

pub struct DataPool {
    pool: MessagePool<Data>,
    /// Parent id -> ids of stored children.
    children: HashMap<DataId, Vec<DataId>>,
}

impl DataPool {
    pub fn new() -> Self {
        Self {
            pool: MessagePool::new(),
            children: HashMap::new(),
        }
    }

    /// Store a proposal. Duplicates (by id) are rejected.
    pub fn insert(&mut self, data: Data) -> bool {
        let id = data.id;
        let prev_id = data.prev_id;
        if !self.pool.insert(data) {
            return false;
        }
        self.children.entry(prev_id).or_default().push(id);
        true
    }

    pub fn get(&self, id: &DataId) -> Option<&Data> {
        self.pool.get(id)
    }

    pub fn contains(&self, id: &DataId) -> bool {
        self.pool.contains(id)
    }

    /// Every stored proposal whose `prev_id` is `parent`.
    pub fn children_of(&self, parent: &DataId) -> Vec<Data> {
        self.children
            .get(parent)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.pool.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Range-prune everything strictly older than `watermark`, keeping the
    /// child index consistent.
    pub fn prune_below(&mut self, watermark: Slot) -> usize {
        let removed = self.pool.prune_below(watermark);
        for data in &removed {
            if let Some(siblings) = self.children.get_mut(&data.prev_id) {
                siblings.retain(|id| *id != data.id);
                if siblings.is_empty() {
                    self.children.remove(&data.prev_id);
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

impl Default for DataPool {
    fn default() -> Self {
        Self::new()
    }
}
