//! Keyed message store with watermark pruning.
//!
//! Messages are retained by key and indexed by their `(epoch, round)` slot in
//! an ordered map, so garbage collection after a candidate change is a range
//! deletion over the slot index rather than a filter over the whole store.

use crate::message::Message;
use lattice_types::Slot;
use std::collections::{BTreeMap, HashMap};

/// Generic id-keyed store for Data or Vote messages.
pub struct MessagePool<M: Message> {
    by_key: HashMap<M::Key, M>,
    /// Slot index for range pruning.
    by_slot: BTreeMap<Slot, Vec<M::Key>>,
}

impl<M: Message> MessagePool<M> {
    pub fn new() -> Self {
        Self {
            by_key: HashMap::new(),
            by_slot: BTreeMap::new(),
        }
    }

    /// Store a message. Returns `false` (and keeps the original) when a
    /// message with the same key is already present.
    pub fn insert(&mut self, message: M) -> bool {
        let key = message.key();
        if self.by_key.contains_key(&key) {
            return false;
        }
        self.by_slot.entry(message.slot()).or_default().push(key);
        self.by_key.insert(key, message);
        true
    }

    pub fn get(&self, key: &M::Key) -> Option<&M> {
        self.by_key.get(key)
    }

    pub fn contains(&self, key: &M::Key) -> bool {
        self.by_key.contains_key(key)
    }

    /// Remove every message strictly older than `watermark`; messages at or
    /// after the watermark are never touched. Returns the removed messages
    /// so wrappers can keep their secondary indexes consistent.
    pub fn prune_below(&mut self, watermark: Slot) -> Vec<M> {
        let stale: Vec<Slot> = self.by_slot.range(..watermark).map(|(s, _)| *s).collect();
        let mut removed = Vec::new();
        for slot in stale {
            if let Some(keys) = self.by_slot.remove(&slot) {
                for key in keys {
                    if let Some(message) = self.by_key.remove(&key) {
                        removed.push(message);
                    }
                }
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &M> {
        self.by_key.values()
    }
}

impl<M: Message> Default for MessagePool<M> {
    fn default() -> Self {
        Self::new()
    }
}
