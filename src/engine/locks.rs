//! Per-entity exclusive scopes.
//!
//! An action holds every key it may write for the whole of evaluate-then-
//! commit. A set of keys is taken all at once or not at all, so two actions
//! can never each hold half of what the other needs.

use std::collections::{BTreeSet, HashSet};

use parking_lot::{Condvar, Mutex};

use crate::model::EntityKey;

#[derive(Debug, Default)]
pub struct LockTable {
    held: Mutex<HashSet<EntityKey>>,
    released: Condvar,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until none of `keys` is held, then hold all of them.
    pub fn acquire(&self, keys: BTreeSet<EntityKey>) -> LockSet<'_> {
        let mut held = self.held.lock();
        while keys.iter().any(|k| held.contains(k)) {
            self.released.wait(&mut held);
        }
        held.extend(keys.iter().cloned());
        LockSet { table: self, keys }
    }

    /// Number of keys currently held across all holders.
    pub fn held_count(&self) -> usize {
        self.held.lock().len()
    }
}

/// Keys held by one action; released on drop.
#[derive(Debug)]
pub struct LockSet<'a> {
    table: &'a LockTable,
    keys: BTreeSet<EntityKey>,
}

impl LockSet<'_> {
    pub fn covers(&self, keys: &BTreeSet<EntityKey>) -> bool {
        self.keys.is_superset(keys)
    }
}

impl Drop for LockSet<'_> {
    fn drop(&mut self) {
        let mut held = self.table.held.lock();
        for key in &self.keys {
            held.remove(key);
        }
        drop(held);
        self.table.released.notify_all();
    }
}
