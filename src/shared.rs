// Copyright (C) 2026, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

use std::fmt::{self, Debug};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::node::NodeId;
use crate::store::{AddItemError, AddNodeError, FatResponse, MissingNodeError, TrieStore};
use crate::{Item, TrieHash};

/// A cloneable, thread-safe handle to a [`TrieStore`].
///
/// Every public operation acquires the store's mutex for its entire
/// duration and releases it on every exit path, so each operation
/// observes and produces a consistent snapshot. The serialization order
/// of effects is the order of lock acquisitions.
#[derive(Clone)]
pub struct SharedTrieStore {
    store: Arc<Mutex<TrieStore>>,
}

impl SharedTrieStore {
    /// Wrap a store in a shared handle.
    pub fn new(store: TrieStore) -> Self {
        SharedTrieStore {
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// See [`TrieStore::add_item`].
    pub fn add_item(&self, item: Item) -> Result<(), AddItemError> {
        self.store.lock().add_item(item)
    }

    /// See [`TrieStore::set_immutable`].
    pub fn set_immutable(&self) {
        self.store.lock().set_immutable();
    }

    /// See [`TrieStore::is_immutable`].
    pub fn is_immutable(&self) -> bool {
        self.store.lock().is_immutable()
    }

    /// See [`TrieStore::set_syncing`].
    pub fn set_syncing(&self) {
        self.store.lock().set_syncing();
    }

    /// See [`TrieStore::is_syncing`].
    pub fn is_syncing(&self) -> bool {
        self.store.lock().is_syncing()
    }

    /// See [`TrieStore::clear_syncing`].
    pub fn clear_syncing(&self) {
        self.store.lock().clear_syncing();
    }

    /// See [`TrieStore::root_hash`].
    pub fn root_hash(&self) -> TrieHash {
        *self.store.lock().root_hash()
    }

    /// See [`TrieStore::node_count`].
    pub fn node_count(&self) -> usize {
        self.store.lock().node_count()
    }

    /// See [`TrieStore::get_missing_nodes`].
    pub fn get_missing_nodes(&self, max: usize) -> Vec<(NodeId, TrieHash)> {
        self.store.lock().get_missing_nodes(max)
    }

    /// See [`TrieStore::get_node_fat`].
    pub fn get_node_fat(&self, wanted: &NodeId) -> Result<FatResponse, MissingNodeError> {
        self.store.lock().get_node_fat(wanted)
    }

    /// See [`TrieStore::add_root_node`].
    pub fn add_root_node(
        &self,
        blob: &[u8],
        expected: Option<&TrieHash>,
    ) -> Result<(), AddNodeError> {
        self.store.lock().add_root_node(blob, expected)
    }

    /// See [`TrieStore::add_known_node`].
    pub fn add_known_node(&self, id: &NodeId, blob: &[u8]) -> Result<(), AddNodeError> {
        self.store.lock().add_known_node(id, blob)
    }

    /// See [`TrieStore::track_dirty`].
    pub fn track_dirty(&self) {
        self.store.lock().track_dirty();
    }

    /// See [`TrieStore::take_dirty`].
    pub fn take_dirty(&self) -> (Vec<NodeId>, Vec<NodeId>) {
        self.store.lock().take_dirty()
    }

    /// See [`TrieStore::deep_compare`]. Locks both stores, in address
    /// order so that two concurrent compares cannot deadlock.
    pub fn deep_compare(&self, other: &SharedTrieStore) -> bool {
        if Arc::ptr_eq(&self.store, &other.store) {
            return true;
        }
        let swapped = Arc::as_ptr(&self.store) > Arc::as_ptr(&other.store);
        let (first, second) = if swapped {
            (&other.store, &self.store)
        } else {
            (&self.store, &other.store)
        };
        let first = first.lock();
        let second = second.lock();
        if swapped {
            second.deep_compare(&first)
        } else {
            first.deep_compare(&second)
        }
    }
}

impl Default for SharedTrieStore {
    fn default() -> Self {
        SharedTrieStore::new(TrieStore::new())
    }
}

impl Debug for SharedTrieStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self.store.try_lock() {
            Some(store) => write!(f, "Shared{store:?}"),
            None => write!(f, "Shared[TrieStore <locked>]"),
        }
    }
}
