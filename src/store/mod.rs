// Copyright (C) 2026, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! The trie store: owns every node, drives mutation on the source side and
//! the sync protocol on the destination side.

use std::collections::{BTreeSet, HashMap};
use std::fmt::{self, Debug};

use thiserror::Error;

use crate::node::{InnerNode, LeafNode, NodeId, nibble_at};
use crate::{Item, TrieHash};

mod sync;

pub use sync::{AddNodeError, FatResponse, MissingNodeError};

/// A mutation rejected by [`TrieStore::add_item`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AddItemError {
    /// The key is already present in the trie.
    #[error("key is already present")]
    DuplicateKey,
    /// The store has been latched immutable.
    #[error("the store is immutable")]
    Immutable,
}

/// A radix-16 Merkle trie with by-id node indices.
///
/// The indices own every node, the root included; child slots refer to
/// children by digest and ids are value types, so the structure is a DAG
/// with no back-pointers. The store is either a *source* (built up with
/// [`add_item`](TrieStore::add_item) and then latched immutable) or a
/// *destination* (put into sync mode and populated from authenticated
/// blobs); the same type serves both roles.
pub struct TrieStore {
    inner_by_id: HashMap<NodeId, InnerNode>,
    leaf_by_id: HashMap<NodeId, LeafNode>,
    /// The store's view of the root digest. Zero only on a destination
    /// that has not yet installed an authenticated root.
    root_hash: TrieHash,
    seq: u32,
    dirty_inner: Option<BTreeSet<NodeId>>,
    dirty_leaf: Option<BTreeSet<NodeId>>,
    syncing: bool,
    immutable: bool,
}

impl TrieStore {
    /// Create an empty mutable store whose root is the empty inner node.
    pub fn new() -> Self {
        let root = InnerNode::new_empty(NodeId::ROOT, 1);
        let root_hash = *root.hash();
        let mut inner_by_id = HashMap::new();
        inner_by_id.insert(NodeId::ROOT, root);
        TrieStore {
            inner_by_id,
            leaf_by_id: HashMap::new(),
            root_hash,
            seq: 1,
            dirty_inner: None,
            dirty_leaf: None,
            syncing: false,
            immutable: false,
        }
    }

    /// The root inner node.
    pub fn root(&self) -> &InnerNode {
        self.inner_by_id
            .get(&NodeId::ROOT)
            .expect("the root is always resident")
    }

    /// The store's root digest: zero on a destination awaiting
    /// [`add_root_node`](TrieStore::add_root_node), otherwise the root
    /// node's content digest.
    pub const fn root_hash(&self) -> &TrieHash {
        &self.root_hash
    }

    /// The total number of resident nodes, inner and leaf.
    pub fn node_count(&self) -> usize {
        self.inner_by_id.len() + self.leaf_by_id.len()
    }

    /// The current sequence tag stamped onto newly created nodes.
    pub const fn seq(&self) -> u32 {
        self.seq
    }

    /// Latch the store immutable; all later mutation fails.
    pub fn set_immutable(&mut self) {
        self.immutable = true;
    }

    /// Whether the store has been latched immutable.
    pub const fn is_immutable(&self) -> bool {
        self.immutable
    }

    /// Enter sync mode. On a store holding no items this also resets the
    /// root digest to the zero placeholder so that an authenticated root
    /// can be installed.
    pub fn set_syncing(&mut self) {
        self.syncing = true;
        if self.leaf_by_id.is_empty() && self.root().is_empty() {
            self.root_hash = TrieHash::ZERO;
        }
    }

    /// Leave sync mode.
    pub fn clear_syncing(&mut self) {
        self.syncing = false;
    }

    /// Whether the store is in sync mode.
    pub const fn is_syncing(&self) -> bool {
        self.syncing
    }

    /// Start collecting the ids of newly materialized nodes for a
    /// persistence layer.
    pub fn track_dirty(&mut self) {
        self.dirty_inner.get_or_insert_with(BTreeSet::new);
        self.dirty_leaf.get_or_insert_with(BTreeSet::new);
    }

    /// Drain the collected (inner, leaf) dirty ids. Collection stays
    /// enabled.
    pub fn take_dirty(&mut self) -> (Vec<NodeId>, Vec<NodeId>) {
        let drain = |set: &mut Option<BTreeSet<NodeId>>| {
            set.as_mut()
                .map(|s| std::mem::take(s).into_iter().collect())
                .unwrap_or_default()
        };
        (drain(&mut self.dirty_inner), drain(&mut self.dirty_leaf))
    }

    /// Insert `item` at the unique position determined by its key,
    /// creating or extending inner nodes along the path and recomputing
    /// digests bottom-up.
    pub fn add_item(&mut self, item: Item) -> Result<(), AddItemError> {
        if self.immutable {
            return Err(AddItemError::Immutable);
        }
        let key = *item.key();

        // Record the branch taken at each resident inner node on the way
        // down; digests propagate back up this path afterwards.
        let mut path: Vec<(NodeId, u8)> = Vec::new();
        let mut cur = NodeId::ROOT;
        let mut child_hash;

        loop {
            let node = self
                .inner_by_id
                .get(&cur)
                .expect("path nodes are resident");
            let branch = cur.select_branch(&key);
            let child_id = cur.child(branch);
            path.push((cur, branch));

            if node.is_empty_branch(branch) {
                let leaf = LeafNode::new(child_id, item, self.seq);
                child_hash = *leaf.hash();
                self.leaf_by_id.insert(child_id, leaf);
                self.mark_dirty_leaf(child_id);
                break;
            }
            if self.inner_by_id.contains_key(&child_id) {
                cur = child_id;
                continue;
            }

            // The slot resolves to a leaf. The same key is a duplicate;
            // otherwise split the slot by descending until the two keys
            // diverge.
            let resident = self
                .leaf_by_id
                .get(&child_id)
                .expect("an occupied slot resolves to a resident node");
            if resident.item().key() == &key {
                return Err(AddItemError::DuplicateKey);
            }
            let displaced = self
                .leaf_by_id
                .remove(&child_id)
                .expect("an occupied slot resolves to a resident node");
            let old_key = *displaced.item().key();

            let mut diverge = child_id.depth();
            while nibble_at(&key, diverge) == nibble_at(&old_key, diverge) {
                diverge += 1;
            }

            let new_leaf = LeafNode::new(NodeId::new(diverge + 1, &key), item, self.seq);
            let moved = LeafNode::new(
                NodeId::new(diverge + 1, &old_key),
                displaced.into_item(),
                self.seq,
            );

            let mut bottom = InnerNode::new_empty(NodeId::new(diverge, &key), self.seq);
            bottom.update_child(nibble_at(&key, diverge), *new_leaf.hash());
            bottom.update_child(nibble_at(&old_key, diverge), *moved.hash());
            child_hash = *bottom.hash();

            self.mark_dirty_leaf(*new_leaf.id());
            self.mark_dirty_leaf(*moved.id());
            self.leaf_by_id.insert(*new_leaf.id(), new_leaf);
            self.leaf_by_id.insert(*moved.id(), moved);
            self.mark_dirty_inner(*bottom.id());
            self.inner_by_id.insert(*bottom.id(), bottom);

            // Single-slot inner nodes over the shared nibbles, bottom up.
            for depth in (child_id.depth()..diverge).rev() {
                let mut link = InnerNode::new_empty(NodeId::new(depth, &key), self.seq);
                link.update_child(nibble_at(&key, depth), child_hash);
                child_hash = *link.hash();
                self.mark_dirty_inner(*link.id());
                self.inner_by_id.insert(*link.id(), link);
            }
            break;
        }

        // Propagate the new digests back to the root.
        for (id, branch) in path.into_iter().rev() {
            let node = self
                .inner_by_id
                .get_mut(&id)
                .expect("path nodes are resident");
            node.update_child(branch, child_hash);
            child_hash = *node.hash();
            self.mark_dirty_inner(id);
        }
        self.root_hash = child_hash;
        Ok(())
    }

    /// Look up an inner node, treating a cached node whose digest differs
    /// from `expected` as absent.
    fn inner_checked(&self, id: &NodeId, expected: &TrieHash) -> Option<&InnerNode> {
        self.inner_by_id.get(id).filter(|node| node.hash() == expected)
    }

    /// Look up a leaf, treating a cached leaf whose digest differs from
    /// `expected` as absent.
    fn leaf_checked(&self, id: &NodeId, expected: &TrieHash) -> Option<&LeafNode> {
        self.leaf_by_id.get(id).filter(|leaf| leaf.hash() == expected)
    }

    fn mark_dirty_inner(&mut self, id: NodeId) {
        if let Some(dirty) = self.dirty_inner.as_mut() {
            dirty.insert(id);
        }
    }

    fn mark_dirty_leaf(&mut self, id: NodeId) {
        if let Some(dirty) = self.dirty_leaf.as_mut() {
            dirty.insert(id);
        }
    }
}

impl Default for TrieStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for TrieStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "[TrieStore root={:?} inner={} leaves={} seq={} syncing={} immutable={}]",
            self.root_hash,
            self.inner_by_id.len(),
            self.leaf_by_id.len(),
            self.seq,
            self.syncing,
            self.immutable,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn key(bytes: &[u8]) -> [u8; 32] {
        let mut k = [0u8; 32];
        k[..bytes.len()].copy_from_slice(bytes);
        k
    }

    fn item(bytes: &[u8]) -> Item {
        Item::new(key(bytes), bytes.to_vec())
    }

    #[test]
    fn empty_store_root_digest() {
        let store = TrieStore::new();
        let mut blob = vec![crate::node::INNER_TAG];
        blob.extend_from_slice(&[0u8; 512]);
        assert_eq!(store.root_hash(), &TrieHash::digest(&blob));
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn single_item_hangs_under_the_root() {
        let mut store = TrieStore::new();
        store.add_item(item(&[0xab])).unwrap();

        assert_eq!(store.node_count(), 2);
        let root = store.root();
        assert!(!root.is_empty_branch(0xa));
        assert_eq!(root.children_iter().count(), 1);
        assert_eq!(store.root_hash(), root.hash());
    }

    #[test]
    fn diverging_keys_split_into_a_chain() {
        let mut store = TrieStore::new();
        // Shared prefix of three nibbles, diverging on the fourth.
        store.add_item(item(&[0xab, 0xc1])).unwrap();
        store.add_item(item(&[0xab, 0xc2])).unwrap();

        // root, three chain inners (depths 1..=3), two leaves at depth 4
        assert_eq!(store.node_count(), 6);
        assert_eq!(store.root().children_iter().count(), 1);
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let mut store = TrieStore::new();
        store.add_item(item(&[1])).unwrap();
        let before = *store.root_hash();
        assert_eq!(
            store.add_item(item(&[1])),
            Err(AddItemError::DuplicateKey)
        );
        assert_eq!(store.root_hash(), &before);
    }

    #[test]
    fn immutable_store_rejects_mutation() {
        let mut store = TrieStore::new();
        store.add_item(item(&[1])).unwrap();
        store.set_immutable();
        assert_eq!(store.add_item(item(&[2])), Err(AddItemError::Immutable));
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let items = [item(&[0x00]), item(&[0x01]), item(&[0xab, 0xc1]), item(&[0xab, 0xc2]), item(&[0xff])];

        let mut forward = TrieStore::new();
        for it in items.iter().cloned() {
            forward.add_item(it).unwrap();
        }
        let mut backward = TrieStore::new();
        for it in items.iter().rev().cloned() {
            backward.add_item(it).unwrap();
        }

        assert_eq!(forward.root_hash(), backward.root_hash());
        assert!(forward.deep_compare(&backward));
    }

    #[test]
    fn set_syncing_resets_only_an_empty_store() {
        let mut empty = TrieStore::new();
        empty.set_syncing();
        assert!(empty.root_hash().is_zero());

        let mut populated = TrieStore::new();
        populated.add_item(item(&[1])).unwrap();
        let before = *populated.root_hash();
        populated.set_syncing();
        assert_eq!(populated.root_hash(), &before);
    }

    #[test]
    fn dirty_sets_record_new_nodes() {
        let mut store = TrieStore::new();
        store.track_dirty();
        store.add_item(item(&[0xab])).unwrap();

        let (inner, leaves) = store.take_dirty();
        assert_eq!(inner, vec![NodeId::ROOT]);
        assert_eq!(leaves.len(), 1);

        // drained, but still tracking
        let (inner, leaves) = store.take_dirty();
        assert!(inner.is_empty() && leaves.is_empty());
        store.add_item(item(&[0xcd])).unwrap();
        let (inner, leaves) = store.take_dirty();
        assert_eq!(inner, vec![NodeId::ROOT]);
        assert_eq!(leaves.len(), 1);
    }
}
