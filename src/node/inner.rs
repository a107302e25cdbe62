// Copyright (C) 2026, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

use std::fmt::{self, Debug};

use crate::TrieHash;
use crate::node::{INNER_TAG, NodeId, WireError};

/// The exact length of an inner blob: tag byte plus 16 32-byte slots.
pub const INNER_BLOB_LEN: usize = 1 + InnerNode::BRANCH_COUNT * 32;

/// An interior node with 16 child slots.
///
/// A slot holds the digest of the child reachable through it, or
/// [`TrieHash::ZERO`] when empty. The node's own digest is recomputed
/// whenever a slot changes, so it always commits to the current children.
#[derive(Clone, PartialEq, Eq)]
pub struct InnerNode {
    id: NodeId,
    children: [TrieHash; InnerNode::BRANCH_COUNT],
    hash: TrieHash,
    full_below: bool,
    seq: u32,
}

impl InnerNode {
    /// The number of child slots in an inner node.
    pub const BRANCH_COUNT: usize = 16;

    /// Create an inner node at `id` with every slot empty.
    pub fn new_empty(id: NodeId, seq: u32) -> Self {
        let mut node = InnerNode {
            id,
            children: [TrieHash::ZERO; InnerNode::BRANCH_COUNT],
            hash: TrieHash::ZERO,
            full_below: false,
            seq,
        };
        node.rehash();
        node
    }

    /// Parse an inner blob received for `id`.
    ///
    /// The blob must be exactly [`INNER_BLOB_LEN`] bytes. The caller
    /// authenticates the digest against the parent's commitment.
    pub fn from_wire(id: NodeId, blob: &[u8], seq: u32) -> Result<Self, WireError> {
        match blob {
            [] => return Err(WireError::Empty),
            [tag, ..] if *tag != INNER_TAG => return Err(WireError::UnknownTag(*tag)),
            other if other.len() != INNER_BLOB_LEN => {
                return Err(WireError::InnerBadLength { len: other.len() });
            }
            _ => {}
        }

        let mut children = [TrieHash::ZERO; InnerNode::BRANCH_COUNT];
        for (slot, bytes) in children.iter_mut().zip(blob[1..].chunks_exact(32)) {
            let mut digest = [0u8; 32];
            digest.copy_from_slice(bytes);
            *slot = digest.into();
        }

        Ok(InnerNode {
            id,
            children,
            hash: TrieHash::digest(blob),
            full_below: false,
            seq,
        })
    }

    /// The canonical wire encoding: tag then each slot, zeros for empty.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut blob = Vec::with_capacity(INNER_BLOB_LEN);
        blob.push(INNER_TAG);
        for slot in &self.children {
            blob.extend_from_slice(slot.as_bytes());
        }
        blob
    }

    /// The address of this node.
    pub const fn id(&self) -> &NodeId {
        &self.id
    }

    /// The content digest, committing to every slot.
    pub const fn hash(&self) -> &TrieHash {
        &self.hash
    }

    /// The digest in slot `branch`, zero when empty.
    pub fn child_hash(&self, branch: u8) -> &TrieHash {
        self.children
            .get(branch as usize)
            .expect("branch is in bounds")
    }

    /// True when slot `branch` is empty.
    pub fn is_empty_branch(&self, branch: u8) -> bool {
        self.child_hash(branch).is_zero()
    }

    /// True when every slot is empty.
    pub fn is_empty(&self) -> bool {
        self.children.iter().all(TrieHash::is_zero)
    }

    /// Replace the digest in slot `branch` and recompute this node's own
    /// digest.
    pub fn update_child(&mut self, branch: u8, hash: TrieHash) {
        let slot = self
            .children
            .get_mut(branch as usize)
            .expect("branch is in bounds");
        *slot = hash;
        self.rehash();
    }

    /// Returns (branch, digest) for each occupied slot.
    pub fn children_iter(&self) -> impl Iterator<Item = (u8, &TrieHash)> + Clone {
        self.children
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.is_zero())
            .map(|(i, slot)| (i as u8, slot))
    }

    /// Whether every node reachable through this one is known to be
    /// resident in the local store.
    pub const fn full_below(&self) -> bool {
        self.full_below
    }

    /// Latch the full-below flag. It never reverts within a sync epoch.
    pub fn set_full_below(&mut self) {
        self.full_below = true;
    }

    /// The sequence tag stamped when the node was created.
    pub const fn seq(&self) -> u32 {
        self.seq
    }

    fn rehash(&mut self) {
        self.hash = TrieHash::digest(&self.to_wire());
    }
}

impl Debug for InnerNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "[Inner {:?} hash={:?}", self.id, self.hash)?;
        for (branch, hash) in self.children_iter() {
            write!(f, " {branch:x}={hash:?}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_node_hashes_its_encoding() {
        let node = InnerNode::new_empty(NodeId::ROOT, 1);
        let mut blob = vec![INNER_TAG];
        blob.extend_from_slice(&[0u8; 512]);
        assert_eq!(node.to_wire(), blob);
        assert_eq!(node.hash(), &TrieHash::digest(&blob));
        assert!(node.is_empty());
    }

    #[test]
    fn update_child_recomputes_hash() {
        let mut node = InnerNode::new_empty(NodeId::ROOT, 1);
        let before = *node.hash();
        node.update_child(7, TrieHash::digest(b"child"));

        assert_ne!(node.hash(), &before);
        assert_eq!(node.hash(), &TrieHash::digest(&node.to_wire()));
        assert!(!node.is_empty_branch(7));
        assert!(node.is_empty_branch(6));
        assert_eq!(node.children_iter().count(), 1);
    }

    #[test]
    fn wire_round_trip() {
        let mut node = InnerNode::new_empty(NodeId::ROOT, 1);
        node.update_child(0, TrieHash::digest(b"a"));
        node.update_child(15, TrieHash::digest(b"b"));

        let parsed = InnerNode::from_wire(NodeId::ROOT, &node.to_wire(), 1).unwrap();
        assert_eq!(parsed.hash(), node.hash());
        assert_eq!(parsed.child_hash(0), node.child_hash(0));
        assert_eq!(parsed.child_hash(15), node.child_hash(15));
        assert!(!parsed.full_below());
    }

    #[test]
    fn bad_lengths_are_rejected() {
        let blob = vec![INNER_TAG; INNER_BLOB_LEN - 1];
        assert_eq!(
            InnerNode::from_wire(NodeId::ROOT, &blob, 1),
            Err(WireError::InnerBadLength {
                len: INNER_BLOB_LEN - 1
            })
        );
        assert_eq!(
            InnerNode::from_wire(NodeId::ROOT, &[], 1),
            Err(WireError::Empty)
        );
        assert_eq!(
            InnerNode::from_wire(NodeId::ROOT, &[0x07], 1),
            Err(WireError::UnknownTag(0x07))
        );
    }
}
