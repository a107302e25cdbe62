// Copyright (C) 2026, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

use std::fmt::{self, Debug};

use crate::node::{LEAF_TAG, NodeId, WireError};
use crate::{Item, TrieHash};

/// The minimum length of a leaf blob: tag byte plus the 32-byte key.
pub const MIN_LEAF_BLOB: usize = 1 + 32;

/// A terminal node holding exactly one item.
///
/// The digest commits to the item alone, so relocating a leaf deeper when a
/// slot is split does not change its digest.
#[derive(Clone, PartialEq, Eq)]
pub struct LeafNode {
    id: NodeId,
    item: Item,
    hash: TrieHash,
    seq: u32,
}

impl LeafNode {
    /// Create a leaf for `item` hanging at `id`.
    pub fn new(id: NodeId, item: Item, seq: u32) -> Self {
        let hash = TrieHash::digest(&wire(&item));
        LeafNode {
            id,
            item,
            hash,
            seq,
        }
    }

    /// Parse a leaf blob received for `id`.
    ///
    /// Only the shape is checked here; the caller authenticates the digest
    /// against the parent's commitment and the id against the key.
    pub fn from_wire(id: NodeId, blob: &[u8], seq: u32) -> Result<Self, WireError> {
        match blob {
            [] => Err(WireError::Empty),
            [tag, ..] if *tag != LEAF_TAG => Err(WireError::UnknownTag(*tag)),
            short if short.len() < MIN_LEAF_BLOB => {
                Err(WireError::LeafTooShort { len: short.len() })
            }
            [_, rest @ ..] => {
                let mut key = [0u8; 32];
                key.copy_from_slice(&rest[..32]);
                let item = Item::new(key, rest[32..].to_vec());
                Ok(LeafNode {
                    id,
                    hash: TrieHash::digest(blob),
                    item,
                    seq,
                })
            }
        }
    }

    /// The canonical wire encoding: tag, key, value.
    pub fn to_wire(&self) -> Vec<u8> {
        wire(&self.item)
    }

    /// The address this leaf hangs at.
    pub const fn id(&self) -> &NodeId {
        &self.id
    }

    /// The content digest.
    pub const fn hash(&self) -> &TrieHash {
        &self.hash
    }

    /// The stored item.
    pub const fn item(&self) -> &Item {
        &self.item
    }

    /// The sequence tag stamped when the leaf was created.
    pub const fn seq(&self) -> u32 {
        self.seq
    }

    /// Consume the leaf and return its item, used when a split relocates
    /// the leaf deeper.
    pub fn into_item(self) -> Item {
        self.item
    }
}

fn wire(item: &Item) -> Vec<u8> {
    let mut blob = Vec::with_capacity(MIN_LEAF_BLOB + item.value().len());
    blob.push(LEAF_TAG);
    blob.extend_from_slice(item.key());
    blob.extend_from_slice(item.value());
    blob
}

impl Debug for LeafNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "[Leaf {:?} {:?} hash={:?}]", self.id, self.item, self.hash)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn item() -> Item {
        let mut key = [0u8; 32];
        key[31] = 1;
        Item::new(key, b"a".to_vec())
    }

    #[test]
    fn wire_round_trip() {
        let leaf = LeafNode::new(NodeId::new(1, item().key()), item(), 1);
        let blob = leaf.to_wire();
        assert_eq!(blob[0], LEAF_TAG);
        assert_eq!(blob.len(), MIN_LEAF_BLOB + 1);

        let parsed = LeafNode::from_wire(*leaf.id(), &blob, 1).unwrap();
        assert_eq!(parsed, leaf);
        assert_eq!(parsed.hash(), &TrieHash::digest(&blob));
    }

    #[test]
    fn digest_ignores_depth() {
        let shallow = LeafNode::new(NodeId::new(1, item().key()), item(), 1);
        let deep = LeafNode::new(NodeId::new(7, item().key()), item(), 1);
        assert_eq!(shallow.hash(), deep.hash());
    }

    #[test]
    fn empty_value_is_legal() {
        let leaf = LeafNode::new(NodeId::new(1, &[0; 32]), Item::new([0; 32], vec![]), 1);
        assert_eq!(leaf.to_wire().len(), MIN_LEAF_BLOB);
        assert!(LeafNode::from_wire(*leaf.id(), &leaf.to_wire(), 1).is_ok());
    }

    #[test]
    fn truncated_blob_is_rejected() {
        let blob = [LEAF_TAG, 0, 1, 2];
        assert_eq!(
            LeafNode::from_wire(NodeId::ROOT, &blob, 1),
            Err(WireError::LeafTooShort { len: 4 })
        );
        assert_eq!(
            LeafNode::from_wire(NodeId::ROOT, &[], 1),
            Err(WireError::Empty)
        );
    }
}
