// Copyright (C) 2026, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.
#![warn(missing_debug_implementations, rust_2018_idioms, missing_docs)]
#![forbid(unsafe_code)]

//! # trie-sync: a content-addressed radix-16 Merkle trie synchronizer
//!
//! Every node in the trie is identified by the half-SHA-512 digest of its
//! wire encoding, and an inner node's digest commits to the digests of its
//! 16 children, so the root digest authenticates the whole map.
//!
//! A [`TrieStore`] holds the nodes. A *source* builds the trie with
//! [`TrieStore::add_item`] and latches it immutable; a *destination*
//! starts empty, knowing only the expected root digest, and pulls the trie
//! over an unreliable request/response transport:
//!
//! 1. install the root with [`TrieStore::add_root_node`];
//! 2. call [`TrieStore::get_missing_nodes`] to learn which committed
//!    children are absent;
//! 3. fetch them from the source with [`TrieStore::get_node_fat`], which
//!    bundles a node with its resident children;
//! 4. splice each blob in with [`TrieStore::add_known_node`], which
//!    verifies it against the digest its parent committed to;
//! 5. repeat until the missing set is empty.
//!
//! Lost, duplicated, or reordered responses are harmless: duplicates are
//! accepted silently and anything lost is re-emitted by the next scan.
//! [`SharedTrieStore`] wraps a store behind a mutex so a transport and
//! readers can drive it from several threads.

mod item;
mod node;
mod shared;
mod store;
mod trie_hash;

pub use item::Item;
pub use node::{
    INNER_BLOB_LEN, INNER_TAG, InnerNode, LEAF_TAG, LeafNode, MAX_DEPTH, MIN_LEAF_BLOB, Node,
    NodeId, WireError,
};
pub use shared::SharedTrieStore;
pub use store::{AddItemError, AddNodeError, FatResponse, MissingNodeError, TrieStore};
pub use trie_hash::TrieHash;
