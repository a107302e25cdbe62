// Copyright (C) 2026, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! The request/response synchronization protocol.
//!
//! The destination knows only the expected root digest. It installs the
//! root with [`add_root_node`](TrieStore::add_root_node), then loops:
//! [`get_missing_nodes`](TrieStore::get_missing_nodes) discovers child
//! digests whose nodes are absent, the transport fetches them from a
//! source via [`get_node_fat`](TrieStore::get_node_fat), and each blob is
//! authenticated and spliced in with
//! [`add_known_node`](TrieStore::add_known_node). The session is done when
//! the missing set comes back empty.
//!
//! Every splice is authenticated: a blob is accepted only if its digest
//! equals the digest its resident parent committed to. A transport that
//! drops, reorders, or duplicates responses cannot corrupt the store; at
//! worst the next missing-node scan re-emits the same pair.

use log::{debug, trace};
use thiserror::Error;

use super::TrieStore;
use crate::TrieHash;
use crate::node::{InnerNode, Node, NodeId, WireError};

/// A delivery rejected by [`TrieStore::add_root_node`] or
/// [`TrieStore::add_known_node`].
///
/// Rejections never mutate the store and are not fatal to the session:
/// the transport drops the blob and the next missing-node scan re-drives
/// the request.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AddNodeError {
    /// The blob does not match the digest committed to by its parent, or
    /// disagrees structurally with the id it was delivered for.
    #[error("blob does not match the digest committed to by its parent")]
    Corrupt,
    /// There is no resident parent with an occupied slot for this node,
    /// so it was never requested or the sender is confused.
    #[error("no resident parent with an occupied slot for this node")]
    Unhookable,
    /// The blob cannot be parsed at all.
    #[error("malformed node blob: {0}")]
    BadFormat(#[from] WireError),
}

/// A [`TrieStore::get_node_fat`] lookup miss on the source.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("no node at {0:?}")]
pub struct MissingNodeError(
    /// The id that missed.
    pub NodeId,
);

/// A fat response: the wanted node first, then every immediate child the
/// source had resident.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatResponse {
    /// (id, wire blob) for the wanted node and its resident children.
    pub nodes: Vec<(NodeId, Vec<u8>)>,
    /// True iff every occupied child of the wanted node was resident.
    pub complete: bool,
}

impl TrieStore {
    /// Scan the partial trie for children that are committed to by a
    /// resident parent but absent from the store, returning up to `max`
    /// (id, expected digest) pairs.
    ///
    /// Runs on the destination. As a side effect, an inner node whose
    /// occupied children are all resident (each a leaf or a full-below
    /// inner) is latched full-below and skipped by later scans, keeping
    /// the scan linear in outstanding work rather than in trie size.
    ///
    /// An empty result means the trie is structurally complete.
    pub fn get_missing_nodes(&mut self, max: usize) -> Vec<(NodeId, TrieHash)> {
        let mut wanted = Vec::new();
        if self.root().full_below() {
            trace!("missing-node scan: root is full below");
            return wanted;
        }

        let mut stack = vec![NodeId::ROOT];
        while wanted.len() < max {
            let Some(id) = stack.pop() else { break };
            let (skip, slots) = {
                let node = self
                    .inner_by_id
                    .get(&id)
                    .expect("stacked nodes are resident");
                let slots: Vec<(u8, TrieHash)> =
                    node.children_iter().map(|(b, h)| (b, *h)).collect();
                (node.full_below(), slots)
            };
            if skip {
                continue;
            }

            let mut complete = true;
            for (branch, hash) in slots {
                let child_id = id.child(branch);
                if self.leaf_checked(&child_id, &hash).is_some() {
                    continue;
                }
                match self.inner_checked(&child_id, &hash) {
                    Some(child) if child.full_below() => {}
                    Some(_) => {
                        complete = false;
                        stack.push(child_id);
                    }
                    None => {
                        complete = false;
                        if wanted.len() < max {
                            trace!("missing-node scan: need {child_id:?} = {hash:?}");
                            wanted.push((child_id, hash));
                        }
                    }
                }
            }
            if complete {
                self.inner_by_id
                    .get_mut(&id)
                    .expect("stacked nodes are resident")
                    .set_full_below();
            }
        }
        wanted
    }

    /// Serve a node request, bundling an inner node with every immediate
    /// child the store has resident.
    ///
    /// Runs on the source, which is expected to be immutable; the call is
    /// read-only. `wanted` may be the root id, which is how a destination
    /// bootstraps a session. Absent children make the response partial,
    /// not an error; only a miss on `wanted` itself fails.
    pub fn get_node_fat(&self, wanted: &NodeId) -> Result<FatResponse, MissingNodeError> {
        if !wanted.is_leaf() {
            if let Some(node) = self.inner_by_id.get(wanted) {
                let mut nodes = vec![(*wanted, node.to_wire())];
                let mut complete = true;
                for (branch, hash) in node.children_iter() {
                    let child_id = wanted.child(branch);
                    if let Some(leaf) = self.leaf_checked(&child_id, hash) {
                        nodes.push((child_id, leaf.to_wire()));
                    } else if let Some(inner) = self.inner_checked(&child_id, hash) {
                        nodes.push((child_id, inner.to_wire()));
                    } else {
                        complete = false;
                    }
                }
                return Ok(FatResponse { nodes, complete });
            }
        }

        // A full-depth id, or a shallow slot that resolves to a leaf.
        // There is no fat way to serve a leaf.
        let leaf = self
            .leaf_by_id
            .get(wanted)
            .ok_or(MissingNodeError(*wanted))?;
        Ok(FatResponse {
            nodes: vec![(*wanted, leaf.to_wire())],
            complete: true,
        })
    }

    /// Install the root node of a sync session from its wire blob.
    ///
    /// Runs on the destination, exactly once successfully per session; a
    /// consistent re-delivery is an idempotent success. When `expected`
    /// is supplied it must match the root digest, existing or incoming.
    pub fn add_root_node(
        &mut self,
        blob: &[u8],
        expected: Option<&TrieHash>,
    ) -> Result<(), AddNodeError> {
        if !self.root_hash.is_zero() {
            debug!("root delivery: already have a root");
            if let Some(expected) = expected {
                if expected != &self.root_hash {
                    return Err(AddNodeError::Corrupt);
                }
            }
            if TrieHash::digest(blob) != self.root_hash {
                return Err(AddNodeError::Corrupt);
            }
            return Ok(());
        }

        let node = InnerNode::from_wire(NodeId::ROOT, blob, self.seq)?;
        if let Some(expected) = expected {
            if expected != node.hash() {
                debug!("root delivery: digest {:?} != expected {expected:?}", node.hash());
                return Err(AddNodeError::Corrupt);
            }
        }
        self.root_hash = *node.hash();
        self.mark_dirty_inner(NodeId::ROOT);
        self.inner_by_id.insert(NodeId::ROOT, node);
        debug!("root installed: {:?}", self.root_hash);
        Ok(())
    }

    /// Authenticate a delivered blob against the digest its resident
    /// parent committed to, and splice it into the trie.
    ///
    /// Runs on the destination for every node a fat response returned,
    /// except the root. Late or duplicate delivery of a node already
    /// resident is a success, which is what makes a timing-out transport
    /// self-healing. The parent's digest and full-below flag are left
    /// untouched: the digest already commits to this child, and
    /// full-below is recomputed lazily by the next scan.
    pub fn add_known_node(&mut self, id: &NodeId, blob: &[u8]) -> Result<(), AddNodeError> {
        if id.is_root() {
            debug!("known-node delivery for the root, use add_root_node");
            return Err(AddNodeError::Unhookable);
        }
        if self.leaf_by_id.contains_key(id) || self.inner_by_id.contains_key(id) {
            trace!("late delivery of {id:?}");
            return Ok(());
        }

        let parent_id = self.walk_towards(id);
        if parent_id.depth() + 1 != id.depth() {
            debug!("cannot hook {id:?}: deepest resident parent is {parent_id:?}");
            return Err(AddNodeError::Unhookable);
        }
        let parent = self
            .inner_by_id
            .get(&parent_id)
            .expect("the walk ends on a resident inner");
        let branch = parent_id.select_branch(id.prefix());
        let expected = *parent.child_hash(branch);
        if expected.is_zero() {
            debug!("cannot hook {id:?}: slot {branch:x} of {parent_id:?} is empty");
            return Err(AddNodeError::Unhookable);
        }

        match Node::from_wire(*id, blob, self.seq)? {
            Node::Leaf(leaf) => {
                if leaf.hash() != &expected || !id.is_prefix_of(leaf.item().key()) {
                    debug!("leaf {id:?} fails the consistency check");
                    return Err(AddNodeError::Corrupt);
                }
                self.mark_dirty_leaf(*id);
                self.leaf_by_id.insert(*id, leaf);
            }
            Node::Inner(inner) => {
                if id.is_leaf() || inner.hash() != &expected {
                    debug!("inner {id:?} fails the consistency check");
                    return Err(AddNodeError::Corrupt);
                }
                self.mark_dirty_inner(*id);
                self.inner_by_id.insert(*id, *inner);
            }
        }
        Ok(())
    }

    /// Compare two tries node by node: ids, digests, and the occupancy
    /// pattern of every slot. Both stores must be complete. Diagnostic
    /// use only.
    pub fn deep_compare(&self, other: &TrieStore) -> bool {
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            let (Some(node), Some(other_node)) =
                (self.inner_by_id.get(&id), other.inner_by_id.get(&id))
            else {
                debug!("deep compare: unable to fetch {id:?}");
                return false;
            };
            if node.hash() != other_node.hash() {
                debug!("deep compare: hash mismatch at {id:?}");
                return false;
            }

            for branch in 0..InnerNode::BRANCH_COUNT as u8 {
                let hash = node.child_hash(branch);
                if hash.is_zero() != other_node.child_hash(branch).is_zero() {
                    debug!("deep compare: occupancy mismatch at {id:?} slot {branch:x}");
                    return false;
                }
                if hash.is_zero() {
                    continue;
                }
                let child_id = id.child(branch);
                if self.leaf_checked(&child_id, hash).is_some() {
                    if other.leaf_checked(&child_id, hash).is_none() {
                        debug!("deep compare: unable to fetch leaf {child_id:?}");
                        return false;
                    }
                } else if self.inner_checked(&child_id, hash).is_some() {
                    stack.push(child_id);
                } else {
                    debug!("deep compare: unable to fetch child {child_id:?}");
                    return false;
                }
            }
        }
        true
    }

    /// Descend from the root toward `target`, returning the deepest
    /// resident inner node on the path. Never reaches `target` itself:
    /// the walk stops at depth `target.depth() - 1` at the latest.
    fn walk_towards(&self, target: &NodeId) -> NodeId {
        let mut cur = NodeId::ROOT;
        loop {
            if cur.depth() + 1 >= target.depth() {
                return cur;
            }
            let node = self
                .inner_by_id
                .get(&cur)
                .expect("walked nodes are resident");
            let branch = cur.select_branch(target.prefix());
            if node.is_empty_branch(branch) {
                return cur;
            }
            let child_id = cur.child(branch);
            if !self.inner_by_id.contains_key(&child_id) {
                return cur;
            }
            cur = child_id;
        }
    }
}
