// Copyright (C) 2026, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

use std::fmt::{self, Debug};

/// An opaque keyed value stored at a leaf.
///
/// The key is conventionally the digest of the value, but the trie does not
/// enforce that.
#[derive(Clone, PartialEq, Eq)]
pub struct Item {
    key: [u8; 32],
    value: Vec<u8>,
}

impl Item {
    /// Create an item from its key and serialized value.
    pub const fn new(key: [u8; 32], value: Vec<u8>) -> Self {
        Item { key, value }
    }

    /// The 256-bit key.
    pub const fn key(&self) -> &[u8; 32] {
        &self.key
    }

    /// The value bytes.
    pub fn value(&self) -> &[u8] {
        &self.value
    }
}

impl Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "[Item key={} value={} bytes]",
            hex::encode(self.key),
            self.value.len()
        )
    }
}
