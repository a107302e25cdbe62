// Copyright (C) 2026, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

use std::fmt::{self, Debug};

use sha2::{Digest, Sha512};

/// A 256-bit digest identifying a trie node by its content.
///
/// The digest of a node is the first 32 bytes of the SHA-512 of its wire
/// encoding. The all-zero value is reserved: it encodes an empty child slot
/// and is never the digest of a real node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrieHash([u8; 32]);

impl TrieHash {
    /// The reserved all-zero value used for empty child slots.
    pub const ZERO: TrieHash = TrieHash([0; 32]);

    /// Return the length of a `TrieHash` in bytes.
    pub const fn len() -> usize {
        32
    }

    /// Digest of a node's canonical wire encoding: half-SHA-512.
    pub fn digest(blob: &[u8]) -> TrieHash {
        let full = Sha512::digest(blob);
        let mut out = [0u8; 32];
        out.copy_from_slice(&full[..32]);
        TrieHash(out)
    }

    /// True for the reserved empty-slot value.
    pub fn is_zero(&self) -> bool {
        self.0 == [0; 32]
    }

    /// The raw digest bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Debug for TrieHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl From<[u8; 32]> for TrieHash {
    fn from(value: [u8; 32]) -> Self {
        TrieHash(value)
    }
}

impl AsRef<[u8]> for TrieHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
