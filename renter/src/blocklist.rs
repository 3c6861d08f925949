// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crypto::{blake2b_256, Hash256};
use log::info;
use parking_lot::RwLock;
use std::collections::HashSet;

/// Merkle roots this node refuses to serve or upload. Roots are stored
/// hashed so the list itself never enumerates the blocked content.
/// Read-mostly; updates take the write lock briefly.
#[derive(Default)]
pub struct Blocklist {
    hashes: RwLock<HashSet<Hash256>>,
}

impl Blocklist {
    pub fn new() -> Self {
        Blocklist::default()
    }

    fn hash_root(root: &Hash256) -> Hash256 {
        blake2b_256(root.as_ref())
    }

    pub fn is_blocked(&self, root: &Hash256) -> bool {
        self.hashes.read().contains(&Self::hash_root(root))
    }

    /// Applies additions before removals; a root in both ends up
    /// unblocked.
    pub fn update(&self, additions: &[Hash256], removals: &[Hash256]) {
        let mut hashes = self.hashes.write();
        for root in additions {
            hashes.insert(Self::hash_root(root));
        }
        for root in removals {
            hashes.remove(&Self::hash_root(root));
        }
        info!(
            "blocklist updated: +{} -{} ({} total)",
            additions.len(),
            removals.len(),
            hashes.len()
        );
    }

    /// The hashed entries, for persistence or sharing.
    pub fn hashes(&self) -> Vec<Hash256> {
        self.hashes.read().iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_and_unblock() {
        let blocklist = Blocklist::new();
        let root = blake2b_256(b"bad sector");
        assert!(!blocklist.is_blocked(&root));

        blocklist.update(&[root], &[]);
        assert!(blocklist.is_blocked(&root));
        // The stored entry is the hash of the root, not the root.
        assert!(!blocklist.hashes().contains(&root));

        blocklist.update(&[], &[root]);
        assert!(!blocklist.is_blocked(&root));
    }
}
