// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::SEGMENT_SIZE;
use crypto::Hash256;

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

/// Hashes a leaf with the leaf domain prefix.
pub fn leaf_sum(data: &[u8]) -> Hash256 {
    let mut buf = Vec::with_capacity(1 + data.len());
    buf.push(LEAF_PREFIX);
    buf.extend_from_slice(data);
    crypto::blake2b_256(&buf)
}

/// Hashes two subtree roots with the internal-node domain prefix.
pub fn node_sum(left: &Hash256, right: &Hash256) -> Hash256 {
    let mut buf = [0u8; 65];
    buf[0] = NODE_PREFIX;
    buf[1..33].copy_from_slice(left.as_ref());
    buf[33..].copy_from_slice(right.as_ref());
    crypto::blake2b_256(&buf)
}

/// One live subtree on the builder stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Subtree {
    height: u32,
    hash: Hash256,
}

/// Incremental Merkle tree builder.
///
/// Subtrees of equal height collapse as leaves are pushed, so the stack
/// never holds more than one subtree per height. The tree over `n`
/// leaves has the shape produced by splitting at the largest power of
/// two strictly below `n`.
#[derive(Debug, Default, Clone)]
pub struct Tree {
    stack: Vec<Subtree>,
}

impl Tree {
    pub fn new() -> Self {
        Tree::default()
    }

    /// Pushes leaf data; it is hashed with the leaf prefix.
    pub fn push(&mut self, data: &[u8]) {
        self.push_hash(leaf_sum(data));
    }

    /// Pushes an already-computed subtree root. Used for cached trees
    /// where the leaves are themselves sector roots.
    pub fn push_hash(&mut self, hash: Hash256) {
        self.stack.push(Subtree { height: 0, hash });
        while self.stack.len() >= 2 {
            let right = self.stack[self.stack.len() - 1];
            let left = self.stack[self.stack.len() - 2];
            if left.height != right.height {
                break;
            }
            self.stack.truncate(self.stack.len() - 2);
            self.stack.push(Subtree {
                height: left.height + 1,
                hash: node_sum(&left.hash, &right.hash),
            });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Root of all pushed leaves; `Hash256::ZERO` when empty.
    pub fn root(&self) -> Hash256 {
        let mut iter = self.stack.iter().rev();
        let mut acc = match iter.next() {
            Some(st) => st.hash,
            None => return Hash256::ZERO,
        };
        for st in iter {
            acc = node_sum(&st.hash, &acc);
        }
        acc
    }

    /// The live subtree roots that remain to be joined, lowest subtree
    /// (rightmost edge of the tree) first. Block templates hand these to
    /// miners so headers can be rebuilt without the full leaf set.
    pub fn branches(&self) -> Vec<(u32, Hash256)> {
        self.stack
            .iter()
            .rev()
            .map(|st| (st.height, st.hash))
            .collect()
    }
}

/// Merkle root of sector data: a tree over `SEGMENT_SIZE` chunks, the
/// final partial chunk hashed unpadded. Empty data yields `Hash256::ZERO`.
pub fn sector_root(data: &[u8]) -> Hash256 {
    let mut tree = Tree::new();
    for chunk in data.chunks(SEGMENT_SIZE) {
        tree.push(chunk);
    }
    tree.root()
}

/// Merkle root of an ordered sector root list. This is the value a file
/// contract revision commits to.
pub fn root_list_root(roots: &[Hash256]) -> Hash256 {
    let mut tree = Tree::new();
    for root in roots {
        tree.push_hash(*root);
    }
    tree.root()
}
