// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

/// Merkle proof error
#[derive(Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error("empty proof range")]
    EmptyRange,
    #[error("proof range [{start}, {end}) out of bounds for {num_leaves} leaves")]
    RangeOutOfBounds {
        start: u64,
        end: u64,
        num_leaves: u64,
    },
    #[error("proof ranges must be sorted and non-overlapping")]
    UnsortedRanges,
    #[error("proof has wrong number of hashes: expected {expected}, got {actual}")]
    ProofLength { expected: usize, actual: usize },
    #[error("wrong number of range leaf hashes: expected {expected}, got {actual}")]
    LeafCount { expected: usize, actual: usize },
}
