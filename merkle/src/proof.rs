// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{node_sum, Error};
use crypto::Hash256;

/// A half-open range of leaf indices covered by a diff proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofRange {
    pub start: u64,
    pub end: u64,
}

impl ProofRange {
    pub fn new(start: u64, end: u64) -> Self {
        ProofRange { start, end }
    }

    fn intersects(&self, lo: u64, hi: u64) -> bool {
        self.start < hi && lo < self.end
    }
}

fn validate_ranges(ranges: &[ProofRange], num_leaves: u64) -> Result<(), Error> {
    let mut prev_end = 0;
    for (i, range) in ranges.iter().enumerate() {
        if range.start >= range.end {
            return Err(Error::EmptyRange);
        }
        if range.end > num_leaves {
            return Err(Error::RangeOutOfBounds {
                start: range.start,
                end: range.end,
                num_leaves,
            });
        }
        if i > 0 && range.start < prev_end {
            return Err(Error::UnsortedRanges);
        }
        prev_end = range.end;
    }
    Ok(())
}

/// Split point of the canonical tree shape: the largest power of two
/// strictly below `n`.
fn split_point(n: u64) -> u64 {
    debug_assert!(n >= 2);
    1 << (63 - (n - 1).leading_zeros())
}

fn covered(ranges: &[ProofRange], lo: u64, hi: u64) -> bool {
    ranges.iter().any(|r| r.intersects(lo, hi))
}

fn subtree_root(hashes: &[Hash256]) -> Hash256 {
    if hashes.len() == 1 {
        return hashes[0];
    }
    let split = split_point(hashes.len() as u64) as usize;
    node_sum(&subtree_root(&hashes[..split]), &subtree_root(&hashes[split..]))
}

fn collect_proof(
    hashes: &[Hash256],
    lo: u64,
    hi: u64,
    ranges: &[ProofRange],
    proof: &mut Vec<Hash256>,
) {
    if !covered(ranges, lo, hi) {
        proof.push(subtree_root(&hashes[lo as usize..hi as usize]));
        return;
    }
    if hi - lo == 1 {
        // Covered leaf; the verifier supplies its hash.
        return;
    }
    let mid = lo + split_point(hi - lo);
    collect_proof(hashes, lo, mid, ranges, proof);
    collect_proof(hashes, mid, hi, ranges, proof);
}

/// Produces the minimal set of sibling hashes that, together with the
/// leaf hashes inside `ranges`, determine the root over the full leaf
/// list. Hashes are emitted in-order. Ranges must be ascending,
/// non-empty and non-overlapping.
pub fn diff_proof(ranges: &[ProofRange], leaf_hashes: &[Hash256]) -> Result<Vec<Hash256>, Error> {
    let num_leaves = leaf_hashes.len() as u64;
    validate_ranges(ranges, num_leaves)?;
    let mut proof = Vec::new();
    if num_leaves > 0 {
        collect_proof(leaf_hashes, 0, num_leaves, ranges, &mut proof);
    }
    Ok(proof)
}

struct ProofReader<'a> {
    proof: &'a [Hash256],
    leaves: &'a [Hash256],
    proof_at: usize,
    leaves_at: usize,
}

impl<'a> ProofReader<'a> {
    fn next_proof(&mut self) -> Result<Hash256, Error> {
        let h = self.proof.get(self.proof_at).copied().ok_or(Error::ProofLength {
            expected: self.proof_at + 1,
            actual: self.proof.len(),
        })?;
        self.proof_at += 1;
        Ok(h)
    }

    fn next_leaf(&mut self) -> Result<Hash256, Error> {
        let h = self.leaves.get(self.leaves_at).copied().ok_or(Error::LeafCount {
            expected: self.leaves_at + 1,
            actual: self.leaves.len(),
        })?;
        self.leaves_at += 1;
        Ok(h)
    }
}

fn compute_root(
    lo: u64,
    hi: u64,
    ranges: &[ProofRange],
    rd: &mut ProofReader<'_>,
) -> Result<Hash256, Error> {
    if !covered(ranges, lo, hi) {
        return rd.next_proof();
    }
    if hi - lo == 1 {
        return rd.next_leaf();
    }
    let mid = lo + split_point(hi - lo);
    let left = compute_root(lo, mid, ranges, rd)?;
    let right = compute_root(mid, hi, ranges, rd)?;
    Ok(node_sum(&left, &right))
}

/// Recomputes the root of a tree over `num_leaves` leaves from a diff
/// proof and the leaf hashes inside `ranges` (ascending leaf order), and
/// compares it to `expected_root`. A mutation is verified by running
/// this twice: once with the old leaves against the old root, once with
/// the new leaves (and new leaf count) against the new root.
pub fn verify_diff_proof(
    num_leaves: u64,
    ranges: &[ProofRange],
    proof: &[Hash256],
    range_leaves: &[Hash256],
    expected_root: &Hash256,
) -> Result<bool, Error> {
    validate_ranges(ranges, num_leaves)?;
    let mut rd = ProofReader {
        proof,
        leaves: range_leaves,
        proof_at: 0,
        leaves_at: 0,
    };
    let root = if num_leaves == 0 {
        Hash256::ZERO
    } else {
        compute_root(0, num_leaves, ranges, &mut rd)?
    };
    if rd.proof_at != proof.len() {
        return Err(Error::ProofLength {
            expected: rd.proof_at,
            actual: proof.len(),
        });
    }
    if rd.leaves_at != range_leaves.len() {
        return Err(Error::LeafCount {
            expected: rd.leaves_at,
            actual: range_leaves.len(),
        });
    }
    Ok(root == *expected_root)
}

/// Recombines the greedy power-of-two decomposition of a prefix of the
/// leaf list into its root. Append proofs carry exactly these blocks
/// for the pre-append list, and drop proofs for the retained prefix, so
/// the counterpart root is recovered without any leaf hashes.
pub fn root_from_decomposition(num_leaves: u64, blocks: &[Hash256]) -> Result<Hash256, Error> {
    let expected = decomposition_len(num_leaves);
    if blocks.len() != expected {
        return Err(Error::ProofLength {
            expected,
            actual: blocks.len(),
        });
    }
    let mut iter = blocks.iter().rev();
    let mut acc = match iter.next() {
        Some(h) => *h,
        None => return Ok(Hash256::ZERO),
    };
    for h in iter {
        acc = node_sum(h, &acc);
    }
    Ok(acc)
}

fn decomposition_len(num_leaves: u64) -> usize {
    num_leaves.count_ones() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::root_list_root;

    fn leaves(n: u64) -> Vec<Hash256> {
        (0..n).map(|i| crypto::blake2b_256(&i.to_le_bytes())).collect()
    }

    #[test]
    fn single_range_proof() {
        for n in 1..=9u64 {
            let ls = leaves(n);
            let root = root_list_root(&ls);
            for i in 0..n {
                let ranges = [ProofRange::new(i, i + 1)];
                let proof = diff_proof(&ranges, &ls).unwrap();
                assert!(verify_diff_proof(n, &ranges, &proof, &[ls[i as usize]], &root).unwrap());
                // A wrong leaf hash must not verify.
                let bad = crypto::blake2b_256(b"bad");
                assert!(!verify_diff_proof(n, &ranges, &proof, &[bad], &root).unwrap());
            }
        }
    }

    #[test]
    fn swap_style_two_ranges() {
        let mut ls = leaves(7);
        let old_root = root_list_root(&ls);
        let (i, j) = (1usize, 5usize);
        let ranges = [
            ProofRange::new(i as u64, i as u64 + 1),
            ProofRange::new(j as u64, j as u64 + 1),
        ];
        let old_leaves = [ls[i], ls[j]];
        ls.swap(i, j);
        let new_root = root_list_root(&ls);
        // Proof computed over the post-swap list: uncovered hashes are
        // position-independent between the two lists.
        let proof = diff_proof(&ranges, &ls).unwrap();
        assert!(verify_diff_proof(7, &ranges, &proof, &old_leaves, &old_root).unwrap());
        let new_leaves = [ls[i], ls[j]];
        assert!(verify_diff_proof(7, &ranges, &proof, &new_leaves, &new_root).unwrap());
    }

    #[test]
    fn append_proof_recovers_old_root() {
        for n_old in 0..8u64 {
            let n_new = n_old + 1;
            let ls = leaves(n_new);
            let old_root = root_list_root(&ls[..n_old as usize]);
            let new_root = root_list_root(&ls);
            let ranges = [ProofRange::new(n_old, n_new)];
            let proof = diff_proof(&ranges, &ls).unwrap();
            assert!(verify_diff_proof(
                n_new,
                &ranges,
                &proof,
                &ls[n_old as usize..],
                &new_root
            )
            .unwrap());
            assert_eq!(root_from_decomposition(n_old, &proof).unwrap(), old_root);
        }
    }

    #[test]
    fn drop_proof_recovers_new_root() {
        let ls = leaves(11);
        let old_root = root_list_root(&ls);
        for dropped in 1..=11u64 {
            let n_new = 11 - dropped;
            let ranges = [ProofRange::new(n_new, 11)];
            let proof = diff_proof(&ranges, &ls).unwrap();
            assert!(verify_diff_proof(
                11,
                &ranges,
                &proof,
                &ls[n_new as usize..],
                &old_root
            )
            .unwrap());
            let new_root = root_list_root(&ls[..n_new as usize]);
            assert_eq!(root_from_decomposition(n_new, &proof).unwrap(), new_root);
        }
    }

    #[test]
    fn overlapping_ranges_rejected() {
        let ls = leaves(4);
        let ranges = [ProofRange::new(0, 2), ProofRange::new(1, 3)];
        assert_eq!(diff_proof(&ranges, &ls), Err(Error::UnsortedRanges));
    }

    #[test]
    fn out_of_bounds_rejected() {
        let ls = leaves(4);
        let ranges = [ProofRange::new(3, 5)];
        assert!(matches!(
            diff_proof(&ranges, &ls),
            Err(Error::RangeOutOfBounds { .. })
        ));
    }

    #[test]
    fn excess_proof_hashes_rejected() {
        let ls = leaves(4);
        let ranges = [ProofRange::new(0, 1)];
        let mut proof = diff_proof(&ranges, &ls).unwrap();
        proof.push(Hash256::ZERO);
        let root = root_list_root(&ls);
        assert!(verify_diff_proof(4, &ranges, &proof, &[ls[0]], &root).is_err());
    }
}
