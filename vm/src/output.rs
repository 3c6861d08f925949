// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crypto::Hash256;
use encoding::{Decodable, Encodable};
use std::io::{Read, Write};

/// The result of one executed instruction, streamed back to the renter
/// as it is produced. `error` is set for recoverable per-instruction
/// failures and for the final output of an aborted program.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Output {
    /// Contract size after the instruction, in bytes.
    pub new_size: u64,
    /// Merkle root of the contract's root list after the instruction.
    pub new_merkle_root: Hash256,
    /// Instruction payload: read bytes, has-sector flag, or the leaf
    /// hashes accompanying a proof.
    pub output: Vec<u8>,
    /// Merkle diff proof hashes, when the renter asked for one.
    pub proof: Vec<Hash256>,
    pub error: Option<String>,
}

impl Output {
    /// Carries an error forward without disturbing the last good state.
    pub fn error_from(prev: &Output, err: impl ToString) -> Output {
        Output {
            new_size: prev.new_size,
            new_merkle_root: prev.new_merkle_root,
            output: Vec::new(),
            proof: Vec::new(),
            error: Some(err.to_string()),
        }
    }
}

// The response layout is fixed: sizes and root, then three u32-prefixed
// variable sections (output bytes, proof hashes, error text).
impl Encodable for Output {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), encoding::Error> {
        self.new_size.encode(w)?;
        self.new_merkle_root.encode(w)?;
        (self.output.len() as u32).encode(w)?;
        w.write_all(&self.output)?;
        (self.proof.len() as u32).encode(w)?;
        for hash in &self.proof {
            hash.encode(w)?;
        }
        let error_bytes = self.error.as_deref().unwrap_or("").as_bytes();
        (error_bytes.len() as u32).encode(w)?;
        Ok(w.write_all(error_bytes)?)
    }
}

impl Decodable for Output {
    fn decode<R: Read>(r: &mut R) -> Result<Self, encoding::Error> {
        let new_size = u64::decode(r)?;
        let new_merkle_root = Hash256::decode(r)?;

        let output_len = u32::decode(r)?;
        if u64::from(output_len) > encoding::MAX_ALLOC {
            return Err(encoding::Error::AllocLimit(u64::from(output_len)));
        }
        let mut output = vec![0u8; output_len as usize];
        r.read_exact(&mut output)?;

        let proof_len = u32::decode(r)?;
        if u64::from(proof_len) > encoding::MAX_ALLOC / 32 {
            return Err(encoding::Error::AllocLimit(u64::from(proof_len)));
        }
        let mut proof = Vec::with_capacity(proof_len as usize);
        for _ in 0..proof_len {
            proof.push(Hash256::decode(r)?);
        }

        let error_len = u32::decode(r)?;
        if u64::from(error_len) > encoding::MAX_ALLOC {
            return Err(encoding::Error::AllocLimit(u64::from(error_len)));
        }
        let mut error_bytes = vec![0u8; error_len as usize];
        r.read_exact(&mut error_bytes)?;
        let error = if error_bytes.is_empty() {
            None
        } else {
            Some(
                String::from_utf8(error_bytes)
                    .map_err(|e| encoding::Error::InvalidValue(e.to_string()))?,
            )
        };

        Ok(Output {
            new_size,
            new_merkle_root,
            output,
            proof,
            error,
        })
    }
}
