// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{
    arg_proof_flag, arg_u64, check_args, Instruction, InstructionFrame, ProgramState,
    READ_SECTOR_ARGS_LEN, SPECIFIER_READ_SECTOR,
};
use crate::{costs, read_sector_cost, Error, Output, ProgramData};
use async_trait::async_trait;
use crypto::Hash256;
use merkle::{diff_proof, leaf_sum, ProofRange, SEGMENT_SIZE};
use std::sync::Arc;
use types::{Currency, PriceTable, Specifier, SECTOR_SIZE};

/// Returns bytes from a stored sector. Never mutates the contract; a
/// missing root poisons only this instruction's output.
pub struct InstructionReadSector {
    data: Arc<ProgramData>,
    length_offset: u64,
    offset_offset: u64,
    root_offset: u64,
    want_proof: bool,
}

impl InstructionReadSector {
    pub(crate) fn decode(frame: &InstructionFrame, data: Arc<ProgramData>) -> Result<Self, Error> {
        check_args(frame, READ_SECTOR_ARGS_LEN)?;
        Ok(InstructionReadSector {
            data,
            length_offset: arg_u64(&frame.args, 0),
            offset_offset: arg_u64(&frame.args, 1),
            root_offset: arg_u64(&frame.args, 2),
            want_proof: arg_proof_flag(&frame.args),
        })
    }

    async fn read(
        &self,
        state: &mut ProgramState<'_>,
    ) -> Result<(Vec<u8>, Vec<Hash256>), Error> {
        let length = self.data.u64_at(self.length_offset).await?;
        let offset = self.data.u64_at(self.offset_offset).await?;
        let root_bytes = self.data.bytes_at(self.root_offset, 32).await?;
        let root = Hash256::try_from(root_bytes.as_slice())
            .map_err(|e| Error::MalformedProgram(e.to_string()))?;

        let end = offset
            .checked_add(length)
            .filter(|&end| end <= SECTOR_SIZE)
            .ok_or(Error::ReadOutOfBounds { offset, length })?;
        if self.want_proof {
            // Proofs address whole segments.
            let seg = SEGMENT_SIZE as u64;
            if offset % seg != 0 || length % seg != 0 {
                return Err(Error::ReadOutOfBounds { offset, length });
            }
        }

        let sector = state.sectors.read_sector(state.store, &root)?;
        let data = sector[offset as usize..end as usize].to_vec();

        let proof = if self.want_proof {
            let seg = SEGMENT_SIZE as u64;
            let leaf_hashes: Vec<Hash256> =
                sector.chunks(SEGMENT_SIZE).map(leaf_sum).collect();
            let ranges = [ProofRange::new(offset / seg, end / seg)];
            diff_proof(&ranges, &leaf_hashes)
                .map_err(|e| Error::MalformedProgram(e.to_string()))?
        } else {
            Vec::new()
        };

        Ok((data, proof))
    }
}

#[async_trait]
impl Instruction for InstructionReadSector {
    fn specifier(&self) -> Specifier {
        SPECIFIER_READ_SECTOR
    }

    async fn cost(&self, pt: &PriceTable) -> Result<(Currency, Currency), Error> {
        let length = self.data.u64_at(self.length_offset).await?;
        Ok(read_sector_cost(pt, length))
    }

    fn collateral(&self, _: &PriceTable) -> Currency {
        Currency::zero()
    }

    fn memory(&self) -> u64 {
        0
    }

    fn time(&self) -> u64 {
        costs::TIME_READ_SECTOR
    }

    async fn execute(&self, state: &mut ProgramState<'_>, prev: &Output) -> Result<Output, Error> {
        match self.read(state).await {
            Ok((output, proof)) => Ok(Output {
                new_size: prev.new_size,
                new_merkle_root: prev.new_merkle_root,
                output,
                proof,
                error: None,
            }),
            Err(err) if err.is_recoverable() => Ok(Output::error_from(prev, err)),
            Err(err) => Err(err),
        }
    }
}
