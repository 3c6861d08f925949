// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{
    arg_proof_flag, arg_u64, check_args, Instruction, InstructionFrame, ProgramState,
    SPECIFIER_SWAP_SECTOR, SWAP_SECTOR_ARGS_LEN,
};
use crate::{costs, swap_sector_cost, Error, Output, ProgramData};
use async_trait::async_trait;
use encoding::to_vec;
use merkle::{diff_proof, ProofRange};
use std::sync::Arc;
use types::{Currency, PriceTable, Specifier};

/// Swaps two sectors of the contract by index.
pub struct InstructionSwapSector {
    data: Arc<ProgramData>,
    sector1_offset: u64,
    sector2_offset: u64,
    want_proof: bool,
}

impl InstructionSwapSector {
    pub(crate) fn decode(frame: &InstructionFrame, data: Arc<ProgramData>) -> Result<Self, Error> {
        check_args(frame, SWAP_SECTOR_ARGS_LEN)?;
        Ok(InstructionSwapSector {
            data,
            sector1_offset: arg_u64(&frame.args, 0),
            sector2_offset: arg_u64(&frame.args, 1),
            want_proof: arg_proof_flag(&frame.args),
        })
    }
}

#[async_trait]
impl Instruction for InstructionSwapSector {
    fn specifier(&self) -> Specifier {
        SPECIFIER_SWAP_SECTOR
    }

    async fn cost(&self, pt: &PriceTable) -> Result<(Currency, Currency), Error> {
        Ok(swap_sector_cost(pt))
    }

    fn collateral(&self, _: &PriceTable) -> Currency {
        Currency::zero()
    }

    fn memory(&self) -> u64 {
        0
    }

    fn time(&self) -> u64 {
        costs::TIME_SWAP_SECTOR
    }

    async fn execute(&self, state: &mut ProgramState<'_>, prev: &Output) -> Result<Output, Error> {
        let mut offset1 = self.data.u64_at(self.sector1_offset).await?;
        let mut offset2 = self.data.u64_at(self.sector2_offset).await?;
        if offset2 < offset1 {
            std::mem::swap(&mut offset1, &mut offset2);
        }

        let new_merkle_root = state.sectors.swap_sectors(offset1, offset2)?;

        // The sectors have been exchanged, so the pre-swap leaf at
        // offset1 now sits at offset2 and vice versa.
        let new_roots = state.sectors.roots();
        let old_sector1 = new_roots[offset2 as usize];
        let old_sector2 = new_roots[offset1 as usize];

        let (output, proof) = if self.want_proof {
            let mut ranges = vec![ProofRange::new(offset1, offset1 + 1)];
            let mut old_leaf_hashes = vec![old_sector1];
            // Only one range when the offsets are equal.
            if offset1 != offset2 {
                ranges.push(ProofRange::new(offset2, offset2 + 1));
                old_leaf_hashes.push(old_sector2);
            }
            let proof = diff_proof(&ranges, new_roots)
                .map_err(|e| Error::MalformedProgram(e.to_string()))?;
            let output =
                to_vec(&old_leaf_hashes).map_err(|e| Error::MalformedProgram(e.to_string()))?;
            (output, proof)
        } else {
            (Vec::new(), Vec::new())
        };

        Ok(Output {
            new_size: prev.new_size,
            new_merkle_root,
            output,
            proof,
            error: None,
        })
    }
}
