// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{
    arg_proof_flag, arg_u64, check_args, Instruction, InstructionFrame, ProgramState,
    DROP_SECTORS_ARGS_LEN, SPECIFIER_DROP_SECTORS,
};
use crate::{costs, drop_sectors_cost, Error, Output, ProgramData};
use async_trait::async_trait;
use encoding::to_vec;
use merkle::{diff_proof, ProofRange};
use std::sync::Arc;
use types::{Currency, PriceTable, Specifier, SECTOR_SIZE};

/// Drops the trailing N sectors from the contract.
pub struct InstructionDropSectors {
    data: Arc<ProgramData>,
    num_sectors_offset: u64,
    want_proof: bool,
}

impl InstructionDropSectors {
    pub(crate) fn decode(frame: &InstructionFrame, data: Arc<ProgramData>) -> Result<Self, Error> {
        check_args(frame, DROP_SECTORS_ARGS_LEN)?;
        Ok(InstructionDropSectors {
            data,
            num_sectors_offset: arg_u64(&frame.args, 0),
            want_proof: arg_proof_flag(&frame.args),
        })
    }
}

#[async_trait]
impl Instruction for InstructionDropSectors {
    fn specifier(&self) -> Specifier {
        SPECIFIER_DROP_SECTORS
    }

    async fn cost(&self, pt: &PriceTable) -> Result<(Currency, Currency), Error> {
        let num_sectors = self.data.u64_at(self.num_sectors_offset).await?;
        Ok(drop_sectors_cost(pt, num_sectors))
    }

    fn collateral(&self, _: &PriceTable) -> Currency {
        Currency::zero()
    }

    fn memory(&self) -> u64 {
        0
    }

    fn time(&self) -> u64 {
        costs::TIME_DROP_SECTORS
    }

    async fn execute(&self, state: &mut ProgramState<'_>, prev: &Output) -> Result<Output, Error> {
        let num_sectors = self.data.u64_at(self.num_sectors_offset).await?;
        let old_roots = state.sectors.roots().to_vec();
        let old_num = old_roots.len() as u64;

        let new_merkle_root = state.sectors.drop_sectors(num_sectors)?;
        let new_num = old_num - num_sectors;

        // Proof over the old list: siblings of the retained prefix, with
        // the dropped leaf hashes as output so the renter can confirm
        // the old root before adopting the new one.
        let (output, proof) = if self.want_proof && num_sectors > 0 {
            let ranges = [ProofRange::new(new_num, old_num)];
            let proof = diff_proof(&ranges, &old_roots)
                .map_err(|e| Error::MalformedProgram(e.to_string()))?;
            let dropped = old_roots[new_num as usize..].to_vec();
            let output =
                to_vec(&dropped).map_err(|e| Error::MalformedProgram(e.to_string()))?;
            (output, proof)
        } else {
            (Vec::new(), Vec::new())
        };

        Ok(Output {
            new_size: prev.new_size - num_sectors * SECTOR_SIZE,
            new_merkle_root,
            output,
            proof,
            error: None,
        })
    }
}
