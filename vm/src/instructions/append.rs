// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{
    arg_proof_flag, arg_u64, check_args, Instruction, InstructionFrame, ProgramState,
    APPEND_ARGS_LEN, SPECIFIER_APPEND,
};
use crate::{append_collateral, append_cost, append_memory, costs, Error, Output, ProgramData};
use async_trait::async_trait;
use merkle::{diff_proof, ProofRange};
use std::sync::Arc;
use types::{Currency, PriceTable, Specifier, SECTOR_SIZE};

/// Appends one full sector from program data to the contract.
pub struct InstructionAppend {
    data: Arc<ProgramData>,
    data_offset: u64,
    want_proof: bool,
}

impl InstructionAppend {
    pub(crate) fn decode(frame: &InstructionFrame, data: Arc<ProgramData>) -> Result<Self, Error> {
        check_args(frame, APPEND_ARGS_LEN)?;
        Ok(InstructionAppend {
            data,
            data_offset: arg_u64(&frame.args, 0),
            want_proof: arg_proof_flag(&frame.args),
        })
    }
}

#[async_trait]
impl Instruction for InstructionAppend {
    fn specifier(&self) -> Specifier {
        SPECIFIER_APPEND
    }

    async fn cost(&self, pt: &PriceTable) -> Result<(Currency, Currency), Error> {
        Ok(append_cost(pt))
    }

    fn collateral(&self, pt: &PriceTable) -> Currency {
        append_collateral(pt)
    }

    fn memory(&self) -> u64 {
        append_memory()
    }

    fn time(&self) -> u64 {
        costs::TIME_APPEND
    }

    async fn execute(&self, state: &mut ProgramState<'_>, prev: &Output) -> Result<Output, Error> {
        let sector = self.data.bytes_at(self.data_offset, SECTOR_SIZE).await?;
        let old_num = state.sectors.num_sectors();
        let new_merkle_root = state.sectors.append_sector(sector)?;

        // The proof is the decomposition of the pre-append list; the
        // renter recombines it into the old root and extends it with the
        // root it appended.
        let proof = if self.want_proof {
            let ranges = [ProofRange::new(old_num, old_num + 1)];
            diff_proof(&ranges, state.sectors.roots())
                .map_err(|e| Error::MalformedProgram(e.to_string()))?
        } else {
            Vec::new()
        };

        Ok(Output {
            new_size: prev.new_size + SECTOR_SIZE,
            new_merkle_root,
            output: Vec::new(),
            proof,
            error: None,
        })
    }
}
