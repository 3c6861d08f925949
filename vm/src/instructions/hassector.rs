// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{
    arg_u64, check_args, Instruction, InstructionFrame, ProgramState, HAS_SECTOR_ARGS_LEN,
    SPECIFIER_HAS_SECTOR,
};
use crate::{costs, has_sector_cost, Error, Output, ProgramData};
use async_trait::async_trait;
use crypto::Hash256;
use std::sync::Arc;
use types::{Currency, PriceTable, Specifier};

/// Reports whether the contract holds a sector root. Output is a single
/// byte, 1 when present.
pub struct InstructionHasSector {
    data: Arc<ProgramData>,
    root_offset: u64,
}

impl InstructionHasSector {
    pub(crate) fn decode(frame: &InstructionFrame, data: Arc<ProgramData>) -> Result<Self, Error> {
        check_args(frame, HAS_SECTOR_ARGS_LEN)?;
        Ok(InstructionHasSector {
            data,
            root_offset: arg_u64(&frame.args, 0),
        })
    }
}

#[async_trait]
impl Instruction for InstructionHasSector {
    fn specifier(&self) -> Specifier {
        SPECIFIER_HAS_SECTOR
    }

    async fn cost(&self, pt: &PriceTable) -> Result<(Currency, Currency), Error> {
        Ok(has_sector_cost(pt))
    }

    fn collateral(&self, _: &PriceTable) -> Currency {
        Currency::zero()
    }

    fn memory(&self) -> u64 {
        0
    }

    fn time(&self) -> u64 {
        costs::TIME_HAS_SECTOR
    }

    async fn execute(&self, state: &mut ProgramState<'_>, prev: &Output) -> Result<Output, Error> {
        let root_bytes = self.data.bytes_at(self.root_offset, 32).await?;
        let root = Hash256::try_from(root_bytes.as_slice())
            .map_err(|e| Error::MalformedProgram(e.to_string()))?;
        let has = state.sectors.has_sector(&root);

        Ok(Output {
            new_size: prev.new_size,
            new_merkle_root: prev.new_merkle_root,
            output: vec![u8::from(has)],
            proof: Vec::new(),
            error: None,
        })
    }
}
