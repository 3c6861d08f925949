// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{
    decode_instruction, init_program_cost, memory_time_cost, Budget, CollateralBudget, Error,
    Instruction, InstructionFrame, Output, ProgramData, ProgramState, SectorCache, SectorStorage,
};
use async_std::task;
use crypto::Hash256;
use encoding::{Decodable, Encodable};
use futures::channel::mpsc;
use log::debug;
use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use std::sync::Arc;
use types::{PriceTable, PriceTableUid};

/// The program header framing an instruction stream on the wire. The
/// `data_length` bytes of parameter data follow the header.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProgramHeader {
    pub price_table_uid: PriceTableUid,
    pub instructions: Vec<InstructionFrame>,
    pub data_length: u64,
}

impl Encodable for ProgramHeader {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), encoding::Error> {
        self.price_table_uid.encode(w)?;
        self.instructions.encode(w)?;
        self.data_length.encode(w)
    }
}

impl Decodable for ProgramHeader {
    fn decode<R: Read>(r: &mut R) -> Result<Self, encoding::Error> {
        Ok(ProgramHeader {
            price_table_uid: PriceTableUid::decode(r)?,
            instructions: Vec::decode(r)?,
            data_length: u64::decode(r)?,
        })
    }
}

/// Everything the runner needs besides the instructions themselves.
pub struct ProgramParams {
    pub price_table: PriceTable,
    pub budget: Budget,
    pub collateral_budget: CollateralBudget,
    /// Copy of the obligation's roots at program start.
    pub initial_roots: Vec<Hash256>,
    pub initial_size: u64,
}

/// A live program: outputs stream as instructions finish, the handle
/// resolves to the finalizer once the last instruction has run.
pub struct RunningProgram {
    pub outputs: mpsc::UnboundedReceiver<Output>,
    pub handle: task::JoinHandle<Result<Option<Finalizer>, Error>>,
}

/// The staged mutations of a successfully terminated program. Nothing
/// is visible outside the program until `commit_sectors` runs under the
/// obligation lock.
#[derive(Debug, PartialEq)]
pub struct Finalizer {
    gained: HashMap<Hash256, Vec<u8>>,
    removed: HashSet<Hash256>,
    roots: Vec<Hash256>,
    new_merkle_root: Hash256,
    new_size: u64,
}

impl Finalizer {
    fn new(cache: SectorCache, new_size: u64) -> Self {
        let new_merkle_root = cache.root();
        let (gained, removed, roots) = cache.into_parts();
        Finalizer {
            gained,
            removed,
            roots,
            new_merkle_root,
            new_size,
        }
    }

    pub fn roots(&self) -> &[Hash256] {
        &self.roots
    }

    pub fn new_merkle_root(&self) -> Hash256 {
        self.new_merkle_root
    }

    pub fn new_size(&self) -> u64 {
        self.new_size
    }

    /// Applies the staged deletions, then the staged writes. The caller
    /// must hold the contract's obligation lock.
    pub fn commit_sectors(&self, store: &dyn SectorStorage) -> Result<(), Error> {
        for root in &self.removed {
            store.delete_sector(root)?;
        }
        for (root, data) in &self.gained {
            store.put_sector(root, data)?;
        }
        debug!(
            "committed program: {} gained, {} removed, new root {}",
            self.gained.len(),
            self.removed.len(),
            self.new_merkle_root
        );
        Ok(())
    }
}

/// Decodes a program header's instructions against its data buffer and
/// starts executing them in a background task. Decoding failures abort
/// the whole program before anything runs.
pub fn execute_program(
    params: ProgramParams,
    frames: &[InstructionFrame],
    data: Arc<ProgramData>,
    store: Arc<dyn SectorStorage>,
) -> Result<RunningProgram, Error> {
    let instructions = frames
        .iter()
        .map(|frame| decode_instruction(frame, data.clone()))
        .collect::<Result<Vec<_>, Error>>()?;

    let (tx, rx) = mpsc::unbounded();
    let handle = task::spawn(run_program(params, instructions, store, tx));
    Ok(RunningProgram {
        outputs: rx,
        handle,
    })
}

async fn run_program(
    params: ProgramParams,
    instructions: Vec<Box<dyn Instruction>>,
    store: Arc<dyn SectorStorage>,
    tx: mpsc::UnboundedSender<Output>,
) -> Result<Option<Finalizer>, Error> {
    let pt = params.price_table;
    let mut budget = params.budget;
    let mut collateral_budget = params.collateral_budget;
    let mut state = ProgramState {
        sectors: SectorCache::new(params.initial_roots),
        store: store.as_ref(),
    };
    let mut prev = Output {
        new_size: params.initial_size,
        new_merkle_root: state.sectors.root(),
        ..Default::default()
    };
    let mut used_memory = 0u64;

    let result = async {
        budget.withdraw(&init_program_cost(&pt))?;
        for instruction in &instructions {
            // Meter first; an overrun aborts before the instruction can
            // mutate anything.
            let (execution, storage) = instruction.cost(&pt).await?;
            used_memory += instruction.memory();
            let memory_cost = memory_time_cost(&pt, used_memory, instruction.time());
            budget.withdraw(&(execution + storage + memory_cost))?;
            collateral_budget.withdraw(&instruction.collateral(&pt))?;

            let output = instruction.execute(&mut state, &prev).await?;
            debug!(
                "executed {}: size {}, root {}",
                instruction.specifier(),
                output.new_size,
                output.new_merkle_root
            );
            let _ = tx.unbounded_send(output.clone());
            prev = output;
        }
        Ok(())
    }
    .await;

    if let Err(err) = result {
        // Surface the abort to the renter as a final output, then make
        // sure nothing of this program survives.
        let _ = tx.unbounded_send(Output::error_from(&prev, &err));
        return Err(err);
    }

    if state.sectors.is_dirty() {
        Ok(Some(Finalizer::new(state.sectors, prev.new_size)))
    } else {
        Ok(None)
    }
}
