// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod append;
mod dropsectors;
mod hassector;
mod readsector;
mod swapsector;

pub use self::append::InstructionAppend;
pub use self::dropsectors::InstructionDropSectors;
pub use self::hassector::InstructionHasSector;
pub use self::readsector::InstructionReadSector;
pub use self::swapsector::InstructionSwapSector;

use super::{Error, Output, ProgramData, SectorCache, SectorStorage};
use async_trait::async_trait;
use byteorder::{ByteOrder, LittleEndian};
use encoding::{Decodable, Encodable};
use std::io::{Read, Write};
use std::sync::Arc;
use types::{Currency, PriceTable, Specifier};

pub const SPECIFIER_APPEND: Specifier = Specifier::new("Append");
pub const SPECIFIER_DROP_SECTORS: Specifier = Specifier::new("DropSectors");
pub const SPECIFIER_HAS_SECTOR: Specifier = Specifier::new("HasSector");
pub const SPECIFIER_READ_SECTOR: Specifier = Specifier::new("ReadSector");
pub const SPECIFIER_SWAP_SECTOR: Specifier = Specifier::new("SwapSector");

pub(crate) const APPEND_ARGS_LEN: usize = 9;
pub(crate) const DROP_SECTORS_ARGS_LEN: usize = 9;
pub(crate) const HAS_SECTOR_ARGS_LEN: usize = 8;
pub(crate) const READ_SECTOR_ARGS_LEN: usize = 25;
pub(crate) const SWAP_SECTOR_ARGS_LEN: usize = 17;

/// Mutable state an instruction executes against: the program's sector
/// cache plus read access to the host's committed sectors.
pub struct ProgramState<'a> {
    pub sectors: SectorCache,
    pub store: &'a dyn SectorStorage,
}

/// The uniform capability set every instruction implements. Costing may
/// read the instruction's arguments from program data and therefore
/// shares the data buffer's blocking behavior.
#[async_trait]
pub trait Instruction: Send + Sync {
    fn specifier(&self) -> Specifier;

    /// (execution cost, storage cost delta) against the price table.
    async fn cost(&self, pt: &PriceTable) -> Result<(Currency, Currency), Error>;

    /// Collateral the host pledges by executing this instruction.
    fn collateral(&self, pt: &PriceTable) -> Currency;

    /// Bytes pinned beyond the instruction's own lifetime.
    fn memory(&self) -> u64;

    /// Dimensionless execution-time weight.
    fn time(&self) -> u64;

    /// Runs the instruction. `Err` aborts the program; recoverable
    /// failures come back as an `Ok` output with its error set.
    async fn execute(&self, state: &mut ProgramState<'_>, prev: &Output) -> Result<Output, Error>;
}

/// One undecoded instruction as it appears in the program header.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InstructionFrame {
    pub specifier: Specifier,
    pub args: Vec<u8>,
}

impl Encodable for InstructionFrame {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), encoding::Error> {
        self.specifier.encode(w)?;
        self.args.encode(w)
    }
}

impl Decodable for InstructionFrame {
    fn decode<R: Read>(r: &mut R) -> Result<Self, encoding::Error> {
        Ok(InstructionFrame {
            specifier: Specifier::decode(r)?,
            args: Vec::decode(r)?,
        })
    }
}

/// Decodes a wire frame into a runnable instruction bound to the
/// program's data buffer.
pub fn decode_instruction(
    frame: &InstructionFrame,
    data: Arc<ProgramData>,
) -> Result<Box<dyn Instruction>, Error> {
    match frame.specifier {
        SPECIFIER_APPEND => Ok(Box::new(InstructionAppend::decode(frame, data)?)),
        SPECIFIER_DROP_SECTORS => Ok(Box::new(InstructionDropSectors::decode(frame, data)?)),
        SPECIFIER_HAS_SECTOR => Ok(Box::new(InstructionHasSector::decode(frame, data)?)),
        SPECIFIER_READ_SECTOR => Ok(Box::new(InstructionReadSector::decode(frame, data)?)),
        SPECIFIER_SWAP_SECTOR => Ok(Box::new(InstructionSwapSector::decode(frame, data)?)),
        other => Err(Error::UnknownSpecifier(other)),
    }
}

/// Checks an instruction's argument block length.
pub(crate) fn check_args(frame: &InstructionFrame, expected: usize) -> Result<(), Error> {
    if frame.args.len() != expected {
        return Err(Error::ArgumentLength {
            specifier: frame.specifier,
            expected,
            actual: frame.args.len(),
        });
    }
    Ok(())
}

/// Reads the `idx`-th u64 argument word.
pub(crate) fn arg_u64(args: &[u8], idx: usize) -> u64 {
    LittleEndian::read_u64(&args[idx * 8..idx * 8 + 8])
}

/// Reads the proof flag byte trailing the argument words.
pub(crate) fn arg_proof_flag(args: &[u8]) -> bool {
    args[args.len() - 1] == 1
}
