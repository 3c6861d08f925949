// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod budget;
mod costs;
mod data;
mod errors;
mod instructions;
mod output;
mod program;
mod sectors;

pub use self::budget::*;
pub use self::costs::*;
pub use self::data::*;
pub use self::errors::*;
pub use self::instructions::*;
pub use self::output::*;
pub use self::program::*;
pub use self::sectors::*;

use crypto::Hash256;

/// Read and mutate access to the host's sector blobs. The engine reads
/// through this during `ReadSector` and writes through it when a
/// finalized program commits.
pub trait SectorStorage: Send + Sync {
    fn read_sector(&self, root: &Hash256) -> Result<Option<Vec<u8>>, Error>;
    fn put_sector(&self, root: &Hash256, data: &[u8]) -> Result<(), Error>;
    fn delete_sector(&self, root: &Hash256) -> Result<(), Error>;
}
