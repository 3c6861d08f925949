// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{Error, SectorStorage};
use crypto::Hash256;
use merkle::{root_list_root, sector_root};
use std::collections::{HashMap, HashSet};
use types::SECTOR_SIZE;

/// Per-program staging of sector mutations over a contract's root list.
/// Nothing touches the sector store until the program commits; an
/// aborted program simply drops the cache.
#[derive(Debug, Default, Clone)]
pub struct SectorCache {
    gained: HashMap<Hash256, Vec<u8>>,
    removed: HashSet<Hash256>,
    roots: Vec<Hash256>,
}

impl SectorCache {
    /// Creates a cache over a copy of the obligation's current roots.
    pub fn new(roots: Vec<Hash256>) -> Self {
        SectorCache {
            gained: HashMap::new(),
            removed: HashSet::new(),
            roots,
        }
    }

    pub fn roots(&self) -> &[Hash256] {
        &self.roots
    }

    pub fn num_sectors(&self) -> u64 {
        self.roots.len() as u64
    }

    /// Merkle root of the current root list.
    pub fn root(&self) -> Hash256 {
        root_list_root(&self.roots)
    }

    /// True once any mutation has been staged.
    pub fn is_dirty(&self) -> bool {
        !self.gained.is_empty() || !self.removed.is_empty()
    }

    /// Stages a full sector and returns the new list root. A sector
    /// whose root was previously marked removed is un-removed instead,
    /// netting out to no disk traffic.
    pub fn append_sector(&mut self, data: Vec<u8>) -> Result<Hash256, Error> {
        if data.len() as u64 != SECTOR_SIZE {
            return Err(Error::BadSectorLength(data.len() as u64, SECTOR_SIZE));
        }
        let new_root = sector_root(&data);

        self.gained.insert(new_root, data);
        self.removed.remove(&new_root);

        self.roots.push(new_root);
        Ok(self.root())
    }

    /// Drops the trailing `num_sectors` roots and returns the new list
    /// root. Dropped roots that were gained this program are forgotten;
    /// roots that predate the program are marked for store deletion.
    pub fn drop_sectors(&mut self, num_sectors: u64) -> Result<Hash256, Error> {
        let old_num = self.roots.len() as u64;
        if num_sectors > old_num {
            return Err(Error::DropTooManySectors {
                requested: num_sectors,
                actual: old_num,
            });
        }
        let new_num = (old_num - num_sectors) as usize;

        for dropped in self.roots.drain(new_num..) {
            if self.gained.remove(&dropped).is_none() {
                self.removed.insert(dropped);
            }
        }
        Ok(self.root())
    }

    /// Exchanges the roots at two indices and returns the new list root.
    pub fn swap_sectors(&mut self, i: u64, j: u64) -> Result<Hash256, Error> {
        let num = self.roots.len() as u64;
        for index in [i, j] {
            if index >= num {
                return Err(Error::SectorIndexOutOfBounds {
                    index,
                    num_sectors: num,
                });
            }
        }
        self.roots.swap(i as usize, j as usize);
        Ok(self.root())
    }

    /// Linear scan of the root list.
    pub fn has_sector(&self, root: &Hash256) -> bool {
        self.roots.contains(root)
    }

    /// Reads a sector by root, preferring the gained set and falling
    /// back to the host's store.
    pub fn read_sector(&self, store: &dyn SectorStorage, root: &Hash256) -> Result<Vec<u8>, Error> {
        if !self.has_sector(root) {
            return Err(Error::SectorNotFound(*root));
        }
        if let Some(data) = self.gained.get(root) {
            return Ok(data.clone());
        }
        store
            .read_sector(root)?
            .ok_or(Error::SectorNotFound(*root))
    }

    /// Decomposes the cache for commit: (gained, removed, roots).
    pub fn into_parts(self) -> (HashMap<Hash256, Vec<u8>>, HashSet<Hash256>, Vec<Hash256>) {
        (self.gained, self.removed, self.roots)
    }
}
