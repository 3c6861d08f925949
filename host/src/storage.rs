// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::Error;
use crypto::Hash256;
use db::Store;
use merkle::sector_root;

/// Content-addressed sector blobs over a keyed store. Every put checks
/// the addressability invariant: the key is the Merkle root of the
/// bytes.
pub struct SectorStore<DB> {
    db: DB,
}

impl<DB: Store> SectorStore<DB> {
    pub fn new(db: DB) -> Self {
        SectorStore { db }
    }

    pub fn get(&self, root: &Hash256) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.db.read(root)?)
    }

    pub fn put(&self, root: &Hash256, data: &[u8]) -> Result<(), Error> {
        let actual = sector_root(data);
        if actual != *root {
            return Err(Error::SectorStore(format!(
                "sector content hashes to {}, keyed as {}",
                actual, root
            )));
        }
        Ok(self.db.write(root, data)?)
    }

    pub fn delete(&self, root: &Hash256) -> Result<(), Error> {
        Ok(self.db.delete(root)?)
    }

    pub fn contains(&self, root: &Hash256) -> Result<bool, Error> {
        Ok(self.db.exists(root)?)
    }
}

impl<DB> vm::SectorStorage for SectorStore<DB>
where
    DB: Store + Send + Sync,
{
    fn read_sector(&self, root: &Hash256) -> Result<Option<Vec<u8>>, vm::Error> {
        self.get(root)
            .map_err(|e| vm::Error::SectorStore(e.to_string()))
    }

    fn put_sector(&self, root: &Hash256, data: &[u8]) -> Result<(), vm::Error> {
        self.put(root, data)
            .map_err(|e| vm::Error::SectorStore(e.to_string()))
    }

    fn delete_sector(&self, root: &Hash256) -> Result<(), vm::Error> {
        self.delete(root)
            .map_err(|e| vm::Error::SectorStore(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::MemoryDB;
    use types::SECTOR_SIZE;

    #[test]
    fn put_enforces_content_addressing() {
        let store = SectorStore::new(MemoryDB::default());
        let data = vec![5u8; SECTOR_SIZE as usize];
        let root = sector_root(&data);

        store.put(&root, &data).unwrap();
        assert_eq!(store.get(&root).unwrap().unwrap(), data);

        let wrong = Hash256::ZERO;
        assert!(store.put(&wrong, &data).is_err());
    }

    #[test]
    fn delete_is_idempotent() {
        let store = SectorStore::new(MemoryDB::default());
        let data = vec![5u8; SECTOR_SIZE as usize];
        let root = sector_root(&data);
        store.put(&root, &data).unwrap();
        store.delete(&root).unwrap();
        store.delete(&root).unwrap();
        assert!(!store.contains(&root).unwrap());
    }
}
