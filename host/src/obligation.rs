// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::Error;
use async_std::sync::Mutex;
use crypto::Hash256;
use merkle::root_list_root;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use types::{ContractId, FileContractRevision, Transaction, SECTOR_SIZE};

/// Host-side record of one file contract: its sector roots, the latest
/// co-signed revision transaction, and a cached root-list root. All
/// mutation happens under the registry's per-contract lock.
#[derive(Debug, Clone)]
pub struct StorageObligation {
    contract_id: ContractId,
    sector_roots: Vec<Hash256>,
    revision_transaction_set: Vec<Transaction>,
    cached_root: Hash256,
}

impl StorageObligation {
    /// Creates the obligation at contract formation. The formation
    /// transaction carries the initial (empty-root) revision.
    pub fn new(contract_id: ContractId, formation: Transaction) -> Self {
        StorageObligation {
            contract_id,
            sector_roots: Vec::new(),
            revision_transaction_set: vec![formation],
            cached_root: Hash256::ZERO,
        }
    }

    pub fn contract_id(&self) -> ContractId {
        self.contract_id
    }

    pub fn sector_roots(&self) -> &[Hash256] {
        &self.sector_roots
    }

    /// Contract size implied by the root list.
    pub fn size(&self) -> u64 {
        self.sector_roots.len() as u64 * SECTOR_SIZE
    }

    /// Cached Merkle root of the sector root list.
    pub fn merkle_root(&self) -> Hash256 {
        self.cached_root
    }

    pub fn recent_transaction(&self) -> Result<&Transaction, Error> {
        self.revision_transaction_set.last().ok_or(Error::NoRevision)
    }

    pub fn recent_revision(&self) -> Result<&FileContractRevision, Error> {
        self.recent_transaction()?
            .file_contract_revisions
            .first()
            .ok_or(Error::NoRevision)
    }

    /// Replaces the sector roots after a committed program.
    pub fn set_sector_roots(&mut self, roots: Vec<Hash256>) {
        self.cached_root = root_list_root(&roots);
        self.sector_roots = roots;
    }

    /// Adopts a newly co-signed revision transaction.
    pub fn apply_revision(&mut self, txn: Transaction) {
        self.revision_transaction_set = vec![txn];
    }
}

/// The host's registry of live obligations: a keyed map with one async
/// mutex per contract. That mutex is the obligation lock of the
/// protocol; revisions and program commits serialize on it.
#[derive(Default)]
pub struct ObligationRegistry {
    obligations: RwLock<HashMap<ContractId, Arc<Mutex<StorageObligation>>>>,
}

impl ObligationRegistry {
    pub fn new() -> Self {
        ObligationRegistry::default()
    }

    pub fn insert(&self, obligation: StorageObligation) {
        self.obligations
            .write()
            .insert(obligation.contract_id(), Arc::new(Mutex::new(obligation)));
    }

    /// Removes the record at contract settlement or expiry.
    pub fn remove(&self, id: &ContractId) {
        self.obligations.write().remove(id);
    }

    pub fn contains(&self, id: &ContractId) -> bool {
        self.obligations.read().contains_key(id)
    }

    /// Returns the contract's lockable entry. Locking the entry's mutex
    /// is what licenses reading or writing the obligation; the Arc keeps
    /// it alive even if the contract is settled concurrently.
    pub fn get(&self, id: &ContractId) -> Result<Arc<Mutex<StorageObligation>>, Error> {
        self.obligations
            .read()
            .get(id)
            .cloned()
            .ok_or(Error::UnknownContract(*id))
    }
}
