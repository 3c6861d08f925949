// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod accounts;
mod errors;
mod obligation;
mod payment;
mod revision;
pub mod rpc;
mod storage;
pub mod testing;

pub use self::accounts::*;
pub use self::errors::*;
pub use self::obligation::*;
pub use self::payment::*;
pub use self::revision::*;
pub use self::storage::*;

use self::rpc::{ExecuteProgramRequest, PayByContractRequest, PaymentRequest};
use async_std::future::timeout;
use crypto::Keypair;
use db::Store;
use futures::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use futures::StreamExt;
use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use types::{ContractId, PriceTable, PriceTableUid};
use vm::{Budget, CollateralBudget, ProgramData, ProgramParams};

/// Price tables the host currently honors, keyed by uid. Programs quote
/// a uid; unknown or expired tables are refused before metering starts.
#[derive(Default)]
pub struct PriceTableRegistry {
    tables: RwLock<HashMap<PriceTableUid, PriceTable>>,
}

impl PriceTableRegistry {
    pub fn register(&self, table: PriceTable) {
        self.tables.write().insert(table.uid, table);
    }

    pub fn get(&self, uid: &PriceTableUid, block_height: u64) -> Result<PriceTable, Error> {
        let tables = self.tables.read();
        match tables.get(uid) {
            Some(table) if table.expiry >= block_height => Ok(table.clone()),
            _ => Err(Error::UnknownPriceTable(*uid)),
        }
    }

    /// Drops tables no longer honored at the given height.
    pub fn prune(&self, block_height: u64) {
        self.tables.write().retain(|_, t| t.expiry >= block_height);
    }
}

/// A storage host: obligations, prepaid accounts, the sector store, and
/// the signing key it co-signs revisions with.
pub struct Host<DB> {
    obligations: ObligationRegistry,
    accounts: AccountManager,
    price_tables: PriceTableRegistry,
    store: Arc<SectorStore<DB>>,
    secret_key: Keypair,
    block_height: AtomicU64,
}

impl<DB> Host<DB>
where
    DB: Store + Send + Sync + 'static,
{
    pub fn new(db: DB, secret_key: Keypair) -> Self {
        Host {
            obligations: ObligationRegistry::new(),
            accounts: AccountManager::new(),
            price_tables: PriceTableRegistry::default(),
            store: Arc::new(SectorStore::new(db)),
            secret_key,
            block_height: AtomicU64::new(0),
        }
    }

    pub fn obligations(&self) -> &ObligationRegistry {
        &self.obligations
    }

    pub fn accounts(&self) -> &AccountManager {
        &self.accounts
    }

    pub fn price_tables(&self) -> &PriceTableRegistry {
        &self.price_tables
    }

    pub fn sector_store(&self) -> &Arc<SectorStore<DB>> {
        &self.store
    }

    pub fn public_key(&self) -> crypto::PublicKey {
        self.secret_key.public_key()
    }

    pub(crate) fn secret_key(&self) -> &Keypair {
        &self.secret_key
    }

    pub fn block_height(&self) -> u64 {
        self.block_height.load(Ordering::SeqCst)
    }

    /// Consensus feed: the host trusts its caller for the current height.
    pub fn set_block_height(&self, height: u64) {
        self.block_height.store(height, Ordering::SeqCst);
        self.accounts.prune(height);
        self.price_tables.prune(height);
    }

    /// Serves one payment-plus-program exchange on a stream, bounded by
    /// `deadline`. Timing out cancels in-flight reads and rolls the
    /// program back; nothing commits on any failure path.
    pub async fn serve_stream<S>(&self, stream: S, deadline: Duration) -> Result<(), Error>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        match timeout(deadline, self.handle_stream(stream)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout),
        }
    }

    async fn handle_stream<S>(&self, stream: S) -> Result<(), Error>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (mut r, mut w) = stream.split();

        // Payment strictly precedes the program. For contract payments
        // the obligation lock spans the whole exchange, commit included.
        let request: PaymentRequest = rpc::read_message(&mut r).await?;
        match request.kind {
            rpc::PAY_BY_EPHEMERAL_ACCOUNT => {
                let details = self.pay_by_ephemeral_account(&mut r, &mut w).await?;
                self.serve_program(r, &mut w, details, None).await
            }
            rpc::PAY_BY_CONTRACT => {
                let request: PayByContractRequest = rpc::read_message(&mut r).await?;
                let entry = self.obligations.get(&request.contract_id)?;
                let mut so = entry.lock().await;
                let result = self.pay_by_contract(&mut so, &request, None);
                let details = self.respond_contract_payment(&mut w, result).await?;
                self.serve_program(r, &mut w, details, Some(&mut *so)).await
            }
            kind => {
                let err = Error::UnknownPaymentMethod(kind);
                rpc::write_error(&mut w, &err).await?;
                Err(err)
            }
        }
    }

    /// Runs the program leg of an exchange. `locked` is the obligation
    /// the payment already locked, if the payment was by contract.
    async fn serve_program<R, W>(
        &self,
        mut r: R,
        w: &mut W,
        details: PaymentDetails,
        locked: Option<&mut StorageObligation>,
    ) -> Result<(), Error>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Unpin,
    {
        let request: ExecuteProgramRequest = match rpc::read_message(&mut r).await {
            Ok(request) => request,
            // A payment-only exchange simply closes the stream here.
            Err(Error::MalformedMessage(e)) if e.is_eof() => return Ok(()),
            Err(e) => return Err(e),
        };

        let price_table = match self
            .price_tables
            .get(&request.header.price_table_uid, self.block_height())
        {
            Ok(pt) => pt,
            Err(err) => {
                rpc::write_error(w, &err).await?;
                return Err(err);
            }
        };

        // Resolve the contract context; an ephemeral payment locks the
        // obligation here, a contract payment brought it already locked.
        let ea_entry;
        let mut ea_guard;
        let so: Option<&mut StorageObligation> = match locked {
            Some(so) => {
                if request.contract_id != so.contract_id() {
                    let err = Error::ContractMismatch {
                        payment: so.contract_id(),
                        request: request.contract_id,
                    };
                    rpc::write_error(w, &err).await?;
                    return Err(err);
                }
                Some(so)
            }
            None if request.contract_id == ContractId::default() => None,
            None => {
                ea_entry = self.obligations.get(&request.contract_id)?;
                ea_guard = ea_entry.lock().await;
                Some(&mut *ea_guard)
            }
        };

        let (initial_roots, initial_size) = match &so {
            Some(so) => (so.sector_roots().to_vec(), so.size()),
            None => (Vec::new(), 0),
        };

        let params = ProgramParams {
            price_table,
            budget: Budget::new(details.amount.clone()),
            collateral_budget: CollateralBudget::new(details.collateral.clone()),
            initial_roots,
            initial_size,
        };
        let data = ProgramData::new(r, request.header.data_length);
        let program = match vm::execute_program(
            params,
            &request.header.instructions,
            data,
            self.store.clone(),
        ) {
            Ok(program) => program,
            Err(err) => {
                let err = Error::Program(err);
                rpc::write_error(w, &err).await?;
                return Err(err);
            }
        };

        let mut outputs = program.outputs;
        while let Some(output) = outputs.next().await {
            rpc::write_message(w, &output).await?;
        }
        let finalizer = program.handle.await?;

        let Some(finalizer) = finalizer else {
            debug!("read-only program finished");
            return Ok(());
        };

        // Mutating programs commit atomically under the obligation lock:
        // verify the renter-signed commit revision against the program's
        // post state, write sectors through, then adopt roots and the
        // revision. Nothing persists if any step refuses.
        let so = match so {
            Some(so) => so,
            None => {
                let err = Error::ProgramNeedsContract;
                rpc::write_error(w, &err).await?;
                return Err(err);
            }
        };
        let commit = match request.commit_revision {
            Some(commit) => commit,
            None => {
                let err = Error::MissingCommitRevision;
                rpc::write_error(w, &err).await?;
                return Err(err);
            }
        };
        let post_state = Some((finalizer.new_size(), finalizer.new_merkle_root()));
        let result = self
            .build_payment_transaction(&*so, &commit, post_state)
            .and_then(|(details, txn)| {
                let host_signature = txn
                    .host_signature()
                    .map(|s| s.signature)
                    .ok_or(Error::NoRevision)?;
                finalizer
                    .commit_sectors(self.store.as_ref())
                    .map_err(Error::Program)?;
                so.set_sector_roots(finalizer.roots().to_vec());
                so.apply_revision(txn);
                Ok((details, host_signature))
            });
        self.respond_contract_payment(w, result).await?;
        Ok(())
    }
}
