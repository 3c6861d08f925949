// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Drives the skyfile encoder against a real host: every sector upload
//! is a paid Append program, every fetch a paid ReadSector program.

use async_std::task;
use async_trait::async_trait;
use byteorder::{ByteOrder, LittleEndian};
use crypto::{Hash256, Keypair};
use db::MemoryDB;
use futures::io::AsyncWriteExt;
use grove_renter::{
    download_skylink, pin_skylink, upload_skyfile, Blocklist, Error, ReplicationCoder,
    SectorFetcher, SectorUploader, SkyfileUploadParams,
};
use host::rpc::{
    self, ExecuteProgramRequest, PayByContractRequest, PayByContractResponse,
    PayByEphemeralAccountRequest, PayByEphemeralAccountResponse, PaymentRequest, PAY_BY_CONTRACT,
    PAY_BY_EPHEMERAL_ACCOUNT,
};
use host::testing::pipe;
use host::{Host, StorageObligation};
use merkle::root_list_root;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use types::{
    AccountId, ContractId, ContractOutput, CoveredFields, Currency, FileContractRevision,
    PriceTable, PriceTableUid, Transaction, TransactionSignature, UnlockConditions, UnlockHash,
    WithdrawalMessage, SECTOR_SIZE,
};
use vm::{InstructionFrame, Output, ProgramHeader, SPECIFIER_APPEND, SPECIFIER_READ_SECTOR};

const BLOCK_HEIGHT: u64 = 1_500;

struct HostBackedNet {
    host: Arc<Host<MemoryDB>>,
    contract_id: ContractId,
    renter_key: Keypair,
    account_key: Keypair,
    price_table: PriceTable,
    nonce: AtomicU64,
}

impl HostBackedNet {
    fn new() -> Self {
        let host = Arc::new(Host::new(MemoryDB::default(), Keypair::generate()));
        host.set_block_height(BLOCK_HEIGHT);

        let price_table = nominal_price_table();
        host.price_tables().register(price_table.clone());

        let renter_key = Keypair::generate();
        let contract_id = ContractId(crypto::blake2b_256(b"skynet-contract"));
        let formation = Transaction {
            file_contract_revisions: vec![FileContractRevision {
                parent_id: contract_id,
                unlock_conditions: UnlockConditions::new(
                    renter_key.public_key(),
                    host.public_key(),
                ),
                revision_number: 0,
                filesize: 0,
                file_merkle_root: Hash256::ZERO,
                window_start: 100_000,
                window_end: 200_000,
                valid_proof_outputs: vec![
                    ContractOutput {
                        value: Currency::new(1 << 60),
                        unlock_hash: UnlockHash(crypto::blake2b_256(b"renter-addr")),
                    },
                    ContractOutput {
                        value: Currency::zero(),
                        unlock_hash: UnlockHash(crypto::blake2b_256(b"host-addr")),
                    },
                ],
                missed_proof_outputs: vec![
                    ContractOutput {
                        value: Currency::new(1 << 60),
                        unlock_hash: UnlockHash(crypto::blake2b_256(b"renter-addr")),
                    },
                    ContractOutput {
                        value: Currency::new(1 << 60),
                        unlock_hash: UnlockHash(crypto::blake2b_256(b"host-addr")),
                    },
                    ContractOutput {
                        value: Currency::zero(),
                        unlock_hash: UnlockHash::default(),
                    },
                ],
                unlock_hash: UnlockHash::default(),
            }],
            signatures: vec![],
        };
        host.obligations()
            .insert(StorageObligation::new(contract_id, formation));

        let account_key = Keypair::generate();
        host.accounts().deposit(
            AccountId(account_key.public_key()),
            Currency::new(1 << 60),
        );

        HostBackedNet {
            host,
            contract_id,
            renter_key,
            account_key,
            price_table,
            nonce: AtomicU64::new(1),
        }
    }

    async fn current_revision(&self) -> FileContractRevision {
        let entry = self.host.obligations().get(&self.contract_id).unwrap();
        let so = entry.lock().await;
        so.recent_revision().unwrap().clone()
    }

    /// Signs a payment request over the revision the host will build.
    fn sign_request(
        &self,
        predicted: &FileContractRevision,
    ) -> PayByContractRequest {
        let txn = Transaction {
            file_contract_revisions: vec![predicted.clone()],
            signatures: vec![TransactionSignature {
                parent_id: self.contract_id.0,
                public_key_index: 0,
                covered_fields: CoveredFields::first_revision(),
                signature: Default::default(),
            }],
        };
        let signature = self.renter_key.sign(&txn.sig_hash(0).unwrap());
        PayByContractRequest {
            contract_id: self.contract_id,
            new_revision_number: predicted.revision_number,
            new_valid_values: predicted
                .valid_proof_outputs
                .iter()
                .map(|o| o.value.clone())
                .collect(),
            new_missed_values: predicted
                .missed_proof_outputs
                .iter()
                .map(|o| o.value.clone())
                .collect(),
            signature,
        }
    }

    fn debit(revision: &mut FileContractRevision, amount: u64, collateral: u64) {
        let amount = Currency::from(amount);
        let collateral = Currency::from(collateral);
        revision.valid_proof_outputs[0].value = revision.valid_proof_outputs[0]
            .value
            .checked_sub(&amount)
            .unwrap();
        revision.valid_proof_outputs[1].value =
            revision.valid_proof_outputs[1].value.clone() + amount;
        revision.missed_proof_outputs[1].value = revision.missed_proof_outputs[1]
            .value
            .checked_sub(&collateral)
            .unwrap();
        revision.missed_proof_outputs[2].value =
            revision.missed_proof_outputs[2].value.clone() + collateral;
    }
}

fn nominal_price_table() -> PriceTable {
    PriceTable {
        uid: PriceTableUid([9u8; 16]),
        expiry: 100_000,
        init_base_cost: Currency::from(1u64),
        read_base_cost: Currency::from(1u64),
        read_length_cost: Currency::from(1u64),
        write_base_cost: Currency::from(1u64),
        write_length_cost: Currency::from(1u64),
        store_length_cost: Currency::from(1u64),
        drop_sectors_base_cost: Currency::from(1u64),
        drop_sectors_unit_cost: Currency::from(1u64),
        swap_sector_base_cost: Currency::from(1u64),
        has_sector_base_cost: Currency::from(1u64),
        memory_time_cost: Currency::zero(),
        collateral_cost: Currency::from(1u64),
    }
}

#[async_trait]
impl SectorUploader for HostBackedNet {
    async fn upload_sector(&self, data: Vec<u8>) -> Result<Hash256, Error> {
        let sector_root = merkle::sector_root(&data);

        // Serialize uploads through the host's obligation lock by
        // simply running one exchange at a time.
        let current = self.current_revision().await;
        let amount = 2 * SECTOR_SIZE + 2;
        let collateral = SECTOR_SIZE;

        let mut payment = current.clone();
        payment.revision_number = current.revision_number + 1;
        Self::debit(&mut payment, amount, collateral);
        let payment_request = self.sign_request(&payment);

        let entry = self.host.obligations().get(&self.contract_id).unwrap();
        let mut new_roots = {
            let so = entry.lock().await;
            so.sector_roots().to_vec()
        };
        new_roots.push(sector_root);
        let mut commit = payment.clone();
        commit.revision_number = payment.revision_number + 1;
        commit.filesize = new_roots.len() as u64 * SECTOR_SIZE;
        commit.file_merkle_root = root_list_root(&new_roots);
        let commit_request = self.sign_request(&commit);

        let (mut client, server) = pipe();
        let host = self.host.clone();
        let serving =
            task::spawn(
                async move { host.serve_stream(server, Duration::from_secs(60)).await },
            );

        let map_err = |e: host::Error| Error::Transfer(e.to_string());
        rpc::write_message(
            &mut client,
            &PaymentRequest {
                kind: PAY_BY_CONTRACT,
            },
        )
        .await
        .map_err(map_err)?;
        rpc::write_message(&mut client, &payment_request)
            .await
            .map_err(map_err)?;
        let _: PayByContractResponse = rpc::read_response(&mut client).await.map_err(map_err)?;

        let mut args = [0u8; 9];
        LittleEndian::write_u64(&mut args, 0);
        rpc::write_message(
            &mut client,
            &ExecuteProgramRequest {
                contract_id: self.contract_id,
                header: ProgramHeader {
                    price_table_uid: self.price_table.uid,
                    instructions: vec![InstructionFrame {
                        specifier: SPECIFIER_APPEND,
                        args: args.to_vec(),
                    }],
                    data_length: SECTOR_SIZE,
                },
                commit_revision: Some(commit_request),
            },
        )
        .await
        .map_err(map_err)?;
        client.write_all(&data).await.map_err(|e| Error::Transfer(e.to_string()))?;
        client.flush().await.map_err(|e| Error::Transfer(e.to_string()))?;

        let output: Output = rpc::read_message(&mut client).await.map_err(map_err)?;
        if let Some(err) = output.error {
            return Err(Error::Transfer(err));
        }
        let _: PayByContractResponse = rpc::read_response(&mut client).await.map_err(map_err)?;
        serving
            .await
            .map_err(|e| Error::Transfer(e.to_string()))?;
        Ok(sector_root)
    }
}

#[async_trait]
impl SectorFetcher for HostBackedNet {
    async fn fetch_sector(
        &self,
        root: Hash256,
        offset: u64,
        length: u64,
    ) -> Result<Vec<u8>, Error> {
        let message = WithdrawalMessage {
            account: AccountId(self.account_key.public_key()),
            amount: Currency::from(length + 2),
            nonce: self.nonce.fetch_add(1, Ordering::SeqCst),
            expiry: BLOCK_HEIGHT + 100,
        };
        let signature = self.account_key.sign(&message.sig_hash());

        let (mut client, server) = pipe();
        let host = self.host.clone();
        let serving =
            task::spawn(
                async move { host.serve_stream(server, Duration::from_secs(60)).await },
            );

        let map_err = |e: host::Error| Error::Transfer(e.to_string());
        rpc::write_message(
            &mut client,
            &PaymentRequest {
                kind: PAY_BY_EPHEMERAL_ACCOUNT,
            },
        )
        .await
        .map_err(map_err)?;
        rpc::write_message(
            &mut client,
            &PayByEphemeralAccountRequest {
                message,
                priority: 0,
                signature,
            },
        )
        .await
        .map_err(map_err)?;
        let _: PayByEphemeralAccountResponse =
            rpc::read_response(&mut client).await.map_err(map_err)?;

        // ReadSector args point at the 48 bytes of parameter data:
        // length, offset, then the root.
        let mut data = Vec::with_capacity(48);
        data.extend_from_slice(&length.to_le_bytes());
        data.extend_from_slice(&offset.to_le_bytes());
        data.extend_from_slice(root.as_ref());

        let mut args = [0u8; 25];
        LittleEndian::write_u64(&mut args[0..], 0);
        LittleEndian::write_u64(&mut args[8..], 8);
        LittleEndian::write_u64(&mut args[16..], 16);
        rpc::write_message(
            &mut client,
            &ExecuteProgramRequest {
                contract_id: self.contract_id,
                header: ProgramHeader {
                    price_table_uid: self.price_table.uid,
                    instructions: vec![InstructionFrame {
                        specifier: SPECIFIER_READ_SECTOR,
                        args: args.to_vec(),
                    }],
                    data_length: 48,
                },
                commit_revision: None,
            },
        )
        .await
        .map_err(map_err)?;
        client.write_all(&data).await.map_err(|e| Error::Transfer(e.to_string()))?;
        client.flush().await.map_err(|e| Error::Transfer(e.to_string()))?;

        let output: Output = rpc::read_message(&mut client).await.map_err(map_err)?;
        serving
            .await
            .map_err(|e| Error::Transfer(e.to_string()))?;
        if let Some(err) = output.error {
            return Err(Error::Transfer(err));
        }
        Ok(output.output)
    }
}

#[test]
fn skyfile_round_trip_over_live_host() {
    task::block_on(async {
        let net = HostBackedNet::new();
        let blocklist = Blocklist::new();
        let coder = ReplicationCoder::new(1);

        let mut data = b"hello".to_vec();
        data.resize(1024, b'~');
        let params = SkyfileUploadParams {
            filename: "a.txt".to_string(),
            mode: 0o644,
        };

        let link = upload_skyfile(&net, &blocklist, &coder, &params, &data)
            .await
            .unwrap();
        assert_eq!(link.version(), 1);
        let (offset, _) = link.offset_and_fetch_size();
        assert_eq!(offset, 0);

        // The committed contract state carries the base sector: the
        // latest revision's root matches the obligation's cached root.
        {
            let entry = net.host.obligations().get(&net.contract_id).unwrap();
            let so = entry.lock().await;
            assert_eq!(so.sector_roots().len(), 1);
            assert_eq!(so.merkle_root(), root_list_root(so.sector_roots()));
            assert_eq!(
                so.recent_revision().unwrap().file_merkle_root,
                so.merkle_root()
            );
        }

        let (layout, metadata, downloaded) =
            download_skylink(&net, &blocklist, &coder, &link).await.unwrap();
        assert_eq!(layout.filesize, 1024);
        assert_eq!(metadata.filename, "a.txt");
        assert_eq!(downloaded, data);

        // Pinning replays the upload and lands on the same identifier.
        let pinned = pin_skylink(&net, &net, &blocklist, &link).await.unwrap();
        assert_eq!(pinned, link);
    })
}

#[test]
fn larger_skyfile_over_live_host() {
    task::block_on(async {
        let net = HostBackedNet::new();
        let blocklist = Blocklist::new();
        let coder = ReplicationCoder::new(1);

        let len = SECTOR_SIZE as usize + 4_096;
        let data: Vec<u8> = (0..len).map(|i| (i % 233) as u8).collect();
        let params = SkyfileUploadParams {
            filename: "big.bin".to_string(),
            mode: 0o600,
        };

        let link = upload_skyfile(&net, &blocklist, &coder, &params, &data)
            .await
            .unwrap();
        let (_, metadata, downloaded) =
            download_skylink(&net, &blocklist, &coder, &link).await.unwrap();
        assert_eq!(metadata.length, len as u64);
        assert_eq!(downloaded, data);

        // Base sector plus two fanout sectors made it into the contract.
        let entry = net.host.obligations().get(&net.contract_id).unwrap();
        let so = entry.lock().await;
        assert_eq!(so.sector_roots().len(), 3);
    })
}
