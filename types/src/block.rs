// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{ContractOutput, Transaction};
use crypto::{blake2b_256, Hash256};
use encoding::{Decodable, Encodable};
use merkle::Tree;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// The data that, when hashed, produces a block's id.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    pub parent_id: Hash256,
    pub nonce: [u8; 8],
    pub timestamp: u64,
    pub merkle_root: Hash256,
}

impl BlockHeader {
    pub fn id(&self) -> Hash256 {
        let mut buf = Vec::new();
        self.encode(&mut buf).expect("header encoding is infallible");
        blake2b_256(&buf)
    }
}

impl Encodable for BlockHeader {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), encoding::Error> {
        self.parent_id.encode(w)?;
        self.nonce.encode(w)?;
        self.timestamp.encode(w)?;
        self.merkle_root.encode(w)
    }
}

impl Decodable for BlockHeader {
    fn decode<R: Read>(r: &mut R) -> Result<Self, encoding::Error> {
        Ok(BlockHeader {
            parent_id: Hash256::decode(r)?,
            nonce: <[u8; 8]>::decode(r)?,
            timestamp: u64::decode(r)?,
            merkle_root: Hash256::decode(r)?,
        })
    }
}

/// A bundle of revision transactions under a header. The Merkle leaves
/// are the encoded miner payouts followed by the encoded transactions.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub parent_id: Hash256,
    pub nonce: [u8; 8],
    pub timestamp: u64,
    pub miner_payouts: Vec<ContractOutput>,
    pub transactions: Vec<Transaction>,
}

impl Block {
    fn content_tree(&self) -> Tree {
        let mut tree = Tree::new();
        let mut buf = Vec::new();
        for payout in &self.miner_payouts {
            payout.encode(&mut buf).expect("payout encoding is infallible");
            tree.push(&buf);
            buf.clear();
        }
        for txn in &self.transactions {
            txn.encode(&mut buf).expect("transaction encoding is infallible");
            tree.push(&buf);
            buf.clear();
        }
        tree
    }

    pub fn merkle_root(&self) -> Hash256 {
        self.content_tree().root()
    }

    pub fn header(&self) -> BlockHeader {
        BlockHeader {
            parent_id: self.parent_id,
            nonce: self.nonce,
            timestamp: self.timestamp,
            merkle_root: self.merkle_root(),
        }
    }

    pub fn id(&self) -> Hash256 {
        self.header().id()
    }

    /// The template handed to miners. `merkle_branches` carries the live
    /// subtree roots of the content tree so a miner can extend it with a
    /// coinbase leaf without the full transaction set.
    pub fn template(&self, height: u64, target: Hash256) -> BlockTemplate {
        let branches = self
            .content_tree()
            .branches()
            .into_iter()
            .map(|(_, hash)| hash.to_string())
            .collect();
        BlockTemplate {
            parent_id: self.parent_id,
            nonce: self.nonce,
            timestamp: self.timestamp,
            miner_payouts: self.miner_payouts.clone(),
            transactions: self.transactions.iter().map(Transaction::id).collect(),
            target,
            height,
            merkle_branches: branches,
        }
    }
}

/// Work offered to an external miner, serialized as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockTemplate {
    pub parent_id: Hash256,
    pub nonce: [u8; 8],
    pub timestamp: u64,
    pub miner_payouts: Vec<ContractOutput>,
    pub transactions: Vec<Hash256>,
    pub target: Hash256,
    pub height: u64,
    pub merkle_branches: Vec<String>,
}
