// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{Error, FileContractRevision};
use crypto::{blake2b_256, Hash256, Signature};
use encoding::{Decodable, Encodable};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// The subset of a transaction a signature commits to. Payment revisions
/// always cover exactly the first file contract revision.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoveredFields {
    pub file_contract_revisions: Vec<u64>,
}

impl CoveredFields {
    /// Covers `file_contract_revisions[0]` only.
    pub fn first_revision() -> Self {
        CoveredFields {
            file_contract_revisions: vec![0],
        }
    }
}

impl Encodable for CoveredFields {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), encoding::Error> {
        self.file_contract_revisions.encode(w)
    }
}

impl Decodable for CoveredFields {
    fn decode<R: Read>(r: &mut R) -> Result<Self, encoding::Error> {
        Ok(CoveredFields {
            file_contract_revisions: Vec::decode(r)?,
        })
    }
}

/// A signature over the covered fields of a transaction. Key index 0 is
/// the renter, 1 the host, per the contract's unlock conditions.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSignature {
    pub parent_id: Hash256,
    pub public_key_index: u64,
    pub covered_fields: CoveredFields,
    pub signature: Signature,
}

impl Encodable for TransactionSignature {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), encoding::Error> {
        self.parent_id.encode(w)?;
        self.public_key_index.encode(w)?;
        self.covered_fields.encode(w)?;
        self.signature.encode(w)
    }
}

impl Decodable for TransactionSignature {
    fn decode<R: Read>(r: &mut R) -> Result<Self, encoding::Error> {
        Ok(TransactionSignature {
            parent_id: Hash256::decode(r)?,
            public_key_index: u64::decode(r)?,
            covered_fields: CoveredFields::decode(r)?,
            signature: Signature::decode(r)?,
        })
    }
}

/// The revision transaction persisted in a storage obligation: the
/// latest accepted revision plus both party signatures.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub file_contract_revisions: Vec<FileContractRevision>,
    pub signatures: Vec<TransactionSignature>,
}

impl Transaction {
    /// Transaction identifier: the hash of the transaction without its
    /// signatures.
    pub fn id(&self) -> Hash256 {
        let mut buf = Vec::new();
        self.file_contract_revisions
            .encode(&mut buf)
            .expect("transaction encoding is infallible");
        blake2b_256(&buf)
    }

    /// Hash covered by the signature at `sig_index`: the covered
    /// revisions followed by the signature's parent id and key index.
    pub fn sig_hash(&self, sig_index: usize) -> Result<Hash256, Error> {
        let sig = self
            .signatures
            .get(sig_index)
            .ok_or(Error::SignatureIndex(sig_index))?;
        let mut buf = Vec::new();
        for &i in &sig.covered_fields.file_contract_revisions {
            let revision = self
                .file_contract_revisions
                .get(i as usize)
                .ok_or(Error::CoveredFieldIndex(i))?;
            revision
                .encode(&mut buf)
                .expect("revision encoding is infallible");
        }
        sig.parent_id
            .encode(&mut buf)
            .expect("hash encoding is infallible");
        sig.public_key_index
            .encode(&mut buf)
            .expect("u64 encoding is infallible");
        Ok(blake2b_256(&buf))
    }

    /// Signature attributed to the host (key index 1), if present.
    pub fn host_signature(&self) -> Option<&TransactionSignature> {
        self.signatures.iter().find(|s| s.public_key_index == 1)
    }
}

impl Encodable for Transaction {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), encoding::Error> {
        self.file_contract_revisions.encode(w)?;
        self.signatures.encode(w)
    }
}

impl Decodable for Transaction {
    fn decode<R: Read>(r: &mut R) -> Result<Self, encoding::Error> {
        Ok(Transaction {
            file_contract_revisions: Vec::decode(r)?,
            signatures: Vec::decode(r)?,
        })
    }
}
