// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{Currency, Error};
use crypto::{blake2b_256, Hash256, PublicKey};
use encoding::{to_vec, Decodable, Encodable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

/// Identifier of a file contract on chain.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ContractId(pub Hash256);

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ContractId {
    type Err = crypto::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ContractId(Hash256::from_str(s)?))
    }
}

impl Encodable for ContractId {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), encoding::Error> {
        self.0.encode(w)
    }
}

impl Decodable for ContractId {
    fn decode<R: Read>(r: &mut R) -> Result<Self, encoding::Error> {
        Ok(ContractId(Hash256::decode(r)?))
    }
}

/// Hash of the conditions that must be met to spend an output.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct UnlockHash(pub Hash256);

impl fmt::Display for UnlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Encodable for UnlockHash {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), encoding::Error> {
        self.0.encode(w)
    }
}

impl Decodable for UnlockHash {
    fn decode<R: Read>(r: &mut R) -> Result<Self, encoding::Error> {
        Ok(UnlockHash(Hash256::decode(r)?))
    }
}

/// A value paid out to an unlock hash when a contract resolves.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractOutput {
    pub value: Currency,
    pub unlock_hash: UnlockHash,
}

impl Encodable for ContractOutput {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), encoding::Error> {
        self.value.encode(w)?;
        self.unlock_hash.encode(w)
    }
}

impl Decodable for ContractOutput {
    fn decode<R: Read>(r: &mut R) -> Result<Self, encoding::Error> {
        Ok(ContractOutput {
            value: Currency::decode(r)?,
            unlock_hash: UnlockHash::decode(r)?,
        })
    }
}

/// The keys allowed to revise a contract. Renter key at index 0, host
/// key at index 1, both signatures required.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockConditions {
    pub timelock: u64,
    pub public_keys: Vec<PublicKey>,
    pub signatures_required: u64,
}

impl UnlockConditions {
    pub fn new(renter_key: PublicKey, host_key: PublicKey) -> Self {
        UnlockConditions {
            timelock: 0,
            public_keys: vec![renter_key, host_key],
            signatures_required: 2,
        }
    }

    pub fn renter_key(&self) -> Option<&PublicKey> {
        self.public_keys.first()
    }

    pub fn host_key(&self) -> Option<&PublicKey> {
        self.public_keys.get(1)
    }
}

impl Encodable for UnlockConditions {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), encoding::Error> {
        self.timelock.encode(w)?;
        self.public_keys.encode(w)?;
        self.signatures_required.encode(w)
    }
}

impl Decodable for UnlockConditions {
    fn decode<R: Read>(r: &mut R) -> Result<Self, encoding::Error> {
        Ok(UnlockConditions {
            timelock: u64::decode(r)?,
            public_keys: Vec::decode(r)?,
            signatures_required: u64::decode(r)?,
        })
    }
}

// Output vector conventions. A revision's valid outputs are
// [renter, host]; its missed outputs are [renter, host, void].
const VALID_RENTER: usize = 0;
const VALID_HOST: usize = 1;
const MISSED_RENTER: usize = 0;
const MISSED_HOST: usize = 1;
const MISSED_VOID: usize = 2;

/// Updated terms of a file contract. A revision supersedes its
/// predecessor once both parties have signed it; the revision number is
/// strictly increasing along the chain of accepted revisions.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContractRevision {
    pub parent_id: ContractId,
    pub unlock_conditions: UnlockConditions,
    pub revision_number: u64,
    pub filesize: u64,
    pub file_merkle_root: Hash256,
    pub window_start: u64,
    pub window_end: u64,
    pub valid_proof_outputs: Vec<ContractOutput>,
    pub missed_proof_outputs: Vec<ContractOutput>,
    pub unlock_hash: UnlockHash,
}

impl FileContractRevision {
    pub fn valid_renter_output(&self) -> Result<&ContractOutput, Error> {
        self.valid_proof_outputs
            .get(VALID_RENTER)
            .ok_or(Error::MissingOutput("valid renter"))
    }

    pub fn valid_host_output(&self) -> Result<&ContractOutput, Error> {
        self.valid_proof_outputs
            .get(VALID_HOST)
            .ok_or(Error::MissingOutput("valid host"))
    }

    pub fn missed_renter_output(&self) -> Result<&ContractOutput, Error> {
        self.missed_proof_outputs
            .get(MISSED_RENTER)
            .ok_or(Error::MissingOutput("missed renter"))
    }

    pub fn missed_host_output(&self) -> Result<&ContractOutput, Error> {
        self.missed_proof_outputs
            .get(MISSED_HOST)
            .ok_or(Error::MissingOutput("missed host"))
    }

    pub fn missed_void_output(&self) -> Result<&ContractOutput, Error> {
        self.missed_proof_outputs
            .get(MISSED_VOID)
            .ok_or(Error::MissingOutput("missed void"))
    }

    pub fn valid_renter_payout(&self) -> Result<Currency, Error> {
        Ok(self.valid_renter_output()?.value.clone())
    }

    pub fn valid_host_payout(&self) -> Result<Currency, Error> {
        Ok(self.valid_host_output()?.value.clone())
    }

    /// Hash covered by the renter and host revision signatures.
    pub fn sig_hash(&self) -> Hash256 {
        // Encoding a revision into a Vec cannot fail.
        blake2b_256(&to_vec(self).expect("revision encoding is infallible"))
    }
}

impl Encodable for FileContractRevision {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), encoding::Error> {
        self.parent_id.encode(w)?;
        self.unlock_conditions.encode(w)?;
        self.revision_number.encode(w)?;
        self.filesize.encode(w)?;
        self.file_merkle_root.encode(w)?;
        self.window_start.encode(w)?;
        self.window_end.encode(w)?;
        self.valid_proof_outputs.encode(w)?;
        self.missed_proof_outputs.encode(w)?;
        self.unlock_hash.encode(w)
    }
}

impl Decodable for FileContractRevision {
    fn decode<R: Read>(r: &mut R) -> Result<Self, encoding::Error> {
        Ok(FileContractRevision {
            parent_id: ContractId::decode(r)?,
            unlock_conditions: UnlockConditions::decode(r)?,
            revision_number: u64::decode(r)?,
            filesize: u64::decode(r)?,
            file_merkle_root: Hash256::decode(r)?,
            window_start: u64::decode(r)?,
            window_end: u64::decode(r)?,
            valid_proof_outputs: Vec::decode(r)?,
            missed_proof_outputs: Vec::decode(r)?,
            unlock_hash: UnlockHash::decode(r)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding::from_slice;

    fn revision() -> FileContractRevision {
        FileContractRevision {
            parent_id: ContractId(blake2b_256(b"contract")),
            revision_number: 7,
            filesize: SECTOR_TEST_SIZE,
            file_merkle_root: blake2b_256(b"root"),
            window_start: 100,
            window_end: 200,
            valid_proof_outputs: vec![
                ContractOutput {
                    value: Currency::from(2_000u64),
                    unlock_hash: UnlockHash(blake2b_256(b"renter")),
                },
                ContractOutput {
                    value: Currency::from(1_000u64),
                    unlock_hash: UnlockHash(blake2b_256(b"host")),
                },
            ],
            missed_proof_outputs: vec![
                ContractOutput {
                    value: Currency::from(2_000u64),
                    unlock_hash: UnlockHash(blake2b_256(b"renter")),
                },
                ContractOutput {
                    value: Currency::from(500u64),
                    unlock_hash: UnlockHash(blake2b_256(b"host")),
                },
                ContractOutput {
                    value: Currency::from(100u64),
                    unlock_hash: UnlockHash::default(),
                },
            ],
            ..Default::default()
        }
    }

    const SECTOR_TEST_SIZE: u64 = 1 << 22;

    #[test]
    fn revision_wire_round_trip() {
        let rev = revision();
        let bz = to_vec(&rev).unwrap();
        assert_eq!(from_slice::<FileContractRevision>(&bz).unwrap(), rev);
    }

    #[test]
    fn payout_accessors() {
        let rev = revision();
        assert_eq!(rev.valid_renter_payout().unwrap(), Currency::from(2_000u64));
        assert_eq!(rev.valid_host_payout().unwrap(), Currency::from(1_000u64));
        assert_eq!(
            rev.missed_void_output().unwrap().value,
            Currency::from(100u64)
        );

        let empty = FileContractRevision::default();
        assert_eq!(
            empty.valid_renter_output(),
            Err(Error::MissingOutput("valid renter"))
        );
    }

    #[test]
    fn sig_hash_tracks_content() {
        let rev = revision();
        let mut altered = rev.clone();
        altered.revision_number += 1;
        assert_ne!(rev.sig_hash(), altered.sig_hash());
    }
}
