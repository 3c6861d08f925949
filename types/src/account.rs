// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::Currency;
use crypto::{blake2b_256, Hash256, PublicKey};
use encoding::{Decodable, Encodable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};

/// Identifier of an ephemeral account: the client's ed25519 public key.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct AccountId(pub PublicKey);

impl AccountId {
    pub fn public_key(&self) -> &PublicKey {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Encodable for AccountId {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), encoding::Error> {
        self.0.encode(w)
    }
}

impl Decodable for AccountId {
    fn decode<R: Read>(r: &mut R) -> Result<Self, encoding::Error> {
        Ok(AccountId(PublicKey::decode(r)?))
    }
}

/// A signed instruction to debit an ephemeral account. The nonce makes
/// each message unique; the expiry bounds how long the host must track
/// it for replay protection.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalMessage {
    pub account: AccountId,
    pub amount: Currency,
    pub nonce: u64,
    pub expiry: u64,
}

impl WithdrawalMessage {
    /// Hash signed by the account owner. Doubles as the replay
    /// fingerprint for the message.
    pub fn sig_hash(&self) -> Hash256 {
        let mut buf = Vec::new();
        self.encode(&mut buf)
            .expect("withdrawal encoding is infallible");
        blake2b_256(&buf)
    }
}

impl Encodable for WithdrawalMessage {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), encoding::Error> {
        self.account.encode(w)?;
        self.amount.encode(w)?;
        self.nonce.encode(w)?;
        self.expiry.encode(w)
    }
}

impl Decodable for WithdrawalMessage {
    fn decode<R: Read>(r: &mut R) -> Result<Self, encoding::Error> {
        Ok(WithdrawalMessage {
            account: AccountId::decode(r)?,
            amount: Currency::decode(r)?,
            nonce: u64::decode(r)?,
            expiry: u64::decode(r)?,
        })
    }
}
