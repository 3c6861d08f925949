// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{Error, Hash256};
use ed25519_dalek::{Signer, Verifier};
use encoding::{Decodable, Encodable};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::io::{Read, Write};

/// An ed25519 public key.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    pub fn new(bytes: [u8; 32]) -> Self {
        PublicKey(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Verifies a signature over a message hash.
    pub fn verify(&self, hash: &Hash256, signature: &Signature) -> Result<(), Error> {
        let key = ed25519_dalek::VerifyingKey::from_bytes(&self.0)
            .map_err(|e| Error::InvalidPublicKey(e.to_string()))?;
        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
        key.verify(hash.as_ref(), &sig)
            .map_err(|_| Error::InvalidSignature)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ed25519:{}", hex::encode(self.0))
    }
}

impl Encodable for PublicKey {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), encoding::Error> {
        self.0.encode(w)
    }
}

impl Decodable for PublicKey {
    fn decode<R: Read>(r: &mut R) -> Result<Self, encoding::Error> {
        Ok(PublicKey(<[u8; 32]>::decode(r)?))
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let hex_part = s
            .strip_prefix("ed25519:")
            .ok_or_else(|| serde::de::Error::custom("missing ed25519 prefix"))?;
        let bytes = hex::decode(hex_part).map_err(serde::de::Error::custom)?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("invalid public key length"))?;
        Ok(PublicKey(bytes))
    }
}

/// An ed25519 signing keypair.
pub struct Keypair {
    signing: ed25519_dalek::SigningKey,
}

impl Keypair {
    /// Generates a fresh keypair from the OS entropy source.
    pub fn generate() -> Self {
        let signing = ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng);
        Keypair { signing }
    }

    pub fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        Keypair {
            signing: ed25519_dalek::SigningKey::from_bytes(&bytes),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing.verifying_key().to_bytes())
    }

    /// Signs a message hash.
    pub fn sign(&self, hash: &Hash256) -> Signature {
        Signature(self.signing.sign(hash.as_ref()).to_bytes())
    }
}

/// A detached ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    pub fn new(bytes: [u8; 64]) -> Self {
        Signature(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl Default for Signature {
    fn default() -> Self {
        Signature([0u8; 64])
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(self.0))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Encodable for Signature {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), encoding::Error> {
        self.0.encode(w)
    }
}

impl Decodable for Signature {
    fn decode<R: Read>(r: &mut R) -> Result<Self, encoding::Error> {
        Ok(Signature(<[u8; 64]>::decode(r)?))
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        hex::encode(self.0).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
        let bytes: [u8; 64] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("invalid signature length"))?;
        Ok(Signature(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blake2b_256;

    #[test]
    fn sign_and_verify() {
        let key = Keypair::generate();
        let hash = blake2b_256(b"payment revision");
        let sig = key.sign(&hash);
        key.public_key().verify(&hash, &sig).unwrap();

        let other = blake2b_256(b"tampered");
        assert_eq!(
            key.public_key().verify(&other, &sig),
            Err(Error::InvalidSignature)
        );
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let key = Keypair::generate();
        let hash = blake2b_256(b"msg");
        let sig = key.sign(&hash);
        let stranger = Keypair::generate();
        assert!(stranger.public_key().verify(&hash, &sig).is_err());
    }
}
