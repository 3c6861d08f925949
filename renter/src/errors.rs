// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

/// Renter error
#[derive(Debug, Error)]
pub enum Error {
    #[error("metadata and fanout exceed the base sector: {header} of {limit} bytes")]
    MetadataTooBig { header: u64, limit: u64 },
    #[error("skylink is blocked")]
    Blocked,
    #[error("offset {offset} and length {length} do not fit the skylink grid")]
    InvalidOffsetLength { offset: u64, length: u64 },
    #[error("invalid skylink: {0}")]
    InvalidSkylink(String),
    #[error("unsupported skyfile version {0}")]
    BadVersion(u8),
    #[error("skyfile is encrypted and decryption is not supported")]
    EncryptionNotSupported,
    #[error("malformed skyfile: {0}")]
    Malformed(String),
    #[error("uploaded sector root {actual} does not match expected {expected}")]
    RootMismatch {
        expected: crypto::Hash256,
        actual: crypto::Hash256,
    },
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),
    #[error("erasure coding failed: {0}")]
    ErasureCoder(String),
    #[error("transfer failed: {0}")]
    Transfer(String),
}
