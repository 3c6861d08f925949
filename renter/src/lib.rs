// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod blocklist;
mod download;
mod errors;
mod pin;
mod skyfile;
mod skylink;
mod upload;

pub use self::blocklist::*;
pub use self::download::*;
pub use self::errors::*;
pub use self::pin::*;
pub use self::skyfile::*;
pub use self::skylink::*;
pub use self::upload::*;

use async_trait::async_trait;
use crypto::Hash256;

/// Default replication factor for base sectors. Every replica carries
/// identical bytes, so every replica has the same Merkle root; that is
/// what makes a skylink resolvable against any host holding one.
pub const BASE_REDUNDANCY: u8 = 10;

/// Uploads whole sectors to the network. Implementations replicate the
/// base sector 1-of-N; the returned root must equal the Merkle root of
/// the uploaded bytes (callers check).
#[async_trait]
pub trait SectorUploader: Send + Sync {
    async fn upload_sector(&self, data: Vec<u8>) -> Result<Hash256, Error>;
}

/// Fetches a byte range of a sector by its root.
#[async_trait]
pub trait SectorFetcher: Send + Sync {
    async fn fetch_sector(&self, root: Hash256, offset: u64, length: u64)
        -> Result<Vec<u8>, Error>;
}

/// The erasure-coding seam. Chunks of `data_pieces * SECTOR_SIZE` bytes
/// encode into `data_pieces + parity_pieces` sector-sized pieces; any
/// `data_pieces` of them reconstruct the chunk.
pub trait ErasureCoder: Send + Sync {
    fn data_pieces(&self) -> u8;
    fn parity_pieces(&self) -> u8;
    fn encode(&self, chunk: &[u8]) -> Result<Vec<Vec<u8>>, Error>;
    fn reconstruct(&self, pieces: Vec<Option<Vec<u8>>>) -> Result<Vec<u8>, Error>;
}

/// Trivial 1-of-N coding: every piece is the chunk itself. Used for
/// base sectors and as the test coder.
pub struct ReplicationCoder {
    replicas: u8,
}

impl ReplicationCoder {
    pub fn new(replicas: u8) -> Self {
        assert!(replicas >= 1, "replication needs at least one piece");
        ReplicationCoder { replicas }
    }
}

impl ErasureCoder for ReplicationCoder {
    fn data_pieces(&self) -> u8 {
        1
    }

    fn parity_pieces(&self) -> u8 {
        self.replicas - 1
    }

    fn encode(&self, chunk: &[u8]) -> Result<Vec<Vec<u8>>, Error> {
        let sector_size = types::SECTOR_SIZE as usize;
        if chunk.len() > sector_size {
            return Err(Error::ErasureCoder(format!(
                "replication chunk of {} bytes exceeds one sector",
                chunk.len()
            )));
        }
        let mut piece = chunk.to_vec();
        piece.resize(sector_size, 0);
        Ok(vec![piece; self.replicas as usize])
    }

    fn reconstruct(&self, pieces: Vec<Option<Vec<u8>>>) -> Result<Vec<u8>, Error> {
        pieces
            .into_iter()
            .flatten()
            .next()
            .ok_or_else(|| Error::ErasureCoder("no piece available".to_string()))
    }
}
