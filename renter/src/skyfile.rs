// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::Error;
use crypto::Hash256;
use serde::{Deserialize, Serialize};
use types::SECTOR_SIZE;

/// Encoded size of a skyfile layout header.
pub const SKYFILE_LAYOUT_SIZE: usize = 99;

/// Current skyfile version.
pub const SKYFILE_VERSION: u8 = 1;

/// Cipher indicator stored in the layout. Only plaintext skyfiles are
/// produced; the indicator and key material keep the seam open for
/// encrypted ones.
pub const CIPHER_PLAIN: [u8; 8] = *b"plain\0\0\0";

/// The fixed-size header leading every base sector. Field order on the
/// wire is the declaration order below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkyfileLayout {
    pub version: u8,
    pub filesize: u64,
    pub metadata_size: u64,
    pub fanout_size: u64,
    pub fanout_data_pieces: u8,
    pub fanout_parity_pieces: u8,
    pub cipher_type: [u8; 8],
    pub key_data: [u8; 64],
}

impl Default for SkyfileLayout {
    fn default() -> Self {
        SkyfileLayout {
            version: SKYFILE_VERSION,
            filesize: 0,
            metadata_size: 0,
            fanout_size: 0,
            fanout_data_pieces: 0,
            fanout_parity_pieces: 0,
            cipher_type: CIPHER_PLAIN,
            key_data: [0u8; 64],
        }
    }
}

impl SkyfileLayout {
    pub fn is_plain(&self) -> bool {
        self.cipher_type == CIPHER_PLAIN
    }

    pub fn encode(&self) -> [u8; SKYFILE_LAYOUT_SIZE] {
        let mut buf = [0u8; SKYFILE_LAYOUT_SIZE];
        buf[0] = self.version;
        buf[1..9].copy_from_slice(&self.filesize.to_le_bytes());
        buf[9..17].copy_from_slice(&self.metadata_size.to_le_bytes());
        buf[17..25].copy_from_slice(&self.fanout_size.to_le_bytes());
        buf[25] = self.fanout_data_pieces;
        buf[26] = self.fanout_parity_pieces;
        buf[27..35].copy_from_slice(&self.cipher_type);
        buf[35..99].copy_from_slice(&self.key_data);
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < SKYFILE_LAYOUT_SIZE {
            return Err(Error::Malformed(format!(
                "base sector of {} bytes cannot hold a layout",
                bytes.len()
            )));
        }
        let u64_at = |start: usize| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&bytes[start..start + 8]);
            u64::from_le_bytes(buf)
        };
        let layout = SkyfileLayout {
            version: bytes[0],
            filesize: u64_at(1),
            metadata_size: u64_at(9),
            fanout_size: u64_at(17),
            fanout_data_pieces: bytes[25],
            fanout_parity_pieces: bytes[26],
            cipher_type: bytes[27..35].try_into().expect("slice length is fixed"),
            key_data: bytes[35..99].try_into().expect("slice length is fixed"),
        };
        if layout.version != SKYFILE_VERSION {
            return Err(Error::BadVersion(layout.version));
        }
        Ok(layout)
    }
}

/// User-facing metadata riding in the base sector as JSON.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkyfileMetadata {
    pub filename: String,
    pub mode: u32,
    pub length: u64,
}

impl SkyfileMetadata {
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(self).map_err(|e| Error::InvalidMetadata(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(bytes).map_err(|e| Error::InvalidMetadata(e.to_string()))
    }

    /// Basic sanity checks before anything is uploaded.
    pub fn validate(&self) -> Result<(), Error> {
        if self.filename.is_empty() {
            return Err(Error::InvalidMetadata("empty filename".to_string()));
        }
        if self.filename.contains('\0') {
            return Err(Error::InvalidMetadata(
                "filename contains NUL".to_string(),
            ));
        }
        Ok(())
    }
}

/// Assembles `layout ∥ fanout ∥ metadata ∥ file bytes` padded to a full
/// sector, returning the sector and the raw fetch size (the prefix a
/// downloader must read). The header components must fit a sector on
/// their own; header plus inline file bytes must fit as well.
pub fn build_base_sector(
    layout: &SkyfileLayout,
    fanout: &[u8],
    metadata: &[u8],
    file_bytes: &[u8],
) -> Result<(Vec<u8>, u64), Error> {
    let header = (SKYFILE_LAYOUT_SIZE + fanout.len() + metadata.len()) as u64;
    if header > SECTOR_SIZE {
        return Err(Error::MetadataTooBig {
            header,
            limit: SECTOR_SIZE,
        });
    }
    let fetch_size = header + file_bytes.len() as u64;
    if fetch_size > SECTOR_SIZE {
        return Err(Error::MetadataTooBig {
            header: fetch_size,
            limit: SECTOR_SIZE,
        });
    }

    let mut sector = Vec::with_capacity(SECTOR_SIZE as usize);
    sector.extend_from_slice(&layout.encode());
    sector.extend_from_slice(fanout);
    sector.extend_from_slice(metadata);
    sector.extend_from_slice(file_bytes);
    sector.resize(SECTOR_SIZE as usize, 0);
    Ok((sector, fetch_size))
}

/// The parsed contents of a fetched base sector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBaseSector {
    pub layout: SkyfileLayout,
    pub fanout_roots: Vec<Hash256>,
    pub metadata: SkyfileMetadata,
    /// Inline file bytes; empty when the file lives in the fanout.
    pub body: Vec<u8>,
}

/// Parses the leading bytes of a base sector. `bytes` must cover at
/// least the fetch span of the skylink that addressed it.
pub fn parse_base_sector(bytes: &[u8]) -> Result<ParsedBaseSector, Error> {
    let layout = SkyfileLayout::decode(bytes)?;
    if !layout.is_plain() {
        return Err(Error::EncryptionNotSupported);
    }

    let fanout_start = SKYFILE_LAYOUT_SIZE as u64;
    let metadata_start = fanout_start + layout.fanout_size;
    let body_start = metadata_start + layout.metadata_size;
    if body_start > bytes.len() as u64 {
        return Err(Error::Malformed(
            "layout sizes exceed the fetched bytes".to_string(),
        ));
    }

    let fanout_bytes = &bytes[fanout_start as usize..metadata_start as usize];
    if fanout_bytes.len() % 32 != 0 {
        return Err(Error::Malformed(format!(
            "fanout of {} bytes is not a whole number of roots",
            fanout_bytes.len()
        )));
    }
    let fanout_roots = fanout_bytes
        .chunks(32)
        .map(|chunk| Hash256::try_from(chunk).expect("chunk length is 32"))
        .collect();

    let metadata =
        SkyfileMetadata::from_bytes(&bytes[metadata_start as usize..body_start as usize])?;

    let body = if layout.fanout_size == 0 {
        let body_end = body_start + layout.filesize;
        if body_end > bytes.len() as u64 {
            return Err(Error::Malformed(
                "inline body exceeds the fetched bytes".to_string(),
            ));
        }
        bytes[body_start as usize..body_end as usize].to_vec()
    } else {
        Vec::new()
    };

    Ok(ParsedBaseSector {
        layout,
        fanout_roots,
        metadata,
        body,
    })
}
