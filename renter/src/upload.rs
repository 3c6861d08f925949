// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{
    build_base_sector, Blocklist, ErasureCoder, Error, SectorUploader, SkyfileLayout,
    SkyfileMetadata, Skylink, SKYFILE_LAYOUT_SIZE,
};
use crypto::Hash256;
use log::info;
use merkle::sector_root;
use types::SECTOR_SIZE;

/// What the caller chooses about an upload.
#[derive(Debug, Clone)]
pub struct SkyfileUploadParams {
    pub filename: String,
    pub mode: u32,
}

/// Uploads a file as a skyfile and returns its skylink. Files that fit
/// in the base sector beside the header are inlined; larger files are
/// erasure-coded into a fanout of sector roots.
pub async fn upload_skyfile(
    uploader: &dyn SectorUploader,
    blocklist: &Blocklist,
    coder: &dyn ErasureCoder,
    params: &SkyfileUploadParams,
    data: &[u8],
) -> Result<Skylink, Error> {
    let metadata = SkyfileMetadata {
        filename: params.filename.clone(),
        mode: params.mode,
        length: data.len() as u64,
    };
    metadata.validate()?;
    let metadata_bytes = metadata.to_bytes()?;

    let header = (SKYFILE_LAYOUT_SIZE + metadata_bytes.len()) as u64;
    if header + data.len() as u64 <= SECTOR_SIZE {
        upload_small_skyfile(uploader, blocklist, &metadata_bytes, data).await
    } else {
        upload_large_skyfile(uploader, blocklist, coder, &metadata_bytes, data).await
    }
}

/// Small path: the whole file rides in the base sector.
async fn upload_small_skyfile(
    uploader: &dyn SectorUploader,
    blocklist: &Blocklist,
    metadata_bytes: &[u8],
    data: &[u8],
) -> Result<Skylink, Error> {
    let layout = SkyfileLayout {
        filesize: data.len() as u64,
        metadata_size: metadata_bytes.len() as u64,
        ..Default::default()
    };
    let (base_sector, fetch_size) = build_base_sector(&layout, &[], metadata_bytes, data)?;
    finish_base_sector(uploader, blocklist, base_sector, fetch_size).await
}

/// Large path: the body is erasure-coded chunk by chunk; the ordered
/// piece roots become the fanout.
async fn upload_large_skyfile(
    uploader: &dyn SectorUploader,
    blocklist: &Blocklist,
    coder: &dyn ErasureCoder,
    metadata_bytes: &[u8],
    data: &[u8],
) -> Result<Skylink, Error> {
    let fanout_roots = upload_fanout(uploader, blocklist, coder, data).await?;
    let mut fanout_bytes = Vec::with_capacity(fanout_roots.len() * 32);
    for root in &fanout_roots {
        fanout_bytes.extend_from_slice(root.as_ref());
    }

    let layout = SkyfileLayout {
        filesize: data.len() as u64,
        metadata_size: metadata_bytes.len() as u64,
        fanout_size: fanout_bytes.len() as u64,
        fanout_data_pieces: coder.data_pieces(),
        fanout_parity_pieces: coder.parity_pieces(),
        ..Default::default()
    };
    let (base_sector, fetch_size) =
        build_base_sector(&layout, &fanout_bytes, metadata_bytes, &[])?;
    finish_base_sector(uploader, blocklist, base_sector, fetch_size).await
}

/// Erasure-codes the body and uploads every piece, returning the fanout
/// in row-major order: all pieces of chunk 0, then chunk 1, onward.
pub(crate) async fn upload_fanout(
    uploader: &dyn SectorUploader,
    blocklist: &Blocklist,
    coder: &dyn ErasureCoder,
    data: &[u8],
) -> Result<Vec<Hash256>, Error> {
    if coder.data_pieces() == 0 {
        return Err(Error::ErasureCoder("coder needs data pieces".to_string()));
    }
    let chunk_size = coder.data_pieces() as usize * SECTOR_SIZE as usize;
    let mut fanout_roots = Vec::new();
    for chunk in data.chunks(chunk_size) {
        for piece in coder.encode(chunk)? {
            let root = upload_checked(uploader, blocklist, piece).await?;
            fanout_roots.push(root);
        }
    }
    Ok(fanout_roots)
}

/// Uploads one sector, refusing blocked roots and verifying the
/// addressability guarantee on the way out.
pub(crate) async fn upload_checked(
    uploader: &dyn SectorUploader,
    blocklist: &Blocklist,
    sector: Vec<u8>,
) -> Result<Hash256, Error> {
    let expected = sector_root(&sector);
    if blocklist.is_blocked(&expected) {
        return Err(Error::Blocked);
    }
    let actual = uploader.upload_sector(sector).await?;
    if actual != expected {
        return Err(Error::RootMismatch { expected, actual });
    }
    Ok(actual)
}

async fn finish_base_sector(
    uploader: &dyn SectorUploader,
    blocklist: &Blocklist,
    base_sector: Vec<u8>,
    fetch_size: u64,
) -> Result<Skylink, Error> {
    let root = upload_checked(uploader, blocklist, base_sector).await?;
    let skylink = Skylink::new_v1(root, 0, fetch_size)?;
    info!("uploaded skyfile {}", skylink);
    Ok(skylink)
}
