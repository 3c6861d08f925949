// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{
    parse_base_sector, Blocklist, ErasureCoder, Error, ParsedBaseSector, SectorFetcher,
    SkyfileLayout, SkyfileMetadata, Skylink,
};
use crypto::Hash256;
use log::debug;
use types::SECTOR_SIZE;

/// Resolves a skylink into its layout, metadata and full file contents.
pub async fn download_skylink(
    fetcher: &dyn SectorFetcher,
    blocklist: &Blocklist,
    coder: &dyn ErasureCoder,
    link: &Skylink,
) -> Result<(SkyfileLayout, SkyfileMetadata, Vec<u8>), Error> {
    let parsed = download_base_sector(fetcher, blocklist, link).await?;

    if parsed.layout.fanout_size == 0 {
        debug!("downloaded inline skyfile {}", link);
        return Ok((parsed.layout, parsed.metadata, parsed.body));
    }

    let body = download_fanout(fetcher, coder, &parsed).await?;
    debug!("downloaded fanout skyfile {}", link);
    Ok((parsed.layout, parsed.metadata, body))
}

/// Fetches and parses just the base sector of a skylink.
pub async fn download_base_sector(
    fetcher: &dyn SectorFetcher,
    blocklist: &Blocklist,
    link: &Skylink,
) -> Result<ParsedBaseSector, Error> {
    let root = link.merkle_root();
    if blocklist.is_blocked(&root) {
        return Err(Error::Blocked);
    }
    let (offset, fetch_size) = link.offset_and_fetch_size();
    let bytes = fetcher.fetch_sector(root, offset, fetch_size).await?;
    parse_base_sector(&bytes)
}

/// Streams the fanout's erasure-coded chunks and reassembles the body.
async fn download_fanout(
    fetcher: &dyn SectorFetcher,
    coder: &dyn ErasureCoder,
    parsed: &ParsedBaseSector,
) -> Result<Vec<u8>, Error> {
    let layout = &parsed.layout;
    if layout.fanout_data_pieces != coder.data_pieces()
        || layout.fanout_parity_pieces != coder.parity_pieces()
    {
        return Err(Error::ErasureCoder(format!(
            "skyfile was coded {}-of-{}, coder is {}-of-{}",
            layout.fanout_data_pieces,
            layout.fanout_data_pieces as u16 + layout.fanout_parity_pieces as u16,
            coder.data_pieces(),
            coder.data_pieces() as u16 + coder.parity_pieces() as u16,
        )));
    }
    let pieces_per_chunk =
        layout.fanout_data_pieces as usize + layout.fanout_parity_pieces as usize;
    if pieces_per_chunk == 0 || parsed.fanout_roots.len() % pieces_per_chunk != 0 {
        return Err(Error::Malformed(format!(
            "fanout of {} roots does not divide into {}-piece chunks",
            parsed.fanout_roots.len(),
            pieces_per_chunk
        )));
    }

    let mut body = Vec::with_capacity(layout.filesize as usize);
    for chunk_roots in parsed.fanout_roots.chunks(pieces_per_chunk) {
        let pieces = fetch_chunk_pieces(fetcher, coder, chunk_roots).await?;
        let chunk = coder.reconstruct(pieces)?;
        body.extend_from_slice(&chunk);
    }
    if (body.len() as u64) < layout.filesize {
        return Err(Error::Malformed(
            "fanout reconstructed fewer bytes than the filesize".to_string(),
        ));
    }
    body.truncate(layout.filesize as usize);
    Ok(body)
}

/// Fetches the pieces of one chunk, stopping once enough have arrived
/// to reconstruct. Hosts that fail to produce a piece leave a `None`.
async fn fetch_chunk_pieces(
    fetcher: &dyn SectorFetcher,
    coder: &dyn ErasureCoder,
    chunk_roots: &[Hash256],
) -> Result<Vec<Option<Vec<u8>>>, Error> {
    let needed = coder.data_pieces() as usize;
    let mut pieces: Vec<Option<Vec<u8>>> = vec![None; chunk_roots.len()];
    let mut have = 0usize;
    for (i, root) in chunk_roots.iter().enumerate() {
        match fetcher.fetch_sector(*root, 0, SECTOR_SIZE).await {
            Ok(piece) => {
                pieces[i] = Some(piece);
                have += 1;
                if have == needed {
                    break;
                }
            }
            Err(err) => {
                debug!("piece {} unavailable: {}", root, err);
            }
        }
    }
    if have < needed {
        return Err(Error::Transfer(format!(
            "only {} of {} required pieces available",
            have, needed
        )));
    }
    Ok(pieces)
}
