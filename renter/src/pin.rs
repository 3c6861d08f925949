// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{
    parse_base_sector, upload_checked, Blocklist, ErasureCoder, Error, SectorFetcher,
    SectorUploader, Skylink, SKYFILE_LAYOUT_SIZE,
};
use log::info;
use merkle::sector_root;
use types::SECTOR_SIZE;

/// Re-uploads an existing skyfile, preserving its identifier exactly.
/// The base sector is fetched whole so the replica hashes to the same
/// root; fanout sectors are read through and re-uploaded untouched.
pub async fn pin_skylink(
    fetcher: &dyn SectorFetcher,
    uploader: &dyn SectorUploader,
    blocklist: &Blocklist,
    link: &Skylink,
) -> Result<Skylink, Error> {
    let root = link.merkle_root();
    if blocklist.is_blocked(&root) {
        return Err(Error::Blocked);
    }

    let base_sector = fetcher.fetch_sector(root, 0, SECTOR_SIZE).await?;
    let parsed = parse_base_sector(&base_sector)?;

    for fanout_root in &parsed.fanout_roots {
        let piece = fetcher.fetch_sector(*fanout_root, 0, SECTOR_SIZE).await?;
        let uploaded = upload_checked(uploader, blocklist, piece).await?;
        if uploaded != *fanout_root {
            return Err(Error::RootMismatch {
                expected: *fanout_root,
                actual: uploaded,
            });
        }
    }

    let uploaded = upload_checked(uploader, blocklist, base_sector).await?;
    if uploaded != root {
        return Err(Error::RootMismatch {
            expected: root,
            actual: uploaded,
        });
    }
    info!("pinned skyfile {}", link);
    Ok(*link)
}

/// A saved skyfile: its base sector plus the raw body bytes. Enough to
/// put the file back on the network with the same identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkyfileBackup {
    pub base_sector: Vec<u8>,
    pub body: Vec<u8>,
}

/// Restores a skyfile from a backup artifact. The base sector pins the
/// identifier; the body is re-coded with the layout's scheme and must
/// reproduce the recorded fanout roots.
pub async fn restore_skyfile(
    uploader: &dyn SectorUploader,
    blocklist: &Blocklist,
    coder: &dyn ErasureCoder,
    backup: &SkyfileBackup,
) -> Result<Skylink, Error> {
    let root = sector_root(&backup.base_sector);
    if blocklist.is_blocked(&root) {
        return Err(Error::Blocked);
    }
    let parsed = parse_base_sector(&backup.base_sector)?;

    if !parsed.fanout_roots.is_empty() {
        let restored =
            super::upload_fanout(uploader, blocklist, coder, &backup.body).await?;
        if restored != parsed.fanout_roots {
            return Err(Error::Malformed(
                "restored fanout does not match the base sector's".to_string(),
            ));
        }
    }

    let uploaded = upload_checked(uploader, blocklist, backup.base_sector.clone()).await?;
    debug_assert_eq!(uploaded, root);

    let fetch_size = SKYFILE_LAYOUT_SIZE as u64
        + parsed.layout.fanout_size
        + parsed.layout.metadata_size
        + if parsed.layout.fanout_size == 0 {
            parsed.layout.filesize
        } else {
            0
        };
    let link = Skylink::new_v1(root, 0, fetch_size)?;
    info!("restored skyfile {}", link);
    Ok(link)
}
