// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use async_std::task;
use async_trait::async_trait;
use crypto::Hash256;
use grove_renter::{
    download_skylink, pin_skylink, restore_skyfile, upload_skyfile, Blocklist, Error,
    ReplicationCoder, SectorFetcher, SectorUploader, SkyfileBackup, SkyfileUploadParams,
    BASE_REDUNDANCY, SKYFILE_LAYOUT_SIZE,
};
use merkle::sector_root;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use types::SECTOR_SIZE;

/// An in-memory stand-in for the host network.
#[derive(Default)]
struct MemNet {
    sectors: Mutex<HashMap<Hash256, Vec<u8>>>,
    uploads: AtomicUsize,
}

impl MemNet {
    fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SectorUploader for MemNet {
    async fn upload_sector(&self, data: Vec<u8>) -> Result<Hash256, Error> {
        assert_eq!(data.len() as u64, SECTOR_SIZE);
        let root = sector_root(&data);
        self.sectors.lock().insert(root, data);
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(root)
    }
}

#[async_trait]
impl SectorFetcher for MemNet {
    async fn fetch_sector(
        &self,
        root: Hash256,
        offset: u64,
        length: u64,
    ) -> Result<Vec<u8>, Error> {
        let sectors = self.sectors.lock();
        let sector = sectors
            .get(&root)
            .ok_or_else(|| Error::Transfer(format!("no sector {}", root)))?;
        let end = (offset + length) as usize;
        if end > sector.len() {
            return Err(Error::Transfer("fetch beyond sector".to_string()));
        }
        Ok(sector[offset as usize..end].to_vec())
    }
}

fn params(filename: &str) -> SkyfileUploadParams {
    SkyfileUploadParams {
        filename: filename.to_string(),
        mode: 0o644,
    }
}

#[test]
fn small_skyfile_round_trip() {
    task::block_on(async {
        let net = MemNet::default();
        let blocklist = Blocklist::new();
        let coder = ReplicationCoder::new(BASE_REDUNDANCY);

        let mut data = b"hello".to_vec();
        data.resize(1024, b'!');

        let link = upload_skyfile(&net, &blocklist, &coder, &params("a.txt"), &data)
            .await
            .unwrap();

        // One base sector, nothing else.
        assert_eq!(net.upload_count(), 1);
        assert_eq!(link.version(), 1);
        let (offset, fetch_size) = link.offset_and_fetch_size();
        assert_eq!(offset, 0);
        // Fetch size covers the header plus the kilobyte, rounded to the
        // skylink grid.
        assert!(fetch_size >= SKYFILE_LAYOUT_SIZE as u64 + 1024);
        assert_eq!(fetch_size % 4096, 0);

        let (layout, metadata, downloaded) =
            download_skylink(&net, &blocklist, &coder, &link).await.unwrap();
        assert_eq!(layout.filesize, 1024);
        assert_eq!(metadata.filename, "a.txt");
        assert_eq!(metadata.mode, 0o644);
        assert_eq!(metadata.length, 1024);
        assert_eq!(downloaded, data);

        // Pinning re-uploads the identical sector: same identifier.
        let pinned = pin_skylink(&net, &net, &blocklist, &link).await.unwrap();
        assert_eq!(pinned, link);
    })
}

#[test]
fn large_skyfile_round_trip() {
    task::block_on(async {
        let net = MemNet::default();
        let blocklist = Blocklist::new();
        let coder = ReplicationCoder::new(3);

        // Two and a half sectors of patterned data.
        let len = (SECTOR_SIZE * 5 / 2) as usize;
        let data: Vec<u8> = (0..len).map(|i| (i % 199) as u8).collect();

        let link = upload_skyfile(&net, &blocklist, &coder, &params("big.bin"), &data)
            .await
            .unwrap();

        // 3 chunks at 3 replicas each, plus the base sector. Replicated
        // chunks deduplicate per-chunk in the store but still count as
        // uploads.
        assert_eq!(net.upload_count(), 10);

        let (layout, metadata, downloaded) =
            download_skylink(&net, &blocklist, &coder, &link).await.unwrap();
        assert_eq!(layout.filesize, len as u64);
        assert_eq!(layout.fanout_data_pieces, 1);
        assert_eq!(layout.fanout_parity_pieces, 2);
        assert_eq!(metadata.filename, "big.bin");
        assert_eq!(downloaded, data);
    })
}

#[test]
fn fanout_survives_missing_pieces() {
    task::block_on(async {
        let net = MemNet::default();
        let blocklist = Blocklist::new();
        let coder = ReplicationCoder::new(3);

        let len = SECTOR_SIZE as usize + 17;
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let link = upload_skyfile(&net, &blocklist, &coder, &params("f.bin"), &data)
            .await
            .unwrap();

        // Losing a whole chunk makes the download fail loudly; putting a
        // single replica back is enough to recover.
        let base = net
            .fetch_sector(link.merkle_root(), 0, SECTOR_SIZE)
            .await
            .unwrap();
        let parsed = grove_renter::parse_base_sector(&base).unwrap();
        let victim = parsed.fanout_roots[0];
        net.sectors.lock().remove(&victim);
        assert!(matches!(
            download_skylink(&net, &blocklist, &coder, &link).await,
            Err(Error::Transfer(_))
        ));

        let mut replica = data[..SECTOR_SIZE as usize].to_vec();
        replica.resize(SECTOR_SIZE as usize, 0);
        net.sectors.lock().insert(victim, replica);
        let (_, _, downloaded) = download_skylink(&net, &blocklist, &coder, &link)
            .await
            .unwrap();
        assert_eq!(downloaded, data);
    })
}

#[test]
fn blocked_roots_are_refused() {
    task::block_on(async {
        let net = MemNet::default();
        let blocklist = Blocklist::new();
        let coder = ReplicationCoder::new(1);

        let data = vec![1u8; 100];
        let link = upload_skyfile(&net, &blocklist, &coder, &params("b.txt"), &data)
            .await
            .unwrap();

        blocklist.update(&[link.merkle_root()], &[]);
        assert!(matches!(
            download_skylink(&net, &blocklist, &coder, &link).await,
            Err(Error::Blocked)
        ));
        assert!(matches!(
            pin_skylink(&net, &net, &blocklist, &link).await,
            Err(Error::Blocked)
        ));
        // Re-uploading the same content is refused too.
        assert!(matches!(
            upload_skyfile(&net, &blocklist, &coder, &params("b.txt"), &data).await,
            Err(Error::Blocked)
        ));
    })
}

#[test]
fn restore_reproduces_identifier() {
    task::block_on(async {
        let net = MemNet::default();
        let blocklist = Blocklist::new();
        let coder = ReplicationCoder::new(2);

        let len = SECTOR_SIZE as usize * 2;
        let data: Vec<u8> = (0..len).map(|i| (i % 97) as u8).collect();
        let link = upload_skyfile(&net, &blocklist, &coder, &params("r.bin"), &data)
            .await
            .unwrap();
        let base_sector = net
            .fetch_sector(link.merkle_root(), 0, SECTOR_SIZE)
            .await
            .unwrap();

        // A fresh network, restored purely from the backup artifact.
        let fresh = MemNet::default();
        let backup = SkyfileBackup {
            base_sector,
            body: data.clone(),
        };
        let restored = restore_skyfile(&fresh, &blocklist, &coder, &backup)
            .await
            .unwrap();
        assert_eq!(restored, link);

        let (_, _, downloaded) = download_skylink(&fresh, &blocklist, &coder, &restored)
            .await
            .unwrap();
        assert_eq!(downloaded, data);
    })
}
