// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::Error;
use async_std::task;
use byteorder::{ByteOrder, LittleEndian};
use futures::channel::oneshot;
use futures::io::{AsyncRead, AsyncReadExt};
use parking_lot::Mutex;
use std::sync::Arc;

const FETCH_CHUNK: usize = 64 * 1024;

struct Waiter {
    end: u64,
    tx: oneshot::Sender<Result<(), Error>>,
}

struct Inner {
    buf: Vec<u8>,
    failed: Option<Error>,
    waiters: Vec<Waiter>,
}

impl Inner {
    fn wake_ready(&mut self) {
        let watermark = self.buf.len() as u64;
        let mut waiting = Vec::new();
        for waiter in self.waiters.drain(..) {
            if let Some(err) = &self.failed {
                let _ = waiter.tx.send(Err(err.clone()));
            } else if waiter.end <= watermark {
                let _ = waiter.tx.send(Ok(()));
            } else {
                waiting.push(waiter);
            }
        }
        self.waiters = waiting;
    }

    fn fail(&mut self, err: Error) {
        self.failed = Some(err);
        self.wake_ready();
    }
}

/// A lazy, random-access view of a program's parameter stream. A
/// producer task copies exactly `data_length` bytes from the reader into
/// the buffer; consumers block until the bytes they index have arrived.
/// Producer failure (stream error, early EOF) fails every current and
/// future wait.
pub struct ProgramData {
    inner: Arc<Mutex<Inner>>,
    data_length: u64,
}

impl ProgramData {
    pub fn new<R>(reader: R, data_length: u64) -> Arc<Self>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let inner = Arc::new(Mutex::new(Inner {
            buf: Vec::new(),
            failed: None,
            waiters: Vec::new(),
        }));
        let data = Arc::new(ProgramData {
            inner: inner.clone(),
            data_length,
        });
        task::spawn(fetch_data(reader, inner, data_length));
        data
    }

    /// Constructs fully-buffered program data. Used by tests and by
    /// callers that already hold the whole parameter block.
    pub fn from_bytes(bytes: Vec<u8>) -> Arc<Self> {
        let data_length = bytes.len() as u64;
        Arc::new(ProgramData {
            inner: Arc::new(Mutex::new(Inner {
                buf: bytes,
                failed: None,
                waiters: Vec::new(),
            })),
            data_length,
        })
    }

    pub fn len(&self) -> u64 {
        self.data_length
    }

    pub fn is_empty(&self) -> bool {
        self.data_length == 0
    }

    /// Returns the `len` bytes at `offset`, waiting for them to arrive.
    pub async fn bytes_at(&self, offset: u64, len: u64) -> Result<Vec<u8>, Error> {
        let end = offset.checked_add(len).ok_or(Error::DataOutOfBounds {
            offset,
            len,
            data_length: self.data_length,
        })?;
        if end > self.data_length {
            return Err(Error::DataOutOfBounds {
                offset,
                len,
                data_length: self.data_length,
            });
        }
        let rx = {
            let mut inner = self.inner.lock();
            if let Some(err) = &inner.failed {
                return Err(err.clone());
            }
            if end <= inner.buf.len() as u64 {
                return Ok(inner.buf[offset as usize..end as usize].to_vec());
            }
            let (tx, rx) = oneshot::channel();
            inner.waiters.push(Waiter { end, tx });
            rx
        };
        match rx.await {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::DataUnavailable(
                    "program data producer cancelled".to_string(),
                ))
            }
        }
        let inner = self.inner.lock();
        Ok(inner.buf[offset as usize..end as usize].to_vec())
    }

    /// Returns the 8 bytes at `offset` as a little-endian u64.
    pub async fn u64_at(&self, offset: u64) -> Result<u64, Error> {
        let bytes = self.bytes_at(offset, 8).await?;
        Ok(LittleEndian::read_u64(&bytes))
    }
}

async fn fetch_data<R>(mut reader: R, inner: Arc<Mutex<Inner>>, data_length: u64)
where
    R: AsyncRead + Unpin + Send,
{
    let mut remaining = data_length as usize;
    let mut chunk = vec![0u8; FETCH_CHUNK];
    while remaining > 0 {
        let want = remaining.min(FETCH_CHUNK);
        match reader.read(&mut chunk[..want]).await {
            Ok(0) => {
                inner.lock().fail(Error::DataUnavailable(format!(
                    "stream ended with {} bytes outstanding",
                    remaining
                )));
                return;
            }
            Ok(n) => {
                remaining -= n;
                let mut guard = inner.lock();
                guard.buf.extend_from_slice(&chunk[..n]);
                guard.wake_ready();
            }
            Err(e) => {
                inner.lock().fail(Error::DataUnavailable(e.to_string()));
                return;
            }
        }
    }
}
