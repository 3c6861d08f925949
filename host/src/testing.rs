// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! In-memory duplex streams for driving the wire protocols in tests.

use futures::io::{AsyncRead, AsyncWrite};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

#[derive(Default)]
struct Channel {
    buf: VecDeque<u8>,
    closed: bool,
    reader: Option<Waker>,
}

impl Channel {
    fn wake_reader(&mut self) {
        if let Some(waker) = self.reader.take() {
            waker.wake();
        }
    }
}

/// One end of a bidirectional in-memory pipe.
pub struct PipeEnd {
    read_from: Arc<Mutex<Channel>>,
    write_to: Arc<Mutex<Channel>>,
}

/// Creates a connected pair of duplex stream ends.
pub fn pipe() -> (PipeEnd, PipeEnd) {
    let a = Arc::new(Mutex::new(Channel::default()));
    let b = Arc::new(Mutex::new(Channel::default()));
    (
        PipeEnd {
            read_from: a.clone(),
            write_to: b.clone(),
        },
        PipeEnd {
            read_from: b,
            write_to: a,
        },
    )
}

impl AsyncRead for PipeEnd {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        let mut chan = self.read_from.lock();
        if chan.buf.is_empty() {
            if chan.closed {
                return Poll::Ready(Ok(0));
            }
            chan.reader = Some(cx.waker().clone());
            return Poll::Pending;
        }
        let n = buf.len().min(chan.buf.len());
        for byte in buf.iter_mut().take(n) {
            *byte = chan.buf.pop_front().unwrap();
        }
        Poll::Ready(Ok(n))
    }
}

impl AsyncWrite for PipeEnd {
    fn poll_write(
        self: Pin<&mut Self>,
        _: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut chan = self.write_to.lock();
        if chan.closed {
            return Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()));
        }
        chan.buf.extend(buf);
        chan.wake_reader();
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
        let mut chan = self.write_to.lock();
        chan.closed = true;
        chan.wake_reader();
        Poll::Ready(Ok(()))
    }
}

impl Drop for PipeEnd {
    fn drop(&mut self) {
        let mut chan = self.write_to.lock();
        chan.closed = true;
        chan.wake_reader();
    }
}
