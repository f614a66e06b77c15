//! Stream framing for RNet.
//!
//! [`RNetCodec`] splits the byte stream at every `0xF7`; bytes after the
//! last terminator stay in the read buffer and are prepended to the next
//! read, so frames spanning reads are reassembled byte-for-byte.
//!
//! [`FrameStream`] drives the codec over a socket half and turns the end of
//! the stream into a single terminal [`Inbound::Failed`] item.

use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::BytesMut;
use futures::{Stream, StreamExt};
use tokio::io::AsyncRead;
use tokio_util::codec::{Decoder, Encoder, FramedRead};
use tracing::{debug, trace};

use crate::error::{LinkError, RNetError};
use crate::frame::{Frame, HexBytes, TERMINATOR};

// ── RNetCodec ────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct RNetCodec {
    // Carried-over bytes already scanned without finding a terminator.
    scanned: usize,
}

impl RNetCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for RNetCodec {
    type Item = Frame;
    type Error = RNetError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let start = self.scanned.min(src.len());
        let Some(offset) = src[start..].iter().position(|&b| b == TERMINATOR) else {
            self.scanned = src.len();
            if !src.is_empty() {
                trace!(carryover = %HexBytes(&src[..]), "waiting for terminator");
            }
            return Ok(None);
        };

        let end = start + offset + 1;
        self.scanned = 0;
        let frame = Frame::from_terminated(src.split_to(end).freeze());
        debug!(frame = %frame.hex(), "RNet message");
        Ok(Some(frame))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if !src.is_empty() {
            debug!(partial = %HexBytes(&src[..]), "discarding unterminated bytes at end of stream");
            src.clear();
        }
        self.scanned = 0;
        Ok(None)
    }
}

impl Encoder<Frame> for RNetCodec {
    type Error = RNetError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(item.as_bytes());
        Ok(())
    }
}

// ── Inbound / FrameStream ────────────────────────────────────────

/// An item on the reader → dispatcher queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Frame(Frame),
    /// The connection is gone; nothing follows this item.
    Failed(LinkError),
}

/// Lazy, non-restartable sequence of frames read from one connection.
///
/// Yields every frame in wire order, then exactly one
/// [`Inbound::Failed`] when the stream ends or errors, then `None`.
pub struct FrameStream<R> {
    inner: FramedRead<R, RNetCodec>,
    finished: bool,
}

impl<R: AsyncRead + Unpin> FrameStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: FramedRead::new(reader, RNetCodec::new()),
            finished: false,
        }
    }

    /// Whether the terminal item has already been produced.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl<R: AsyncRead + Unpin> Stream for FrameStream<R> {
    type Item = Inbound;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        let item = match ready!(self.inner.poll_next_unpin(cx)) {
            Some(Ok(frame)) => Inbound::Frame(frame),
            Some(Err(e)) => {
                self.finished = true;
                Inbound::Failed(LinkError::from(&e))
            }
            None => {
                self.finished = true;
                Inbound::Failed(LinkError::closed())
            }
        };
        Poll::Ready(Some(item))
    }
}

// ── Tests ────────────────────────────────────────────────────────
