//! Lazy, finite, non-restartable frame sequence over a chunked byte source.

use std::collections::VecDeque;
use std::future::Future;

use bytes::Bytes;

use crate::decoder::{EventFrame, FrameDecoder};
use crate::error::TransportError;

/// Anything that yields the response body one chunk at a time.
pub trait ChunkSource {
    /// Next chunk in send order; `Ok(None)` signals a clean end of stream.
    fn next_chunk(&mut self) -> impl Future<Output = Result<Option<Bytes>, TransportError>> + Send;
}

impl ChunkSource for reqwest::Response {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, TransportError> {
        self.chunk()
            .await
            .map_err(|e| TransportError::Read(e.to_string()))
    }
}

/// In-memory chunk source, used to replay a captured feed.
#[derive(Debug, Default)]
pub struct ChunkQueue {
    chunks: VecDeque<Result<Bytes, String>>,
}

impl ChunkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `bytes` split into pieces of at most `size` bytes (0 means one piece).
    pub fn split_every(bytes: &[u8], size: usize) -> Self {
        let mut queue = Self::new();
        if size == 0 {
            queue.push(bytes.to_vec());
        } else {
            for piece in bytes.chunks(size) {
                queue.push(piece.to_vec());
            }
        }
        queue
    }

    pub fn push(&mut self, chunk: impl Into<Bytes>) -> &mut Self {
        self.chunks.push_back(Ok(chunk.into()));
        self
    }

    /// Queue a read failure; the source stops after yielding it.
    pub fn push_error(&mut self, reason: impl Into<String>) -> &mut Self {
        self.chunks.push_back(Err(reason.into()));
        self
    }
}

impl ChunkSource for ChunkQueue {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, TransportError> {
        match self.chunks.pop_front() {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(reason)) => {
                self.chunks.clear();
                Err(TransportError::Read(reason))
            }
            None => Ok(None),
        }
    }
}

/// Frames decoded from one session's byte source, yielded in arrival order.
pub struct FrameStream<S> {
    source: S,
    decoder: FrameDecoder,
    ready: VecDeque<EventFrame>,
    done: bool,
    chunks_read: u64,
}

impl<S: ChunkSource> FrameStream<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            decoder: FrameDecoder::new(),
            ready: VecDeque::new(),
            done: false,
            chunks_read: 0,
        }
    }

    /// Read until the next complete frame is available.
    ///
    /// Returns `Ok(None)` once the source has ended; a trailing partial frame is
    /// dropped at that point. After the end or an error the stream stays exhausted.
    pub async fn next_frame(&mut self) -> Result<Option<EventFrame>, TransportError> {
        loop {
            if let Some(frame) = self.ready.pop_front() {
                return Ok(Some(frame));
            }
            if self.done {
                return Ok(None);
            }
            match self.source.next_chunk().await {
                Ok(Some(chunk)) => {
                    self.chunks_read += 1;
                    self.ready.extend(self.decoder.feed(&chunk));
                }
                Ok(None) => {
                    self.done = true;
                    std::mem::take(&mut self.decoder).finish();
                }
                Err(e) => {
                    self.done = true;
                    return Err(e);
                }
            }
        }
    }

    pub fn chunks_read(&self) -> u64 {
        self.chunks_read
    }
}
