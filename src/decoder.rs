//! Incremental byte-to-frame decoding for the scan event feed.
//!
//! The transport delivers bytes in arbitrary chunks: a chunk may end in the
//! middle of a multi-byte character, in the middle of the `"\n\n"` boundary,
//! or hold several frames at once. `FrameDecoder` carries both the partial
//! character and the partial frame over to the next `feed` call, so the
//! frames produced never depend on how the bytes were chunked.

use std::fmt;

use tracing::debug;

/// Boundary between two frames.
pub const FRAME_DELIMITER: &str = "\n\n";

/// Prefix every data frame starts with.
pub const DATA_PREFIX: &str = "data: ";

/// One complete `data: <json>` line, delimiter removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFrame(String);

impl EventFrame {
    pub fn new(line: impl Into<String>) -> Self {
        Self(line.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The text after the `data: ` prefix, if the frame carries one.
    pub fn payload(&self) -> Option<&str> {
        self.0.strip_prefix(DATA_PREFIX)
    }
}

impl fmt::Display for EventFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stateful UTF-8 decoder plus frame splitter.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Trailing bytes of an incomplete UTF-8 sequence.
    partial_char: Vec<u8>,
    /// Decoded text not yet consumed into a frame. Never holds a delimiter after `feed`.
    buffer: String,
    skipped: u64,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `chunk` and return every frame it completed, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<EventFrame> {
        self.decode_into_buffer(chunk);
        self.split_frames()
    }

    /// Text retained for the next chunk.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Number of complete frames dropped because they lacked the data prefix.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Close the decoder at end of stream. A trailing incomplete frame is dropped,
    /// never emitted; returns how many bytes were discarded.
    pub fn finish(self) -> usize {
        let dropped = self.buffer.len() + self.partial_char.len();
        if dropped > 0 {
            debug!(dropped, "discarding incomplete trailing frame at end of stream");
        }
        dropped
    }

    fn decode_into_buffer(&mut self, chunk: &[u8]) {
        let mut bytes = std::mem::take(&mut self.partial_char);
        bytes.extend_from_slice(chunk);

        let mut rest: &[u8] = &bytes;
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    break;
                }
                Err(e) => {
                    let (valid, tail) = rest.split_at(e.valid_up_to());
                    self.buffer.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(bad) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            rest = &tail[bad..];
                        }
                        None => {
                            self.partial_char = tail.to_vec();
                            break;
                        }
                    }
                }
            }
        }
    }

    fn split_frames(&mut self) -> Vec<EventFrame> {
        let mut frames = Vec::new();
        let mut consumed = 0;

        while let Some(pos) = self.buffer[consumed..].find(FRAME_DELIMITER) {
            let raw = &self.buffer[consumed..consumed + pos];
            consumed += pos + FRAME_DELIMITER.len();

            if raw.starts_with(DATA_PREFIX) {
                frames.push(EventFrame(raw.to_string()));
            } else if !raw.is_empty() {
                self.skipped += 1;
                debug!(len = raw.len(), "skipping frame without data prefix");
            }
        }

        self.buffer.drain(..consumed);
        frames
    }
}
