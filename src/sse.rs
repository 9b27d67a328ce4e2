//! Server-sent event framing
//!
//! Records are separated by a blank line (`\n\n`). Within a record only
//! `data:` lines matter; `event:`, `id:` and `retry:` lines are skipped.
//! A `[DONE]` payload ends the stream.
//!
//! [`FrameDecoder`] does the buffering and works on raw bytes, so a record
//! (or a multi-byte character) split across chunks decodes the same as one
//! delivered whole. [`frames`] and [`event_stream`] wrap it around a byte
//! stream.

#[cfg(test)]
mod proptests;

use crate::reconciler::{DecodeError, ServerEvent};
use crate::transport::{ByteStream, TransportError};
use futures::stream::{Stream, StreamExt};
use thiserror::Error;

/// Sentinel payload that terminates a stream
pub const DONE_SENTINEL: &str = "[DONE]";

const RECORD_SEPARATOR: &[u8] = b"\n\n";

/// One decoded record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// The `data:` payload of a record
    Data(String),
    /// The `[DONE]` sentinel
    Done,
}

/// Incremental record splitter
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already searched for a separator
    scanned: usize,
    done: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the `[DONE]` sentinel has been seen
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed a chunk and return every record it completes.
    ///
    /// Nothing is returned after `[DONE]`.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        if self.done {
            return Vec::new();
        }
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = find_separator(&self.buffer, self.scanned) {
            let record: Vec<u8> = self.buffer.drain(..pos + RECORD_SEPARATOR.len()).collect();
            self.scanned = 0;
            if let Some(frame) = parse_record(&record[..pos]) {
                let is_done = frame == Frame::Done;
                frames.push(frame);
                if is_done {
                    self.done = true;
                    self.buffer.clear();
                    break;
                }
            }
        }
        // A separator may straddle this chunk and the next
        self.scanned = self.buffer.len().saturating_sub(RECORD_SEPARATOR.len() - 1);
        frames
    }

    /// Flush a trailing record that was never terminated by a blank line.
    pub fn finish(&mut self) -> Option<Frame> {
        if self.done {
            return None;
        }
        let record = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        let frame = parse_record(&record)?;
        if frame == Frame::Done {
            self.done = true;
        }
        Some(frame)
    }
}

fn find_separator(buffer: &[u8], from: usize) -> Option<usize> {
    buffer
        .get(from..)?
        .windows(RECORD_SEPARATOR.len())
        .position(|window| window == RECORD_SEPARATOR)
        .map(|pos| from + pos)
}

fn parse_record(record: &[u8]) -> Option<Frame> {
    let text = String::from_utf8_lossy(record);
    let mut data: Option<String> = None;

    for line in text.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let Some(payload) = line.strip_prefix("data:") else {
            continue;
        };
        let payload = payload.strip_prefix(' ').unwrap_or(payload);
        match data.as_mut() {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(payload);
            }
            None => data = Some(payload.to_string()),
        }
    }

    let data = data?;
    if data.trim().is_empty() {
        return None;
    }
    if data.trim() == DONE_SENTINEL {
        return Some(Frame::Done);
    }
    Some(Frame::Data(data))
}

/// Error yielded by [`event_stream`]
#[derive(Debug, Error)]
pub enum StreamError {
    /// The connection failed; the stream ends after this item
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// One record could not be decoded; the stream continues
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl StreamError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, StreamError::Transport(_))
    }
}

/// Payloads of a byte stream, ending at `[DONE]` or when the body closes.
pub fn frames(mut body: ByteStream) -> impl Stream<Item = Result<String, TransportError>> + Send {
    async_stream::stream! {
        let mut decoder = FrameDecoder::new();
        let mut failed = false;

        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    for frame in decoder.push(&bytes) {
                        if let Frame::Data(payload) = frame {
                            yield Ok(payload);
                        }
                    }
                    if decoder.is_done() {
                        break;
                    }
                }
                Err(e) => {
                    failed = true;
                    yield Err(e);
                    break;
                }
            }
        }

        if !failed {
            if let Some(Frame::Data(payload)) = decoder.finish() {
                yield Ok(payload);
            }
        }
    }
}

/// Typed events of a relay response body.
///
/// A malformed record yields `StreamError::Decode` and the stream carries
/// on; a transport failure is yielded once and ends the stream.
pub fn event_stream(body: ByteStream) -> impl Stream<Item = Result<ServerEvent, StreamError>> + Send {
    frames(body).map(|payload| match payload {
        Ok(text) => ServerEvent::from_json(&text).map_err(StreamError::from),
        Err(e) => Err(StreamError::from(e)),
    })
}
