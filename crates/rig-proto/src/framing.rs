//! Terminator framing over a raw byte stream
//!
//! [`FrameCodec`] accumulates bytes from the transport and splits them
//! into discrete request frames on a configurable terminator, in the
//! streaming-parser style of the rest of the engine: push bytes in,
//! pull complete frames out. Bytes that have not been terminated yet
//! stay buffered and produce no frame.
//!
//! An empty terminator disables framing: every pushed chunk is one
//! frame, which is how fixed-length binary protocols are carried.

use std::collections::VecDeque;

use tracing::warn;

/// Cap on unterminated input; a client that never sends the terminator
/// cannot grow the buffer without bound
pub const MAX_FRAME_LEN: usize = 1024;

/// Streaming splitter of raw bytes into terminator-delimited frames
#[derive(Debug)]
pub struct FrameCodec {
    terminator: Vec<u8>,
    buffer: Vec<u8>,
    ready: VecDeque<Vec<u8>>,
}

impl FrameCodec {
    /// Create a codec splitting on the given terminator
    pub fn new(terminator: impl Into<Vec<u8>>) -> Self {
        Self {
            terminator: terminator.into(),
            buffer: Vec::with_capacity(64),
            ready: VecDeque::new(),
        }
    }

    /// Push raw bytes; complete frames become available via
    /// [`next_frame`](Self::next_frame)
    pub fn push_bytes(&mut self, data: &[u8]) {
        if self.terminator.is_empty() {
            if !data.is_empty() {
                self.ready.push_back(data.to_vec());
            }
            return;
        }

        self.buffer.extend_from_slice(data);
        while let Some(pos) = find_terminator(&self.buffer, &self.terminator) {
            let frame = self.buffer[..pos].to_vec();
            self.buffer.drain(..pos + self.terminator.len());
            self.ready.push_back(frame);
        }

        if self.buffer.len() > MAX_FRAME_LEN {
            warn!(
                "discarding {} unterminated bytes (over {MAX_FRAME_LEN} byte cap)",
                self.buffer.len()
            );
            self.buffer.clear();
        }
    }

    /// Take the next complete frame, without its terminator
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        self.ready.pop_front()
    }

    /// Drop buffered partial input and any pending frames
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.ready.clear();
    }

    /// Number of buffered bytes still awaiting a terminator
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

fn find_terminator(buffer: &[u8], terminator: &[u8]) -> Option<usize> {
    if buffer.len() < terminator.len() {
        return None;
    }
    buffer
        .windows(terminator.len())
        .position(|window| window == terminator)
}
