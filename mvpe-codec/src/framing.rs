//! Incremental frame assembly for stream transports.
//!
//! Envelopes carry no delimiter outside the frame itself; peers cut the
//! stream on the header's `length` field. [`FrameAssembler`] buffers
//! incoming bytes and yields one pooled envelope per complete frame.

use crate::envelope::{Envelope, HEADER_SIZE, LENGTH_OFFSET};
use crate::error::CodecError;
use crate::pool::SegmentPool;
use bytes::{Buf, BytesMut};

/// Reassembles envelopes from a byte stream.
pub struct FrameAssembler {
    buffer: BytesMut,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
        }
    }

    /// Appends bytes received from the transport.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to cut the next complete frame into a pooled envelope.
    ///
    /// Returns `Ok(Some(envelope))` for a complete frame, `Ok(None)` if
    /// more data is needed, or an error for frames shorter than the fixed
    /// header.
    pub fn next_frame(&mut self, pool: &SegmentPool) -> Result<Option<Envelope>, CodecError> {
        if self.buffer.len() < HEADER_SIZE {
            return Ok(None);
        }

        let length = u16::from_be_bytes([
            self.buffer[LENGTH_OFFSET],
            self.buffer[LENGTH_OFFSET + 1],
        ]) as usize;

        if length < HEADER_SIZE {
            return Err(CodecError::TruncatedPayload {
                needed: HEADER_SIZE,
                available: length,
            });
        }
        if self.buffer.len() < length {
            return Ok(None);
        }

        let mut seg = pool.acquire_sized(length)?;
        seg[..length].copy_from_slice(&self.buffer[..length]);
        self.buffer.advance(length);

        Ok(Some(Envelope::wrap(seg)))
    }

    /// Number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drops any partially received frame.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}
