//! Inbound helper that turns chunk frames back into a byte stream.
//!
//! [`Reassembler`] mirrors the outbound [`Fragmenter`](crate::tunnel::Fragmenter):
//! it accepts frames on its channel, validates the chunk header, tracks the
//! expected sequence number, and appends payload bytes to a bounded
//! [`RingBuffer`]. Loss, corruption, and overflow are recovered locally by
//! discarding buffered data; the reader only ever sees a gap in the stream.

use std::num::NonZeroUsize;

use bytes::{Bytes, BytesMut};
use tracing::{debug, warn};

use super::{
    CHUNK_HEADER_SIZE,
    ChunkOutcome,
    ReassemblyError,
    RingBuffer,
    SequenceNumber,
    SequenceStatus,
    SequenceTracker,
    decode_chunk,
};
use crate::{
    frame::{CanFrame, ChannelId},
    metrics::{self, Direction},
    transport::FrameHandler,
};

/// Stateful chunk reassembler backed by a circular buffer.
#[derive(Debug)]
pub struct Reassembler {
    channel: ChannelId,
    buffer: RingBuffer,
    sequence: SequenceTracker,
    completed_messages: u64,
}

impl Reassembler {
    /// Create a reassembler listening on `channel` with `capacity` buffer
    /// slots, of which `capacity - 1` hold data.
    #[must_use]
    pub fn new(channel: ChannelId, capacity: NonZeroUsize) -> Self {
        Self {
            channel,
            buffer: RingBuffer::new(capacity),
            sequence: SequenceTracker::new(),
            completed_messages: 0,
        }
    }

    /// Channel chunks are accepted on.
    #[must_use]
    pub const fn channel(&self) -> ChannelId { self.channel }

    /// Sequence number the next in-order chunk must carry.
    #[must_use]
    pub const fn expected_sequence(&self) -> SequenceNumber { self.sequence.expected() }

    /// Bytes waiting to be read.
    #[must_use]
    pub fn len(&self) -> usize { self.buffer.len() }

    /// Whether no bytes are waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.buffer.is_empty() }

    /// Whether a read would return data.
    #[must_use]
    pub fn has_data(&self) -> bool { !self.buffer.is_empty() }

    /// Largest number of bytes the buffer can hold.
    #[must_use]
    pub fn usable_capacity(&self) -> usize { self.buffer.usable_capacity() }

    /// Number of accepted chunks that carried the last-chunk marker.
    #[must_use]
    pub const fn completed_messages(&self) -> u64 { self.completed_messages }

    /// Process one frame.
    ///
    /// Frames on other channels, or too short to hold a chunk header, yield
    /// [`ChunkOutcome::Ignored`]. A chunk whose sequence number breaks the
    /// run discards everything buffered before its payload is appended.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError::Malformed`] when the header fails
    /// validation and [`ReassemblyError::Overflow`] when the payload does not
    /// fit. Both leave the reassembler cleared.
    pub fn accept(&mut self, frame: &CanFrame) -> Result<ChunkOutcome, ReassemblyError> {
        if frame.id() != self.channel || usize::from(frame.dlc()) < CHUNK_HEADER_SIZE {
            return Ok(ChunkOutcome::Ignored);
        }

        let (header, payload) = match decode_chunk(frame) {
            Ok(chunk) => chunk,
            Err(err) => {
                self.clear();
                return Err(err.into());
            }
        };

        let status = self.sequence.observe(header.sequence(), self.buffer.is_empty());
        let resynced = if let SequenceStatus::Resync { expected, found } = status {
            debug!(
                channel = %self.channel,
                %expected,
                %found,
                dropped = self.buffer.len(),
                "chunk sequence gap; resynchronising"
            );
            metrics::inc_resyncs();
            self.buffer.clear();
            true
        } else {
            false
        };

        if let Err(source) = self.buffer.push(payload) {
            self.clear();
            return Err(ReassemblyError::Overflow {
                sequence: header.sequence(),
                source,
            });
        }

        if header.is_last() {
            self.completed_messages = self.completed_messages.wrapping_add(1);
        }
        Ok(ChunkOutcome::Appended {
            len: payload.len(),
            is_last: header.is_last(),
            resynced,
        })
    }

    /// Receive-handler entry point: process `frame` and report whether it
    /// belonged to this tunnel.
    ///
    /// Errors are logged and counted, never returned.
    pub fn handle_frame(&mut self, frame: &CanFrame) -> bool {
        match self.accept(frame) {
            Ok(ChunkOutcome::Ignored) => false,
            Ok(ChunkOutcome::Appended { .. }) => {
                metrics::inc_frames(Direction::Inbound);
                true
            }
            Err(err) => {
                warn!(channel = %self.channel, error = %err, "discarded reassembly state");
                metrics::inc_errors(err.kind());
                true
            }
        }
    }

    /// Drain up to `buf.len()` buffered bytes into `buf`.
    ///
    /// Returns the number of bytes copied, zero when nothing is buffered.
    pub fn read(&mut self, buf: &mut [u8]) -> usize { self.buffer.read(buf) }

    /// Drain up to `max_len` buffered bytes into a new [`Bytes`].
    pub fn read_bytes(&mut self, max_len: usize) -> Bytes {
        let mut out = BytesMut::zeroed(max_len.min(self.buffer.len()));
        let read = self.buffer.read(&mut out);
        out.truncate(read);
        out.freeze()
    }

    /// Discard buffered bytes and forget the expected sequence number.
    pub fn clear(&mut self) {
        if !self.buffer.is_empty() {
            debug!(
                channel = %self.channel,
                dropped = self.buffer.len(),
                "clearing reassembly buffer"
            );
        }
        self.buffer.clear();
        self.sequence.reset();
    }
}

impl FrameHandler for Reassembler {
    fn handle(&mut self, frame: &CanFrame) -> bool { self.handle_frame(frame) }

    fn clear(&mut self) { Reassembler::clear(self); }
}
