//! Outbound helper that splits a byte stream into tunnel chunks.
//!
//! [`Fragmenter`] owns the outbound sequence counter, so consecutive sends
//! continue the sequence instead of restarting it, and independent tunnel
//! instances never share a counter. Chunking is exposed on its own through
//! [`Fragmenter::fragment`]; [`Fragmenter::send`] additionally forwards the
//! frames to a [`FrameSink`] with an optional pause between chunks.

use std::{
    num::NonZeroUsize,
    sync::atomic::{AtomicU8, Ordering},
    thread,
    time::Duration,
};

use tracing::debug;

use super::{ChunkHeader, MAX_CHUNK_PAYLOAD, SendError, SequenceNumber, encode_chunk};
use crate::{
    frame::{CanFrame, ChannelId, FrameError},
    metrics::{self, Direction},
    transport::FrameSink,
};

const MAX_CHUNK_CAP: NonZeroUsize = NonZeroUsize::MIN.saturating_add(MAX_CHUNK_PAYLOAD - 1);

/// Splits outbound bytes into sequence-numbered chunk frames.
#[derive(Debug)]
pub struct Fragmenter {
    channel: ChannelId,
    chunk_payload_cap: NonZeroUsize,
    inter_chunk_delay: Option<Duration>,
    next_sequence: AtomicU8,
}

impl Fragmenter {
    /// Create a fragmenter transmitting on `channel`, starting at sequence zero.
    #[must_use]
    pub const fn new(channel: ChannelId) -> Self {
        Self::with_starting_sequence(channel, SequenceNumber::new(0))
    }

    /// Create a fragmenter starting from a specific sequence number.
    #[must_use]
    pub const fn with_starting_sequence(channel: ChannelId, start_at: SequenceNumber) -> Self {
        Self {
            channel,
            chunk_payload_cap: MAX_CHUNK_CAP,
            inter_chunk_delay: None,
            next_sequence: AtomicU8::new(start_at.get()),
        }
    }

    /// Cap chunk payloads below the protocol maximum, for transports whose
    /// frames cannot carry a full chunk. Values above
    /// [`MAX_CHUNK_PAYLOAD`] are clamped.
    #[must_use]
    pub fn with_chunk_payload_cap(mut self, cap: NonZeroUsize) -> Self {
        self.chunk_payload_cap = cap.min(MAX_CHUNK_CAP);
        self
    }

    /// Pause for `delay` between consecutive chunks of one send.
    #[must_use]
    pub fn with_inter_chunk_delay(mut self, delay: Duration) -> Self {
        self.inter_chunk_delay = Some(delay).filter(|delay| !delay.is_zero());
        self
    }

    /// Channel the chunks are sent on.
    #[must_use]
    pub const fn channel(&self) -> ChannelId { self.channel }

    /// Largest payload placed in a single chunk.
    #[must_use]
    pub const fn chunk_payload_cap(&self) -> NonZeroUsize { self.chunk_payload_cap }

    /// Sequence number the next chunk will carry.
    #[must_use]
    pub fn peek_sequence(&self) -> SequenceNumber {
        SequenceNumber::new(self.next_sequence.load(Ordering::Relaxed))
    }

    fn take_sequence(&self) -> SequenceNumber {
        // fetch_add wraps on overflow, matching the 8-bit wire counter.
        SequenceNumber::new(self.next_sequence.fetch_add(1, Ordering::Relaxed))
    }

    /// Split `data` into chunk frames, consuming one sequence number per chunk.
    ///
    /// Empty input yields an empty batch. Only the chunk holding the final
    /// byte carries the last-chunk marker.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] if a chunk cannot be wrapped into a frame.
    pub fn fragment(&self, data: impl AsRef<[u8]>) -> Result<ChunkBatch, FrameError> {
        let data = data.as_ref();
        let cap = self.chunk_payload_cap.get();
        let total = data.len().div_ceil(cap);

        let mut frames = Vec::with_capacity(total);
        for (index, chunk) in data.chunks(cap).enumerate() {
            let is_last = index + 1 == total;
            // The length nibble is filled in by `encode_chunk`.
            let header = ChunkHeader::new(self.take_sequence(), 0, is_last);
            frames.push(encode_chunk(self.channel, header, chunk)?);
        }
        Ok(ChunkBatch { frames })
    }

    /// Fragment `data` and forward every chunk to `sink`.
    ///
    /// Returns the number of frames sent. When an inter-chunk delay is
    /// configured the calling thread sleeps between chunks.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Transport`] as soon as the sink rejects a frame;
    /// the remaining chunks are not sent and their sequence numbers stay
    /// consumed, so the peer resynchronises on the next send.
    pub fn send<S>(&self, data: impl AsRef<[u8]>, sink: &mut S) -> Result<usize, SendError>
    where
        S: FrameSink + ?Sized,
    {
        let data = data.as_ref();
        let batch = self.fragment(data)?;
        debug!(
            channel = %self.channel,
            bytes = data.len(),
            chunks = batch.len(),
            "sending tunnel payload"
        );

        let total = batch.len();
        for (sent, frame) in batch.into_iter().enumerate() {
            if let Err(source) = sink.send(&frame) {
                debug!(channel = %self.channel, sent, error = %source, "transport rejected chunk");
                return Err(SendError::Transport { sent, source });
            }
            metrics::inc_frames(Direction::Outbound);
            if let Some(delay) = self.inter_chunk_delay
                && sent + 1 < total
            {
                thread::sleep(delay);
            }
        }
        Ok(total)
    }
}

/// Chunk frames produced for a single call to [`Fragmenter::fragment`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkBatch {
    frames: Vec<CanFrame>,
}

impl ChunkBatch {
    /// Return the frames as a slice.
    #[must_use]
    pub fn frames(&self) -> &[CanFrame] { self.frames.as_slice() }

    /// Number of frames in the batch.
    #[must_use]
    pub fn len(&self) -> usize { self.frames.len() }

    /// Whether the input was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.frames.is_empty() }

    /// Consume the batch, returning all frames.
    #[must_use]
    pub fn into_frames(self) -> Vec<CanFrame> { self.frames }
}

impl IntoIterator for ChunkBatch {
    type Item = CanFrame;
    type IntoIter = std::vec::IntoIter<CanFrame>;

    fn into_iter(self) -> Self::IntoIter { self.frames.into_iter() }
}
