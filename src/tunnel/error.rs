//! Error and outcome types emitted by the tunnel layer.
//!
//! Inbound errors never escape the receive handler: the reassembler recovers
//! locally and reports them through logs and metrics. They are still typed so
//! the lower-level [`Reassembler::accept`](crate::tunnel::Reassembler::accept)
//! API and the tests can assert on the precise failure.

use thiserror::Error;

use super::{MAX_CHUNK_PAYLOAD, SequenceNumber};
use crate::{frame::FrameError, transport::TransportError};

/// Result of feeding a frame into the reassembler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// The frame is not addressed to this tunnel.
    Ignored,
    /// The chunk payload was appended to the stream.
    Appended {
        /// Number of payload bytes appended.
        len: usize,
        /// Whether the chunk carried the last-chunk marker.
        is_last: bool,
        /// Whether buffered data was discarded to resynchronise first.
        resynced: bool,
    },
}

/// Reasons a chunk frame fails validation.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    /// The frame is too short to hold a chunk header.
    #[error("frame of {dlc} bytes cannot hold a chunk header")]
    FrameTooShort { dlc: u8 },
    /// The header declares more payload than a chunk may carry.
    #[error("chunk declares {declared} payload bytes, limit is {MAX_CHUNK_PAYLOAD}")]
    LengthTooLarge { declared: u8 },
    /// The header declares more payload than the frame delivered.
    #[error("chunk declares {declared} payload bytes but frame holds {available}")]
    Truncated { declared: u8, available: usize },
}

/// The ring buffer cannot take the requested bytes without filling up.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("cannot store {attempted} bytes, only {available} free")]
pub struct OverflowError {
    /// Bytes the caller tried to store.
    pub attempted: usize,
    /// Free usable space at the time of the attempt.
    pub available: usize,
}

/// Errors produced while reassembling inbound chunks.
///
/// Every variant leaves the reassembler cleared.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ReassemblyError {
    /// The chunk failed header validation.
    #[error("malformed chunk: {0}")]
    Malformed(#[from] ChunkError),
    /// The chunk would overflow the reassembly buffer.
    #[error("reassembly buffer overflow at sequence {sequence}: {source}")]
    Overflow {
        sequence: SequenceNumber,
        #[source]
        source: OverflowError,
    },
}

impl ReassemblyError {
    /// Short label used for log fields and metric labels.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::Overflow { .. } => "overflow",
        }
    }
}

/// Errors produced while sending outbound data.
#[derive(Debug, Error)]
pub enum SendError {
    /// A chunk could not be wrapped into a frame.
    #[error("failed to build chunk frame: {0}")]
    Frame(#[from] FrameError),
    /// The transport rejected a frame.
    #[error("transport rejected chunk after {sent} frames: {source}")]
    Transport {
        /// Frames successfully handed to the transport before the failure.
        sent: usize,
        #[source]
        source: TransportError,
    },
}
