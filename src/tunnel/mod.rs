//! Chunking a byte stream into CAN frames and stitching it back together.
//!
//! This module collects the domain types of the tunnel protocol. The
//! outbound [`Fragmenter`] splits bytes into sequence-numbered chunks of at
//! most [`MAX_CHUNK_PAYLOAD`] bytes; the inbound [`Reassembler`] validates
//! chunks, resynchronises on loss, and buffers payload bytes in a
//! [`RingBuffer`] until a reader drains them.

pub mod codec;
pub mod error;
pub mod fragmenter;
pub mod header;
pub mod reassembler;
pub mod ring;
pub mod sequence;

pub use codec::{decode_chunk, encode_chunk};
pub use error::{ChunkError, ChunkOutcome, OverflowError, ReassemblyError, SendError};
pub use fragmenter::{ChunkBatch, Fragmenter};
pub use header::ChunkHeader;
pub use reassembler::Reassembler;
pub use ring::RingBuffer;
pub use sequence::{SequenceNumber, SequenceStatus, SequenceTracker};

/// Bytes of header prefixed to every chunk.
pub const CHUNK_HEADER_SIZE: usize = 2;
/// Largest payload carried by one chunk.
pub const MAX_CHUNK_PAYLOAD: usize = 7;
/// Flag bit in the length byte marking the final chunk of a message.
pub const LAST_CHUNK_FLAG: u8 = 0x80;
/// Mask selecting the payload length from the length byte.
pub const CHUNK_LEN_MASK: u8 = 0x0F;

const _: () = assert!(CHUNK_HEADER_SIZE + MAX_CHUNK_PAYLOAD <= crate::frame::MAX_FRAME_PAYLOAD);
