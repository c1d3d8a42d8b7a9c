use super::{CHUNK_LEN_MASK, LAST_CHUNK_FLAG, SequenceNumber};

/// Two-byte header prefixed to every chunk.
///
/// Byte 0 carries the sequence number. Byte 1 packs the payload length into
/// its low nibble and the last-chunk marker into bit 7; bits 4-6 are reserved
/// and always written as zero.
///
/// # Examples
///
/// ```
/// use uart_over_can::tunnel::{ChunkHeader, SequenceNumber};
/// let header = ChunkHeader::new(SequenceNumber::new(1), 3, true);
/// assert_eq!(header.encode(), [0x01, 0x83]);
/// assert_eq!(ChunkHeader::decode([0x01, 0x83]), header);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkHeader {
    sequence: SequenceNumber,
    len: u8,
    is_last: bool,
}

impl ChunkHeader {
    /// Create a header. Only the low nibble of `len` reaches the wire.
    #[must_use]
    pub const fn new(sequence: SequenceNumber, len: u8, is_last: bool) -> Self {
        Self {
            sequence,
            len: len & CHUNK_LEN_MASK,
            is_last,
        }
    }

    /// Return the chunk sequence number.
    #[must_use]
    pub const fn sequence(&self) -> SequenceNumber { self.sequence }

    /// Return the declared payload length.
    #[must_use]
    pub const fn len(&self) -> u8 { self.len }

    /// Report whether the chunk declares an empty payload.
    #[must_use]
    pub const fn is_empty(&self) -> bool { self.len == 0 }

    /// Report whether this chunk closes a message.
    #[must_use]
    pub const fn is_last(&self) -> bool { self.is_last }

    /// Pack the header into its wire bytes.
    #[must_use]
    pub const fn encode(&self) -> [u8; 2] {
        let flags = if self.is_last { LAST_CHUNK_FLAG } else { 0 };
        [self.sequence.get(), self.len | flags]
    }

    /// Unpack wire bytes. Reserved bits are ignored.
    #[must_use]
    pub const fn decode(bytes: [u8; 2]) -> Self {
        Self {
            sequence: SequenceNumber::new(bytes[0]),
            len: bytes[1] & CHUNK_LEN_MASK,
            is_last: bytes[1] & LAST_CHUNK_FLAG != 0,
        }
    }
}
