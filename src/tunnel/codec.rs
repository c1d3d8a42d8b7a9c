//! Wrapping and unwrapping chunks inside CAN frames.
//!
//! A chunk occupies the whole frame payload: the two header bytes from
//! [`ChunkHeader`] followed by up to [`MAX_CHUNK_PAYLOAD`] data bytes. The
//! frame length is always `CHUNK_HEADER_SIZE + len`.

use super::{CHUNK_HEADER_SIZE, ChunkError, ChunkHeader, MAX_CHUNK_PAYLOAD};
use crate::frame::{CanFrame, ChannelId, FrameError, MAX_FRAME_PAYLOAD};

/// Build the frame carrying `payload` on `channel`, prefixed by `header`.
///
/// The header's length field is taken from `payload`; the sequence and
/// last-chunk marker come from `header`.
///
/// # Errors
///
/// Returns [`FrameError::PayloadTooLong`] when `payload` exceeds
/// [`MAX_CHUNK_PAYLOAD`] bytes.
pub fn encode_chunk(
    channel: ChannelId,
    header: ChunkHeader,
    payload: &[u8],
) -> Result<CanFrame, FrameError> {
    if payload.len() > MAX_CHUNK_PAYLOAD {
        return Err(FrameError::PayloadTooLong {
            len: CHUNK_HEADER_SIZE + payload.len(),
        });
    }
    #[expect(clippy::cast_possible_truncation, reason = "payload is at most 7 bytes")]
    let header = ChunkHeader::new(header.sequence(), payload.len() as u8, header.is_last());

    let mut bytes = [0_u8; MAX_FRAME_PAYLOAD];
    bytes[..CHUNK_HEADER_SIZE].copy_from_slice(&header.encode());
    bytes[CHUNK_HEADER_SIZE..CHUNK_HEADER_SIZE + payload.len()].copy_from_slice(payload);
    CanFrame::new(channel, &bytes[..CHUNK_HEADER_SIZE + payload.len()])
}

/// Validate a frame and split it into its header and payload bytes.
///
/// The channel is not checked here; callers filter frames first.
///
/// # Errors
///
/// Returns [`ChunkError::FrameTooShort`] when the frame cannot hold a header,
/// [`ChunkError::LengthTooLarge`] when the header declares more than
/// [`MAX_CHUNK_PAYLOAD`] bytes, and [`ChunkError::Truncated`] when the
/// declared payload runs past the frame's data length.
pub fn decode_chunk(frame: &CanFrame) -> Result<(ChunkHeader, &[u8]), ChunkError> {
    let bytes = frame.payload();
    let [seq, flags, rest @ ..] = bytes else {
        return Err(ChunkError::FrameTooShort { dlc: frame.dlc() });
    };

    let header = ChunkHeader::decode([*seq, *flags]);
    let declared = header.len();
    if usize::from(declared) > MAX_CHUNK_PAYLOAD {
        return Err(ChunkError::LengthTooLarge { declared });
    }
    let Some(payload) = rest.get(..usize::from(declared)) else {
        return Err(ChunkError::Truncated {
            declared,
            available: rest.len(),
        });
    };
    Ok((header, payload))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{frame::DEFAULT_RX_CHANNEL, tunnel::SequenceNumber};

    #[test]
    fn encode_sets_length_from_payload() {
        let header = ChunkHeader::new(SequenceNumber::new(9), 0, true);
        let frame = encode_chunk(DEFAULT_RX_CHANNEL, header, &[0xAA, 0xBB]).expect("encode");
        assert_eq!(frame.payload(), &[0x09, 0x82, 0xAA, 0xBB]);
        assert_eq!(frame.dlc(), 4);
    }

    #[test]
    fn encode_rejects_oversized_chunk() {
        let header = ChunkHeader::new(SequenceNumber::new(0), 0, false);
        let err = encode_chunk(DEFAULT_RX_CHANNEL, header, &[0; 8]).expect_err("too long");
        assert_eq!(err, FrameError::PayloadTooLong { len: 10 });
    }

    #[test]
    fn decode_splits_header_and_payload() {
        let frame = CanFrame::new(DEFAULT_RX_CHANNEL, &[0x05, 0x03, 1, 2, 3]).expect("frame");
        let (header, payload) = decode_chunk(&frame).expect("valid chunk");
        assert_eq!(header.sequence(), SequenceNumber::new(5));
        assert!(!header.is_last());
        assert_eq!(payload, &[1, 2, 3]);
    }

    #[test]
    fn decode_ignores_trailing_bytes_past_declared_length() {
        let frame = CanFrame::new(DEFAULT_RX_CHANNEL, &[0x00, 0x81, 7, 8, 9]).expect("frame");
        let (header, payload) = decode_chunk(&frame).expect("valid chunk");
        assert!(header.is_last());
        assert_eq!(payload, &[7]);
    }

    #[rstest]
    #[case(&[], ChunkError::FrameTooShort { dlc: 0 })]
    #[case(&[0x00], ChunkError::FrameTooShort { dlc: 1 })]
    #[case(&[0x00, 0x08, 0, 0, 0, 0, 0, 0], ChunkError::LengthTooLarge { declared: 8 })]
    #[case(&[0x00, 0x8F], ChunkError::LengthTooLarge { declared: 15 })]
    #[case(&[0x00, 0x04, 1, 2], ChunkError::Truncated { declared: 4, available: 2 })]
    fn decode_rejects_malformed_frames(#[case] bytes: &[u8], #[case] expected: ChunkError) {
        let frame = CanFrame::new(DEFAULT_RX_CHANNEL, bytes).expect("frame");
        assert_eq!(decode_chunk(&frame), Err(expected));
    }
}
