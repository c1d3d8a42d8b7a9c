//! Property tests for the chunking and reassembly pipeline.

use std::num::NonZeroUsize;

use proptest::{collection::vec, prelude::*};

use crate::{
    frame::{CanFrame, DEFAULT_RX_CHANNEL, DEFAULT_TX_CHANNEL, MAX_FRAME_PAYLOAD},
    tunnel::{
        CHUNK_HEADER_SIZE,
        ChunkOutcome,
        Fragmenter,
        MAX_CHUNK_PAYLOAD,
        Reassembler,
        ReassemblyError,
        decode_chunk,
    },
};

const LARGE_CAPACITY: usize = 4096;

fn large_reassembler() -> Reassembler {
    Reassembler::new(DEFAULT_RX_CHANNEL, NonZeroUsize::new(LARGE_CAPACITY).expect("non-zero"))
}

fn fragment(data: &[u8], cap: usize) -> Vec<CanFrame> {
    Fragmenter::new(DEFAULT_RX_CHANNEL)
        .with_chunk_payload_cap(NonZeroUsize::new(cap).expect("non-zero cap"))
        .fragment(data)
        .expect("fragment")
        .into_frames()
}

fn raw_frame() -> impl Strategy<Value = CanFrame> {
    (vec(any::<u8>(), 0..=MAX_FRAME_PAYLOAD), prop::bool::weighted(0.8)).prop_map(
        |(bytes, on_channel)| {
            let id = if on_channel { DEFAULT_RX_CHANNEL } else { DEFAULT_TX_CHANNEL };
            CanFrame::new(id, &bytes).expect("at most nine bytes")
        },
    )
}

proptest! {
    #[test]
    fn chunks_concatenate_to_input(data in vec(any::<u8>(), 0..512), cap in 1..=MAX_CHUNK_PAYLOAD) {
        let frames = fragment(&data, cap);
        prop_assert_eq!(frames.len(), data.len().div_ceil(cap));

        let mut joined = Vec::with_capacity(data.len());
        for (index, frame) in frames.iter().enumerate() {
            let (header, payload) = decode_chunk(frame).expect("well-formed chunk");
            prop_assert_eq!(usize::from(frame.dlc()), CHUNK_HEADER_SIZE + payload.len());
            prop_assert_eq!(header.is_last(), index + 1 == frames.len());
            prop_assert!(payload.len() <= cap);
            #[expect(clippy::cast_possible_truncation, reason = "sequence wraps at 256")]
            let expected_sequence = index as u8;
            prop_assert_eq!(header.sequence().get(), expected_sequence);
            joined.extend_from_slice(payload);
        }
        prop_assert_eq!(joined, data);
    }

    #[test]
    fn lossless_delivery_round_trips(
        data in vec(any::<u8>(), 0..2048),
        cap in 1..=MAX_CHUNK_PAYLOAD,
    ) {
        let mut reassembler = large_reassembler();
        for frame in fragment(&data, cap) {
            prop_assert!(reassembler.handle_frame(&frame));
        }
        prop_assert_eq!(reassembler.read_bytes(usize::MAX).to_vec(), data);
        prop_assert!(!reassembler.has_data());
    }

    #[test]
    fn dropped_chunk_never_corrupts_stream(
        data in vec(any::<u8>(), (MAX_CHUNK_PAYLOAD * 3)..1024),
        drop_seed in any::<prop::sample::Index>(),
    ) {
        let frames = fragment(&data, MAX_CHUNK_PAYLOAD);
        let dropped = drop_seed.index(frames.len());
        let mut reassembler = large_reassembler();
        for (index, frame) in frames.iter().enumerate() {
            if index != dropped {
                reassembler.handle_frame(frame);
            }
        }

        let received = reassembler.read_bytes(usize::MAX).to_vec();
        let expected = if dropped + 1 == frames.len() {
            &data[..dropped * MAX_CHUNK_PAYLOAD]
        } else {
            &data[(dropped + 1) * MAX_CHUNK_PAYLOAD..]
        };
        prop_assert_eq!(received.as_slice(), expected);
    }

    #[test]
    fn malformed_chunk_empties_buffer(
        data in vec(any::<u8>(), 1..256),
        declared in 8_u8..=15,
        seq in any::<u8>(),
    ) {
        let mut reassembler = large_reassembler();
        for frame in fragment(&data, MAX_CHUNK_PAYLOAD) {
            reassembler.handle_frame(&frame);
        }
        prop_assert!(reassembler.has_data());

        let bad = CanFrame::new(DEFAULT_RX_CHANNEL, &[seq, declared]).expect("frame");
        prop_assert!(reassembler.handle_frame(&bad));
        prop_assert!(!reassembler.has_data());
    }

    #[test]
    fn overflowing_burst_clears_instead_of_filling(
        data in vec(any::<u8>(), 64..512),
        capacity in 8_usize..64,
    ) {
        let mut reassembler =
            Reassembler::new(DEFAULT_RX_CHANNEL, NonZeroUsize::new(capacity).expect("non-zero"));
        let mut overflows = 0_usize;
        for frame in fragment(&data, MAX_CHUNK_PAYLOAD) {
            let before = reassembler.len();
            match reassembler.accept(&frame) {
                Ok(ChunkOutcome::Appended { len, .. }) => {
                    prop_assert_eq!(reassembler.len(), before + len);
                }
                Err(ReassemblyError::Overflow { source, .. }) => {
                    overflows += 1;
                    prop_assert_eq!(source.available, capacity - 1 - before);
                    prop_assert!(!reassembler.has_data());
                }
                other => prop_assert!(false, "unexpected outcome: {:?}", other),
            }
        }
        prop_assert!(overflows > 0);
    }

    #[test]
    fn arbitrary_frames_keep_invariants(frames in vec(raw_frame(), 0..64)) {
        let mut reassembler =
            Reassembler::new(DEFAULT_RX_CHANNEL, NonZeroUsize::new(32).expect("non-zero"));
        for frame in &frames {
            let consumed = reassembler.handle_frame(frame);
            if frame.id() != DEFAULT_RX_CHANNEL || usize::from(frame.dlc()) < CHUNK_HEADER_SIZE {
                prop_assert!(!consumed);
            } else {
                prop_assert!(consumed);
            }
            prop_assert!(reassembler.len() <= reassembler.usable_capacity());
        }
    }
}
