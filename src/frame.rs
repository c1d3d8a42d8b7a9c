//! CAN frame model shared by the outbound and inbound tunnel paths.
//!
//! [`CanFrame`] mirrors what a CAN controller hands over: an identifier, a
//! small data register, and the declared data length code (DLC). The
//! register is sized for the largest tunnel frame, a two-byte chunk header
//! plus a seven-byte chunk. Transports limited to eight bytes pair with a
//! fragmenter capped at six payload bytes per chunk. Frames also round-trip
//! through the compact candump text notation (`701#0007AABB`) so they can be
//! logged, replayed, and piped between tools.

use std::{fmt, str::FromStr};

use derive_more::{Display, From, Into};
use serde::Deserialize;
use thiserror::Error;

/// Largest frame payload the tunnel produces or accepts.
pub const MAX_FRAME_PAYLOAD: usize = 9;

/// Identifier the local node transmits tunnel chunks on.
pub const DEFAULT_TX_CHANNEL: ChannelId = ChannelId::new(0x700);
/// Identifier the local node listens on for chunks sent by its peer.
pub const DEFAULT_RX_CHANNEL: ChannelId = ChannelId::new(0x701);

const MAX_DLC: u8 = 9;

/// Largest identifier representable in the 29-bit extended format.
const MAX_EXTENDED_ID: u32 = 0x1FFF_FFFF;

/// CAN identifier selecting one direction of the tunnel.
///
/// # Examples
///
/// ```
/// use uart_over_can::frame::ChannelId;
/// let id = ChannelId::new(0x701);
/// assert_eq!(id.get(), 0x701);
/// assert_eq!(id.to_string(), "701");
/// ```
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into, Deserialize,
)]
#[display("{_0:X}")]
#[serde(transparent)]
pub struct ChannelId(u32);

impl ChannelId {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self { Self(value) }

    /// Return the raw identifier.
    #[must_use]
    pub const fn get(self) -> u32 { self.0 }
}

/// Errors raised while building or parsing frames.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The payload does not fit into a single frame.
    #[error("frame payload of {len} bytes exceeds the {MAX_FRAME_PAYLOAD}-byte limit")]
    PayloadTooLong { len: usize },
    /// The text form could not be parsed.
    #[error("invalid frame text {input:?}: {reason}")]
    Parse { input: String, reason: &'static str },
}

/// A single transport frame.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanFrame {
    id: ChannelId,
    data: [u8; MAX_FRAME_PAYLOAD],
    dlc: u8,
}

impl CanFrame {
    /// Build a frame carrying `payload` on `id`.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::PayloadTooLong`] when `payload` exceeds
    /// [`MAX_FRAME_PAYLOAD`] bytes.
    pub fn new(id: ChannelId, payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() > MAX_FRAME_PAYLOAD {
            return Err(FrameError::PayloadTooLong { len: payload.len() });
        }
        let mut data = [0_u8; MAX_FRAME_PAYLOAD];
        data[..payload.len()].copy_from_slice(payload);
        #[expect(clippy::cast_possible_truncation, reason = "payload is at most 9 bytes")]
        let dlc = payload.len() as u8;
        Ok(Self { id, data, dlc })
    }

    /// Build a frame the way a controller delivers it: the full data
    /// register plus the declared length code, clamped to the register size.
    #[must_use]
    pub fn from_raw(id: ChannelId, data: [u8; MAX_FRAME_PAYLOAD], dlc: u8) -> Self {
        Self {
            id,
            data,
            dlc: dlc.min(MAX_DLC),
        }
    }

    /// Identifier the frame travels on.
    #[must_use]
    pub const fn id(&self) -> ChannelId { self.id }

    /// Declared data length code.
    #[must_use]
    pub const fn dlc(&self) -> u8 { self.dlc }

    /// Bytes covered by the declared length.
    #[must_use]
    pub fn payload(&self) -> &[u8] { &self.data[..usize::from(self.dlc)] }
}

impl fmt::Debug for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CanFrame({self})")
    }
}

impl fmt::Display for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03X}#", self.id.get())?;
        for byte in self.payload() {
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

impl FromStr for CanFrame {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_err = |reason| FrameError::Parse {
            input: s.to_owned(),
            reason,
        };

        let line = s.trim();
        let (id, data) = line.split_once('#').ok_or_else(|| parse_err("missing '#'"))?;
        if id.is_empty() {
            return Err(parse_err("empty identifier"));
        }
        let id = u32::from_str_radix(id, 16).map_err(|_| parse_err("identifier is not hex"))?;
        if id > MAX_EXTENDED_ID {
            return Err(parse_err("identifier exceeds 29 bits"));
        }
        if data.len() % 2 != 0 {
            return Err(parse_err("odd number of data digits"));
        }
        if data.len() / 2 > MAX_FRAME_PAYLOAD {
            return Err(parse_err("more than nine data bytes"));
        }

        let mut payload = Vec::with_capacity(data.len() / 2);
        for pair in data.as_bytes().chunks(2) {
            let digits = std::str::from_utf8(pair).map_err(|_| parse_err("non-ascii data"))?;
            let byte = u8::from_str_radix(digits, 16).map_err(|_| parse_err("data is not hex"))?;
            payload.push(byte);
        }
        Self::new(ChannelId::new(id), &payload)
    }
}
