#![doc(html_root_url = "https://docs.rs/uart-over-can/latest")]
//! Public API for the `uart-over-can` library.
//!
//! This crate tunnels an arbitrary byte stream, such as a UART channel,
//! across a transport limited to small frames. Outbound bytes are split into
//! sequence-numbered chunks; inbound chunks are validated, resynchronised on
//! loss, and reassembled into a bounded circular buffer for a reader to
//! drain.

pub mod config;
pub mod endpoint;
pub mod frame;
pub mod metrics;
pub mod transport;
pub mod tunnel;

pub use config::{ConfigError, TunnelConfig};
pub use endpoint::{ReceiveHandle, UartOverCan};
pub use frame::{CanFrame, ChannelId, FrameError};
pub use transport::{
    FrameDispatcher,
    FrameHandler,
    FrameSink,
    MemoryBus,
    TextSink,
    TransportError,
};
pub use tunnel::{
    ChunkBatch,
    ChunkError,
    ChunkHeader,
    ChunkOutcome,
    Fragmenter,
    Reassembler,
    ReassemblyError,
    SendError,
    SequenceNumber,
};
