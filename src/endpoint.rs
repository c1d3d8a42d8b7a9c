//! One end of a UART tunnel, wired to a frame transport.
//!
//! [`UartOverCan`] pairs a [`Fragmenter`] for the outbound direction with a
//! [`Reassembler`] for the inbound one. The reassembler is written by the
//! transport's receive dispatch and drained by the stream reader, which may
//! run on another thread, so it lives behind a mutex shared with the
//! [`ReceiveHandle`] registered on the dispatcher.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tracing::debug;

use crate::{
    config::TunnelConfig,
    frame::{CanFrame, ChannelId},
    transport::{FrameDispatcher, FrameHandler, FrameSink},
    tunnel::{Fragmenter, Reassembler, SendError},
};

/// A tunnel endpoint.
#[derive(Debug)]
pub struct UartOverCan {
    fragmenter: Fragmenter,
    receiver: ReceiveHandle,
}

impl UartOverCan {
    /// Build an endpoint from `config`.
    #[must_use]
    pub fn new(config: &TunnelConfig) -> Self {
        Self {
            fragmenter: config.fragmenter(),
            receiver: ReceiveHandle::new(config.reassembler()),
        }
    }

    /// Channel outbound chunks are sent on.
    #[must_use]
    pub fn tx_channel(&self) -> ChannelId { self.fragmenter.channel() }

    /// Channel inbound chunks are expected on.
    #[must_use]
    pub fn rx_channel(&self) -> ChannelId { self.receiver.lock().channel() }

    /// Register for the inbound channel and install the receive handler.
    pub fn init(&self, dispatcher: &mut FrameDispatcher) {
        let channel = self.rx_channel();
        dispatcher.register_for_channel(channel);
        dispatcher.add_handler(self.receiver.clone());
        debug!(rx = %channel, tx = %self.tx_channel(), "tunnel endpoint attached");
    }

    /// Handle for delivering inbound frames without a dispatcher.
    #[must_use]
    pub fn receive_handle(&self) -> ReceiveHandle { self.receiver.clone() }

    /// Send `data` to the peer, blocking until every chunk was handed to `sink`.
    ///
    /// Returns the number of frames sent.
    ///
    /// # Errors
    ///
    /// Returns [`SendError`] when a frame cannot be built or the transport
    /// rejects one.
    pub fn send_uart_data<S>(
        &self,
        data: impl AsRef<[u8]>,
        sink: &mut S,
    ) -> Result<usize, SendError>
    where
        S: FrameSink + ?Sized,
    {
        self.fragmenter.send(data, sink)
    }

    /// Drain received bytes into `buf`, returning how many were copied.
    pub fn get_uart_data(&self, buf: &mut [u8]) -> usize { self.receiver.lock().read(buf) }

    /// Drain up to `max_len` received bytes.
    #[must_use]
    pub fn read_bytes(&self, max_len: usize) -> Bytes { self.receiver.lock().read_bytes(max_len) }

    /// Whether received bytes are waiting.
    #[must_use]
    pub fn has_data(&self) -> bool { self.receiver.lock().has_data() }

    /// Discard partially received data, as after a transport reset.
    pub fn clear(&self) { self.receiver.lock().clear(); }
}

/// Shared receive side of an endpoint, registered as a frame handler.
#[derive(Clone, Debug)]
pub struct ReceiveHandle {
    inner: Arc<Mutex<Reassembler>>,
}

impl ReceiveHandle {
    fn new(reassembler: Reassembler) -> Self {
        Self {
            inner: Arc::new(Mutex::new(reassembler)),
        }
    }

    // State is only mutated between frames; a poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, Reassembler> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FrameHandler for ReceiveHandle {
    fn handle(&mut self, frame: &CanFrame) -> bool { self.lock().handle_frame(frame) }

    fn clear(&mut self) { self.lock().clear(); }
}
