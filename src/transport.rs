//! Seams between the tunnel and the frame transport.
//!
//! The transport is an external collaborator: it accepts outbound frames
//! through a [`FrameSink`] and offers every inbound frame to the handlers
//! registered with a [`FrameDispatcher`], in registration order, until one
//! of them consumes it.

use std::{collections::BTreeSet, fmt, io};

use thiserror::Error;
use tracing::trace;

use crate::frame::{CanFrame, ChannelId};

/// Errors reported by a transport when sending a frame.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport refused the frame.
    #[error("transport rejected frame on channel {id}: {reason}")]
    Rejected { id: ChannelId, reason: String },
    /// Writing the frame failed.
    #[error("transport i/o failed: {0}")]
    Io(#[from] io::Error),
}

/// Outbound half of a transport.
pub trait FrameSink {
    /// Hand `frame` to the transport.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the frame cannot be sent.
    fn send(&mut self, frame: &CanFrame) -> Result<(), TransportError>;
}

impl FrameSink for Vec<CanFrame> {
    fn send(&mut self, frame: &CanFrame) -> Result<(), TransportError> {
        self.push(*frame);
        Ok(())
    }
}

/// Consumer of inbound frames.
///
/// Handlers run to completion and never block. Returning `false` lets the
/// dispatcher offer the frame to the next handler.
pub trait FrameHandler {
    /// Process `frame`, returning whether it was consumed.
    fn handle(&mut self, frame: &CanFrame) -> bool;

    /// Drop any per-transport state after the transport was reset.
    fn clear(&mut self) {}
}

impl<F> FrameHandler for F
where
    F: FnMut(&CanFrame) -> bool,
{
    fn handle(&mut self, frame: &CanFrame) -> bool { self(frame) }
}

/// Ordered collection of receive handlers owned by the transport.
#[derive(Default)]
pub struct FrameDispatcher {
    channels: BTreeSet<ChannelId>,
    handlers: Vec<Box<dyn FrameHandler + Send>>,
}

impl FrameDispatcher {
    /// Create an empty dispatcher that delivers frames on every channel.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Ask for frames on `id` to be delivered.
    ///
    /// Once any channel is registered, frames on unregistered channels are
    /// filtered out before reaching the handlers.
    pub fn register_for_channel(&mut self, id: ChannelId) { self.channels.insert(id); }

    /// Append a handler to the dispatch order.
    pub fn add_handler(&mut self, handler: impl FrameHandler + Send + 'static) {
        self.handlers.push(Box::new(handler));
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize { self.handlers.len() }

    /// Offer `frame` to each handler until one consumes it.
    ///
    /// Returns whether any handler consumed the frame.
    pub fn dispatch(&mut self, frame: &CanFrame) -> bool {
        if !self.channels.is_empty() && !self.channels.contains(&frame.id()) {
            trace!(id = %frame.id(), "dropping frame on unregistered channel");
            return false;
        }
        self.handlers.iter_mut().any(|handler| handler.handle(frame))
    }

    /// Tell every handler the transport state was reset.
    pub fn notify_clear(&mut self) {
        for handler in &mut self.handlers {
            handler.clear();
        }
    }
}

impl fmt::Debug for FrameDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameDispatcher")
            .field("channels", &self.channels)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// In-process transport that records every frame sent through it.
#[derive(Debug, Default)]
pub struct MemoryBus {
    frames: Vec<CanFrame>,
    fail_after: Option<usize>,
}

impl MemoryBus {
    /// Create an empty bus that accepts every frame.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Reject every frame once `accepted` frames have been recorded.
    #[must_use]
    pub fn failing_after(accepted: usize) -> Self {
        Self {
            frames: Vec::new(),
            fail_after: Some(accepted),
        }
    }

    /// Frames recorded so far.
    #[must_use]
    pub fn frames(&self) -> &[CanFrame] { &self.frames }

    /// Remove and return the recorded frames.
    pub fn take_frames(&mut self) -> Vec<CanFrame> { std::mem::take(&mut self.frames) }

    /// Deliver the recorded frames to `dispatcher` in order, emptying the bus.
    ///
    /// Returns how many frames were consumed by a handler.
    pub fn deliver_to(&mut self, dispatcher: &mut FrameDispatcher) -> usize {
        self.take_frames()
            .iter()
            .filter(|frame| dispatcher.dispatch(frame))
            .count()
    }
}

impl FrameSink for MemoryBus {
    fn send(&mut self, frame: &CanFrame) -> Result<(), TransportError> {
        if self.fail_after.is_some_and(|limit| self.frames.len() >= limit) {
            return Err(TransportError::Rejected {
                id: frame.id(),
                reason: "bus offline".to_owned(),
            });
        }
        self.frames.push(*frame);
        Ok(())
    }
}

/// Transport writing frames as candump text lines, one per frame.
#[derive(Debug)]
pub struct TextSink<W> {
    writer: W,
}

impl<W: io::Write> TextSink<W> {
    /// Wrap `writer`.
    pub const fn new(writer: W) -> Self { Self { writer } }

    /// Return the wrapped writer.
    pub fn into_inner(self) -> W { self.writer }
}

impl<W: io::Write> FrameSink for TextSink<W> {
    fn send(&mut self, frame: &CanFrame) -> Result<(), TransportError> {
        writeln!(self.writer, "{frame}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use rstest::rstest;

    use super::*;

    fn frame(id: u32) -> CanFrame { CanFrame::new(ChannelId::new(id), &[0, 0]).expect("frame") }

    #[test]
    fn dispatch_stops_at_first_consumer() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = FrameDispatcher::new();
        for (name, consumes) in [("first", false), ("second", true), ("third", true)] {
            let calls = Arc::clone(&calls);
            dispatcher.add_handler(move |_: &CanFrame| {
                calls.lock().expect("lock").push(name);
                consumes
            });
        }

        assert!(dispatcher.dispatch(&frame(0x701)));
        assert_eq!(*calls.lock().expect("lock"), vec!["first", "second"]);
    }

    #[test]
    fn dispatch_reports_unconsumed_frames() {
        let mut dispatcher = FrameDispatcher::new();
        dispatcher.add_handler(|_: &CanFrame| false);
        assert!(!dispatcher.dispatch(&frame(0x123)));
    }

    #[rstest]
    #[case(0x701, true)]
    #[case(0x702, false)]
    fn registered_channels_filter_frames(#[case] id: u32, #[case] delivered: bool) {
        let mut dispatcher = FrameDispatcher::new();
        dispatcher.register_for_channel(ChannelId::new(0x701));
        dispatcher.add_handler(|_: &CanFrame| true);
        assert_eq!(dispatcher.dispatch(&frame(id)), delivered);
    }

    #[test]
    fn notify_clear_reaches_every_handler() {
        struct Counting(Arc<Mutex<usize>>);

        impl FrameHandler for Counting {
            fn handle(&mut self, _frame: &CanFrame) -> bool { false }

            fn clear(&mut self) { *self.0.lock().expect("lock") += 1; }
        }

        let cleared = Arc::new(Mutex::new(0));
        let mut dispatcher = FrameDispatcher::new();
        dispatcher.add_handler(Counting(Arc::clone(&cleared)));
        dispatcher.add_handler(Counting(Arc::clone(&cleared)));
        dispatcher.notify_clear();
        assert_eq!(*cleared.lock().expect("lock"), 2);
    }

    #[test]
    fn memory_bus_rejects_after_limit() {
        let mut bus = MemoryBus::failing_after(1);
        bus.send(&frame(0x700)).expect("first frame accepted");
        let err = bus.send(&frame(0x700)).expect_err("second frame rejected");
        assert!(matches!(err, TransportError::Rejected { .. }));
        assert_eq!(bus.frames().len(), 1);
    }

    #[test]
    fn text_sink_writes_candump_lines() {
        let mut sink = TextSink::new(Vec::new());
        sink.send(&frame(0x700)).expect("write");
        sink.send(&frame(0x701)).expect("write");
        let text = String::from_utf8(sink.into_inner()).expect("utf8");
        assert_eq!(text, "700#0000\n701#0000\n");
    }
}
