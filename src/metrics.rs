//! Metric helpers for `uart-over-can`.
//!
//! This module defines metric names and simple helper functions
//! wrapping the [`metrics`](https://docs.rs/metrics) crate. With the
//! `metrics` feature disabled the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::counter;

/// Name of the counter tracking tunnel frames by direction.
pub const FRAMES_TOTAL: &str = "uart_over_can_frames_total";
/// Name of the counter tracking reassembly errors by kind.
pub const ERRORS_TOTAL: &str = "uart_over_can_errors_total";
/// Name of the counter tracking sequence resynchronisations.
pub const RESYNCS_TOTAL: &str = "uart_over_can_resyncs_total";

/// Direction of frame processing.
#[derive(Clone, Copy, Debug)]
pub enum Direction {
    /// Chunks received from the peer.
    Inbound,
    /// Chunks sent to the peer.
    Outbound,
}

impl Direction {
    #[cfg_attr(not(feature = "metrics"), expect(dead_code, reason = "metrics disabled"))]
    fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Record a tunnel frame for the given direction.
#[cfg(feature = "metrics")]
pub fn inc_frames(direction: Direction) {
    counter!(FRAMES_TOTAL, "direction" => direction.as_str()).increment(1);
}

/// Record a reassembly error of the given kind.
#[cfg(feature = "metrics")]
pub fn inc_errors(kind: &'static str) { counter!(ERRORS_TOTAL, "kind" => kind).increment(1); }

/// Record a sequence resynchronisation.
#[cfg(feature = "metrics")]
pub fn inc_resyncs() { counter!(RESYNCS_TOTAL).increment(1); }

/// Record a tunnel frame for the given direction.
#[cfg(not(feature = "metrics"))]
pub fn inc_frames(_direction: Direction) {}

/// Record a reassembly error of the given kind.
#[cfg(not(feature = "metrics"))]
pub fn inc_errors(_kind: &'static str) {}

/// Record a sequence resynchronisation.
#[cfg(not(feature = "metrics"))]
pub fn inc_resyncs() {}
