//! Wrapping chunk sequence numbers and the inbound ordering tracker.
//!
//! Unlike a per-message fragment index, the tunnel sequence is a single
//! 8-bit counter per direction that runs across message boundaries and wraps
//! at 256. The tracker never rejects a chunk; it only tells the reassembler
//! whether the chunk continues the stream or forces a resynchronisation.

use derive_more::{Display, From, Into};

/// Position of a chunk within one direction of the tunnel.
///
/// # Examples
///
/// ```
/// use uart_over_can::tunnel::SequenceNumber;
/// assert_eq!(SequenceNumber::new(41).wrapping_next(), SequenceNumber::new(42));
/// assert_eq!(SequenceNumber::new(255).wrapping_next(), SequenceNumber::new(0));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, From, Into)]
#[display("{_0}")]
pub struct SequenceNumber(u8);

impl SequenceNumber {
    /// Wrap a raw sequence byte.
    #[must_use]
    pub const fn new(value: u8) -> Self { Self(value) }

    /// Return the raw sequence byte.
    #[must_use]
    pub const fn get(self) -> u8 { self.0 }

    /// Return the following sequence number, wrapping at 256.
    #[must_use]
    pub const fn wrapping_next(self) -> Self { Self(self.0.wrapping_add(1)) }
}

/// How an observed sequence number relates to the stream so far.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequenceStatus {
    /// Nothing was buffered; the chunk starts a new run.
    FreshStart,
    /// The chunk carries the expected sequence number.
    InOrder,
    /// A chunk was lost or reordered; buffered data must be dropped.
    Resync {
        expected: SequenceNumber,
        found: SequenceNumber,
    },
}

/// Tracks the next sequence number the reassembler will accept.
#[derive(Clone, Debug, Default)]
pub struct SequenceTracker {
    expected: SequenceNumber,
}

impl SequenceTracker {
    /// Create a tracker expecting sequence zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            expected: SequenceNumber::new(0),
        }
    }

    /// Sequence number the next in-order chunk must carry.
    #[must_use]
    pub const fn expected(&self) -> SequenceNumber { self.expected }

    /// Classify `found` and advance the expectation past it.
    ///
    /// `fresh_start` should be `true` when no data is buffered, in which case
    /// any sequence number is accepted. The expectation always moves to
    /// `found + 1`, whichever status is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use uart_over_can::tunnel::{SequenceNumber, SequenceStatus, SequenceTracker};
    /// let mut tracker = SequenceTracker::new();
    /// assert_eq!(tracker.observe(SequenceNumber::new(5), true), SequenceStatus::FreshStart);
    /// assert_eq!(tracker.observe(SequenceNumber::new(6), false), SequenceStatus::InOrder);
    /// assert_eq!(
    ///     tracker.observe(SequenceNumber::new(8), false),
    ///     SequenceStatus::Resync {
    ///         expected: SequenceNumber::new(7),
    ///         found: SequenceNumber::new(8),
    ///     }
    /// );
    /// assert_eq!(tracker.expected(), SequenceNumber::new(9));
    /// ```
    pub fn observe(&mut self, found: SequenceNumber, fresh_start: bool) -> SequenceStatus {
        let status = if fresh_start {
            SequenceStatus::FreshStart
        } else if found == self.expected {
            SequenceStatus::InOrder
        } else {
            SequenceStatus::Resync {
                expected: self.expected,
                found,
            }
        };
        self.expected = found.wrapping_next();
        status
    }

    /// Forget the current expectation.
    pub fn reset(&mut self) { self.expected = SequenceNumber::new(0); }
}
