//! Configuration for trees and streams.

/// Configuration for a [`RadixTree`](crate::RadixTree).
#[derive(Debug, Clone)]
pub struct TreeConfig {
    /// Number of node slots to pre-allocate.
    pub initial_capacity: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
        }
    }
}

/// What to do when the sequence counter of the current millisecond is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Fail the append with [`Error::SequenceOverflow`](crate::Error::SequenceOverflow).
    #[default]
    Reject,
    /// Move to the next millisecond with sequence 0, ahead of the wall clock.
    AdvanceMs,
}

/// Configuration for a [`Stream`](crate::Stream).
#[derive(Debug, Clone, Default)]
pub struct StreamConfig {
    /// Configuration of the underlying entry tree.
    pub tree: TreeConfig,
    /// Trim the oldest entries after every append so that at most this many remain.
    pub max_len: Option<usize>,
    /// Behaviour of auto-generated IDs on sequence exhaustion.
    pub on_sequence_overflow: OverflowPolicy,
}
