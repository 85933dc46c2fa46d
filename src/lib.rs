//! # rax-stream
//!
//! A compressed radix tree with seekable cursors, and an append-only stream
//! keyed by time-ordered IDs built on top of it.
//!
//! ## Example
//!
//! ```rust
//! use rax_stream::{Direction, RadixTree, SeekOp};
//!
//! let mut tree: RadixTree<u64> = RadixTree::new();
//! tree.insert(b"a", 1);
//! tree.insert(b"ab", 2);
//! tree.insert(b"ac", 3);
//!
//! let mut it = tree.seek(SeekOp::Ge, b"aa");
//! assert_eq!(it.key(), Some(&b"ab"[..]));
//! it.step(Direction::Forward);
//! assert_eq!(it.value(), Some(&3));
//! ```
//!
//! Streams assign each entry a [`StreamId`] and keep entries in ID order:
//!
//! ```rust
//! use rax_stream::{Entry, IdSpec, ManualClock, Stream, StreamId};
//!
//! let mut stream = Stream::with_clock(ManualClock::new(1_000));
//! let id = stream.append(IdSpec::Auto, Entry::new().with("temp", "21.5")).unwrap();
//! assert_eq!(id, StreamId::new(1_000, 0));
//! assert_eq!(stream.get(&id).and_then(|e| e.get("temp")), Some(&b"21.5"[..]));
//! ```

#![deny(unsafe_code)]

mod config;
mod debug;
mod error;
mod iter;
mod key;
mod node;
mod stream;
mod tree;

pub use config::{OverflowPolicy, StreamConfig, TreeConfig};
pub use error::{Error, Result};
pub use iter::{Cursor, CursorState, Direction, SeekIterator, SeekOp};
pub use key::{KeyBytes, RadixKey};
pub use stream::{
    Clock, Entry, IdSpec, ManualClock, SharedStream, Stream, StreamId, StreamRange, SystemClock,
};
pub use tree::RadixTree;

#[cfg(test)]
mod proptests;
