//! Append-only streams keyed by [`StreamId`].
//!
//! A stream stores entries in a [`RadixTree`] under their encoded IDs, so
//! range scans are seeks on the tree. IDs are strictly increasing: the last
//! assigned ID is remembered even after its entry is removed or trimmed.

mod clock;
mod id;
mod shared;

pub use clock::{Clock, ManualClock, SystemClock};
pub use id::StreamId;
pub use shared::SharedStream;

use std::ops::Bound;

use log::debug;

use crate::config::{OverflowPolicy, StreamConfig};
use crate::error::{Error, Result};
use crate::iter::{Direction, SeekIterator, SeekOp};
use crate::tree::RadixTree;

/// Field/value pairs of one stream entry, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    fields: Vec<(Vec<u8>, Vec<u8>)>,
}

impl Entry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field append.
    pub fn with(mut self, field: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        self.push(field, value);
        self
    }

    pub fn push(&mut self, field: impl AsRef<[u8]>, value: impl AsRef<[u8]>) {
        self.fields
            .push((field.as_ref().to_vec(), value.as_ref().to_vec()));
    }

    /// Value of the first field named `field`.
    pub fn get(&self, field: impl AsRef<[u8]>) -> Option<&[u8]> {
        let field = field.as_ref();
        self.fields
            .iter()
            .find(|(f, _)| f.as_slice() == field)
            .map(|(_, v)| v.as_slice())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.fields.iter().map(|(f, v)| (f.as_slice(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<F: AsRef<[u8]>, V: AsRef<[u8]>> FromIterator<(F, V)> for Entry {
    fn from_iter<I: IntoIterator<Item = (F, V)>>(iter: I) -> Self {
        let mut entry = Entry::new();
        for (f, v) in iter {
            entry.push(f, v);
        }
        entry
    }
}

/// How the ID of an appended entry is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSpec {
    /// Generate from the clock.
    Auto,
    /// Use exactly this ID; it must be greater than the last ID.
    Explicit(StreamId),
    /// Use this ID if it is greater than the last ID, otherwise generate one
    /// as if the clock read its millisecond.
    Suggested(StreamId),
}

/// An append-only log of [`Entry`] values ordered by [`StreamId`].
pub struct Stream<C = SystemClock> {
    entries: RadixTree<Entry>,
    last_id: StreamId,
    entries_added: u64,
    config: StreamConfig,
    clock: C,
}

impl Stream<SystemClock> {
    /// Create a new empty stream on the system clock.
    pub fn new() -> Self {
        Self::with_config(StreamConfig::default(), SystemClock)
    }
}

impl Default for Stream<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Stream<C> {
    pub fn with_clock(clock: C) -> Self {
        Self::with_config(StreamConfig::default(), clock)
    }

    pub fn with_config(config: StreamConfig, clock: C) -> Self {
        Self {
            entries: RadixTree::with_config(config.tree.clone()),
            last_id: StreamId::MIN,
            entries_added: 0,
            config,
            clock,
        }
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The greatest ID ever assigned, whether or not its entry still exists.
    pub fn last_id(&self) -> StreamId {
        self.last_id
    }

    /// Total number of successful appends over the stream's lifetime.
    pub fn entries_added(&self) -> u64 {
        self.entries_added
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// The underlying tree, keyed by encoded IDs.
    pub fn tree(&self) -> &RadixTree<Entry> {
        &self.entries
    }

    /// Append `entry`, returning the ID it was stored under.
    pub fn append(&mut self, spec: IdSpec, entry: Entry) -> Result<StreamId> {
        if entry.is_empty() {
            return Err(Error::EmptyEntry);
        }
        let id = match spec {
            IdSpec::Explicit(id) => {
                if id <= self.last_id {
                    debug!("rejected explicit id {id}, last id is {}", self.last_id);
                    return Err(Error::IdNotIncreasing {
                        id,
                        last: self.last_id,
                    });
                }
                id
            }
            IdSpec::Suggested(id) if id > self.last_id => id,
            IdSpec::Suggested(id) => self.generate(id.ms)?,
            IdSpec::Auto => {
                let now = self.clock.now_ms();
                if now < self.last_id.ms {
                    debug!(
                        "clock at {now} is behind last id {}, reusing its millisecond",
                        self.last_id
                    );
                }
                self.generate(now)?
            }
        };

        self.entries.insert(&id.encode(), entry);
        self.last_id = id;
        self.entries_added += 1;

        if let Some(max_len) = self.config.max_len {
            self.trim(max_len);
        }
        Ok(id)
    }

    fn generate(&self, wall_ms: u64) -> Result<StreamId> {
        match StreamId::next(&self.last_id, wall_ms) {
            Err(Error::SequenceOverflow { ms })
                if self.config.on_sequence_overflow == OverflowPolicy::AdvanceMs =>
            {
                let next_ms = ms.checked_add(1).ok_or(Error::SequenceOverflow { ms })?;
                debug!("sequence exhausted at {ms}, advancing to {next_ms}");
                Ok(StreamId::new(next_ms, 0))
            }
            other => other,
        }
    }

    pub fn get(&self, id: &StreamId) -> Option<&Entry> {
        self.entries.get(&id.encode())
    }

    /// Remove the entry stored under `id`. The last ID is left untouched.
    pub fn remove(&mut self, id: &StreamId) -> Option<Entry> {
        self.entries.remove(&id.encode())
    }

    pub fn first(&self) -> Option<(StreamId, &Entry)> {
        self.range(Bound::Unbounded, Bound::Unbounded).next()
    }

    pub fn last(&self) -> Option<(StreamId, &Entry)> {
        self.rev_range(Bound::Unbounded, Bound::Unbounded).next()
    }

    /// Entries with IDs within `start..end`, in ascending order.
    pub fn range(&self, start: Bound<StreamId>, end: Bound<StreamId>) -> StreamRange<'_> {
        let iter = match start {
            Bound::Included(id) => self.entries.seek(SeekOp::Ge, &id.encode()),
            Bound::Excluded(id) => self.entries.seek(SeekOp::Gt, &id.encode()),
            Bound::Unbounded => self.entries.seek(SeekOp::Min, &[]),
        };
        StreamRange {
            iter,
            stop: end,
            direction: Direction::Forward,
            done: false,
        }
    }

    /// Entries with IDs within `start..end`, in descending order.
    pub fn rev_range(&self, start: Bound<StreamId>, end: Bound<StreamId>) -> StreamRange<'_> {
        let iter = match end {
            Bound::Included(id) => self.entries.seek(SeekOp::Le, &id.encode()),
            Bound::Excluded(id) => self.entries.seek(SeekOp::Lt, &id.encode()),
            Bound::Unbounded => self.entries.seek(SeekOp::Max, &[]),
        };
        StreamRange {
            iter: iter.with_direction(Direction::Backward),
            stop: start,
            direction: Direction::Backward,
            done: false,
        }
    }

    /// Drop the oldest entries until at most `max_len` remain. Returns how
    /// many were removed.
    pub fn trim(&mut self, max_len: usize) -> usize {
        let excess = self.entries.len().saturating_sub(max_len);
        if excess == 0 {
            return 0;
        }
        let doomed: Vec<Vec<u8>> = self.entries.iter().take(excess).map(|(k, _)| k).collect();
        for key in &doomed {
            self.entries.remove(key);
        }
        debug!("trimmed {excess} entries to max length {max_len}");
        excess
    }
}

/// Iterator over a range of stream entries. See [`Stream::range`].
pub struct StreamRange<'a> {
    iter: SeekIterator<'a, Entry>,
    stop: Bound<StreamId>,
    direction: Direction,
    done: bool,
}

impl<'a> StreamRange<'a> {
    fn in_bounds(&self, id: &StreamId) -> bool {
        match (self.direction, &self.stop) {
            (_, Bound::Unbounded) => true,
            (Direction::Forward, Bound::Included(end)) => id <= end,
            (Direction::Forward, Bound::Excluded(end)) => id < end,
            (Direction::Backward, Bound::Included(start)) => id >= start,
            (Direction::Backward, Bound::Excluded(start)) => id > start,
        }
    }
}

impl<'a> Iterator for StreamRange<'a> {
    type Item = (StreamId, &'a Entry);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let (key, entry) = self.iter.next()?;
        let id = StreamId::decode(&key).expect("stream keys are encoded ids");
        if self.in_bounds(&id) {
            Some((id, entry))
        } else {
            self.done = true;
            None
        }
    }
}
