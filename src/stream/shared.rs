//! Thread-safe stream handle.

use std::ops::Bound;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{Clock, Entry, IdSpec, Stream, StreamId, SystemClock};
use crate::config::StreamConfig;
use crate::error::Result;

/// A cloneable handle to a [`Stream`] behind a read-write lock.
///
/// Appends take the write lock, so ID generation and insertion happen as one
/// step. Readers get owned copies of entries.
pub struct SharedStream<C = SystemClock> {
    inner: Arc<RwLock<Stream<C>>>,
}

impl<C> Clone for SharedStream<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl SharedStream<SystemClock> {
    pub fn new() -> Self {
        Self::from_stream(Stream::new())
    }
}

impl Default for SharedStream<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> SharedStream<C> {
    pub fn with_config(config: StreamConfig, clock: C) -> Self {
        Self::from_stream(Stream::with_config(config, clock))
    }

    pub fn from_stream(stream: Stream<C>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(stream)),
        }
    }

    pub fn append(&self, spec: IdSpec, entry: Entry) -> Result<StreamId> {
        self.inner.write().append(spec, entry)
    }

    pub fn get(&self, id: &StreamId) -> Option<Entry> {
        self.inner.read().get(id).cloned()
    }

    pub fn remove(&self, id: &StreamId) -> Option<Entry> {
        self.inner.write().remove(id)
    }

    pub fn trim(&self, max_len: usize) -> usize {
        self.inner.write().trim(max_len)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn last_id(&self) -> StreamId {
        self.inner.read().last_id()
    }

    /// Copy out the entries within `start..end`, ascending, at most `limit`.
    pub fn range(
        &self,
        start: Bound<StreamId>,
        end: Bound<StreamId>,
        limit: usize,
    ) -> Vec<(StreamId, Entry)> {
        let stream = self.inner.read();
        stream
            .range(start, end)
            .take(limit)
            .map(|(id, e)| (id, e.clone()))
            .collect()
    }

    /// Run `f` under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&Stream<C>) -> R) -> R {
        f(&self.inner.read())
    }

    /// Run `f` under the write lock.
    pub fn write<R>(&self, f: impl FnOnce(&mut Stream<C>) -> R) -> R {
        f(&mut self.inner.write())
    }
}
