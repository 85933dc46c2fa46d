//! Stream entry identifiers.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::key::{KeyBytes, RadixKey};

/// Identifier of a stream entry: a millisecond timestamp plus a sequence
/// number disambiguating entries within the same millisecond.
///
/// IDs order by `(ms, seq)`. The 16-byte encoding is big-endian `ms` followed
/// by big-endian `seq`, so encoded IDs sort byte-wise in the same order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamId {
    pub const MIN: StreamId = StreamId { ms: 0, seq: 0 };
    pub const MAX: StreamId = StreamId {
        ms: u64::MAX,
        seq: u64::MAX,
    };

    /// Encoded length in bytes.
    pub const ENCODED_LEN: usize = 16;

    pub const fn new(ms: u64, seq: u64) -> Self {
        Self { ms, seq }
    }

    pub fn encode(&self) -> [u8; Self::ENCODED_LEN] {
        let mut buf = [0u8; Self::ENCODED_LEN];
        buf[..8].copy_from_slice(&self.ms.to_be_bytes());
        buf[8..].copy_from_slice(&self.seq.to_be_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let buf: &[u8; Self::ENCODED_LEN] = bytes
            .try_into()
            .map_err(|_| Error::MalformedId { len: bytes.len() })?;
        let (ms, seq) = buf.split_at(8);
        Ok(Self {
            ms: u64::from_be_bytes(ms.try_into().expect("8-byte half")),
            seq: u64::from_be_bytes(seq.try_into().expect("8-byte half")),
        })
    }

    #[inline]
    pub fn compare(a: &StreamId, b: &StreamId) -> Ordering {
        a.cmp(b)
    }

    /// The ID to assign after `last` given the current wall clock.
    ///
    /// A wall clock ahead of `last` starts a new millisecond at sequence 0.
    /// Otherwise (same millisecond, or the clock went backwards) the
    /// sequence of `last` is incremented.
    pub fn next(last: &StreamId, wall_ms: u64) -> Result<StreamId> {
        if wall_ms > last.ms {
            return Ok(StreamId::new(wall_ms, 0));
        }
        match last.seq.checked_add(1) {
            Some(seq) => Ok(StreamId::new(last.ms, seq)),
            None => Err(Error::SequenceOverflow { ms: last.ms }),
        }
    }

    /// The smallest ID greater than this one.
    pub fn incr(&self) -> Option<StreamId> {
        match self.seq.checked_add(1) {
            Some(seq) => Some(StreamId::new(self.ms, seq)),
            None => self.ms.checked_add(1).map(|ms| StreamId::new(ms, 0)),
        }
    }

    /// The largest ID less than this one.
    pub fn decr(&self) -> Option<StreamId> {
        match self.seq.checked_sub(1) {
            Some(seq) => Some(StreamId::new(self.ms, seq)),
            None => self.ms.checked_sub(1).map(|ms| StreamId::new(ms, u64::MAX)),
        }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

/// Parses `ms-seq`, or `ms` alone meaning sequence 0. `-` and `+` stand for
/// [`StreamId::MIN`] and [`StreamId::MAX`].
impl FromStr for StreamId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::ParseId(s.to_owned());
        match s {
            "-" => return Ok(StreamId::MIN),
            "+" => return Ok(StreamId::MAX),
            _ => {}
        }
        let (ms, seq) = match s.split_once('-') {
            Some((ms, seq)) => (ms, Some(seq)),
            None => (s, None),
        };
        let ms = ms.parse::<u64>().map_err(|_| invalid())?;
        let seq = match seq {
            Some(seq) => seq.parse::<u64>().map_err(|_| invalid())?,
            None => 0,
        };
        Ok(StreamId::new(ms, seq))
    }
}

impl RadixKey for StreamId {
    fn encode(&self) -> KeyBytes {
        KeyBytes::from_slice(&StreamId::encode(self))
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        StreamId::decode(bytes)
    }
}
