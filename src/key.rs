//! Order-preserving key encodings.
//!
//! A [`RadixKey`] maps a value to bytes such that byte-wise order of the
//! encodings equals the natural order of the values, so seeks and iteration
//! over encoded keys follow the typed order.

use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::iter::{SeekIterator, SeekOp};
use crate::tree::RadixTree;

/// Encoded key bytes. Fixed-width keys never spill.
pub type KeyBytes = SmallVec<[u8; 16]>;

pub trait RadixKey: Sized {
    fn encode(&self) -> KeyBytes;

    fn decode(bytes: &[u8]) -> Result<Self>;
}

fn fixed<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| Error::KeyDecode {
        expected: N,
        found: bytes.len(),
    })
}

macro_rules! unsigned_key {
    ($($t:ty),*) => {$(
        impl RadixKey for $t {
            #[inline]
            fn encode(&self) -> KeyBytes {
                KeyBytes::from_slice(&self.to_be_bytes())
            }

            #[inline]
            fn decode(bytes: &[u8]) -> Result<Self> {
                Ok(<$t>::from_be_bytes(fixed(bytes)?))
            }
        }
    )*};
}

// Flipping the sign bit puts negatives before positives in unsigned order.
macro_rules! signed_key {
    ($($t:ty => $u:ty),*) => {$(
        impl RadixKey for $t {
            #[inline]
            fn encode(&self) -> KeyBytes {
                let flipped = (*self as $u) ^ (1 << (<$u>::BITS - 1));
                KeyBytes::from_slice(&flipped.to_be_bytes())
            }

            #[inline]
            fn decode(bytes: &[u8]) -> Result<Self> {
                let raw = <$u>::from_be_bytes(fixed(bytes)?);
                Ok((raw ^ (1 << (<$u>::BITS - 1))) as $t)
            }
        }
    )*};
}

// IEEE 754 total order: negatives have every bit inverted, non-negatives
// only the sign bit.
macro_rules! float_key {
    ($($t:ty => $u:ty),*) => {$(
        impl RadixKey for $t {
            #[inline]
            fn encode(&self) -> KeyBytes {
                let bits = self.to_bits();
                let sign = 1 << (<$u>::BITS - 1);
                let ordered = if bits & sign != 0 { !bits } else { bits | sign };
                KeyBytes::from_slice(&ordered.to_be_bytes())
            }

            #[inline]
            fn decode(bytes: &[u8]) -> Result<Self> {
                let ordered = <$u>::from_be_bytes(fixed(bytes)?);
                let sign = 1 << (<$u>::BITS - 1);
                let bits = if ordered & sign != 0 { ordered & !sign } else { !ordered };
                Ok(<$t>::from_bits(bits))
            }
        }
    )*};
}

unsigned_key!(u8, u16, u32, u64, u128, usize);
signed_key!(i8 => u8, i16 => u16, i32 => u32, i64 => u64, i128 => u128, isize => usize);
float_key!(f32 => u32, f64 => u64);

impl RadixKey for Vec<u8> {
    fn encode(&self) -> KeyBytes {
        KeyBytes::from_slice(self)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bytes.to_vec())
    }
}

impl RadixKey for String {
    fn encode(&self) -> KeyBytes {
        KeyBytes::from_slice(self.as_bytes())
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(String::from_utf8(bytes.to_vec())?)
    }
}

/// Typed convenience wrappers. Keys of different types should not share a tree.
impl<V> RadixTree<V> {
    pub fn insert_typed<K: RadixKey>(&mut self, key: &K, value: V) -> Option<V> {
        self.insert(&key.encode(), value)
    }

    pub fn get_typed<K: RadixKey>(&self, key: &K) -> Option<&V> {
        self.get(&key.encode())
    }

    pub fn remove_typed<K: RadixKey>(&mut self, key: &K) -> Option<V> {
        self.remove(&key.encode())
    }

    pub fn seek_typed<K: RadixKey>(&self, op: SeekOp, key: &K) -> SeekIterator<'_, V> {
        self.seek(op, &key.encode())
    }
}
