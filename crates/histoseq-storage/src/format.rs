//! Binary record layout of the index file.
//!
//! ```text
//! Header (one line per bucket, bucket order):
//!   f32 LE × 256   centroid
//!   u64 LE         membership count
//! Body (per bucket, bucket order, count × entry):
//!   f32 LE × 256   feature vector
//!   u8             emitted symbol
//!   u64 LE         corpus position
//! ```
//!
//! The file carries no bucket count or version field. Readers must be told
//! the bucket count the index was built with.

use std::io::{Read, Seek, SeekFrom};

use histoseq_core::types::{zero_vector, Candidate, FeatureVector};
use histoseq_core::FEATURE_DIM;

use crate::error::{StorageError, StorageResult};

/// Bytes in one serialized feature vector.
pub const VECTOR_BYTES: usize = FEATURE_DIM * 4;

/// Bytes per header line: centroid plus membership count.
pub const HEADER_LINE_SIZE: usize = VECTOR_BYTES + 8;

/// Bytes per body entry: vector, symbol, position.
pub const ENTRY_SIZE: usize = VECTOR_BYTES + 1 + 8;

static_assertions::const_assert_eq!(HEADER_LINE_SIZE, 1032);
static_assertions::const_assert_eq!(ENTRY_SIZE, 1033);

/// Byte offset of the body for an index with `bucket_count` buckets, or
/// `None` if it does not fit in a `u64`.
#[inline]
pub fn body_offset(bucket_count: usize) -> Option<u64> {
    u64::try_from(bucket_count)
        .ok()?
        .checked_mul(HEADER_LINE_SIZE as u64)
}

/// One corpus position as stored in the body.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub vector: FeatureVector,
    pub symbol: u8,
    pub position: u64,
}

impl Entry {
    /// Serialize into `buf[..ENTRY_SIZE]`.
    pub fn encode_into(&self, buf: &mut [u8]) {
        write_vector(&self.vector, &mut buf[..VECTOR_BYTES]);
        buf[VECTOR_BYTES] = self.symbol;
        buf[VECTOR_BYTES + 1..ENTRY_SIZE].copy_from_slice(&self.position.to_le_bytes());
    }

    /// Deserialize from `buf[..ENTRY_SIZE]`.
    pub fn decode(buf: &[u8]) -> Self {
        Self {
            vector: read_vector(&buf[..VECTOR_BYTES]),
            symbol: buf[VECTOR_BYTES],
            position: read_u64(&buf[VECTOR_BYTES + 1..ENTRY_SIZE]),
        }
    }

    /// Score this entry as a search candidate.
    #[inline]
    pub fn to_candidate(&self, similarity: f32) -> Candidate {
        Candidate {
            vector: self.vector,
            symbol: self.symbol,
            position: self.position,
            similarity,
        }
    }
}

/// One header line.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderLine {
    pub centroid: FeatureVector,
    pub count: u64,
}

impl HeaderLine {
    pub fn encode_into(&self, buf: &mut [u8]) {
        write_vector(&self.centroid, &mut buf[..VECTOR_BYTES]);
        buf[VECTOR_BYTES..HEADER_LINE_SIZE].copy_from_slice(&self.count.to_le_bytes());
    }

    pub fn decode(buf: &[u8]) -> Self {
        Self {
            centroid: read_vector(&buf[..VECTOR_BYTES]),
            count: read_u64(&buf[VECTOR_BYTES..HEADER_LINE_SIZE]),
        }
    }
}

/// Read `count` consecutive entries starting at byte `offset`.
///
/// A short read is reported as `CorruptIndex` with the offset of the slab.
pub fn read_entries<R: Read + Seek>(
    reader: &mut R,
    path: &str,
    offset: u64,
    count: u64,
) -> StorageResult<Vec<Entry>> {
    let slab = read_slab(reader, path, offset, count)?;
    Ok(slab.chunks_exact(ENTRY_SIZE).map(Entry::decode).collect())
}

/// Read the raw bytes of `count` entries starting at `offset`.
pub fn read_slab<R: Read + Seek>(
    reader: &mut R,
    path: &str,
    offset: u64,
    count: u64,
) -> StorageResult<Vec<u8>> {
    let len = usize::try_from(count)
        .ok()
        .and_then(|c| c.checked_mul(ENTRY_SIZE))
        .ok_or_else(|| StorageError::corrupt(path, offset, format!("bucket of {count} entries")))?;
    reader
        .seek(SeekFrom::Start(offset))
        .map_err(|e| StorageError::io(path, offset, e))?;
    let mut slab = vec![0u8; len];
    reader
        .read_exact(&mut slab)
        .map_err(|e| StorageError::io(path, offset, e))?;
    Ok(slab)
}

fn write_vector(v: &FeatureVector, buf: &mut [u8]) {
    for (chunk, x) in buf.chunks_exact_mut(4).zip(v.iter()) {
        chunk.copy_from_slice(&x.to_le_bytes());
    }
}

fn read_vector(buf: &[u8]) -> FeatureVector {
    let mut v = zero_vector();
    for (x, c) in v.iter_mut().zip(buf.chunks_exact(4)) {
        *x = f32::from_le_bytes([c[0], c[1], c[2], c[3]]);
    }
    v
}

fn read_u64(buf: &[u8]) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[..8]);
    u64::from_le_bytes(bytes)
}
