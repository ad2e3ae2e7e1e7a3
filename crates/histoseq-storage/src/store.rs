//! Loaded index header.
//!
//! [`VectorIndex::load`] reads only the header lines into memory and derives
//! a prefix sum over bucket counts, giving O(1) access to any bucket's body
//! segment. The body stays on disk and is read by seek + read.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info};

use histoseq_core::types::FeatureVector;
use histoseq_core::CoreError;

use crate::error::{StorageError, StorageResult};
use crate::format::{self, body_offset, Entry, HeaderLine, ENTRY_SIZE, HEADER_LINE_SIZE};

/// Location of one bucket's entries inside the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub bucket: usize,
    /// Absolute byte offset of the first entry.
    pub offset: u64,
    /// Number of entries.
    pub count: u64,
}

impl Segment {
    #[inline]
    pub fn byte_len(&self) -> u64 {
        self.count * ENTRY_SIZE as u64
    }
}

/// Header of a persisted index: centroids, counts and prefix sums.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    path: PathBuf,
    centroids: Vec<FeatureVector>,
    counts: Vec<u64>,
    /// `prefix[i]` = entries in buckets `0..i`; one longer than `counts`.
    prefix: Vec<u64>,
    body: u64,
}

impl VectorIndex {
    /// Load the header of an index built with `bucket_count` buckets.
    ///
    /// # Errors
    ///
    /// - `Io` if the file cannot be opened or read
    /// - `CorruptIndex` if the file is shorter than the header, or its
    ///   length disagrees with `header + Σ count × ENTRY_SIZE`
    #[tracing::instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>, bucket_count: usize) -> StorageResult<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        if bucket_count == 0 {
            return Err(CoreError::invalid_input("bucket_count", "must be greater than 0").into());
        }
        let started = Instant::now();

        let mut file = File::open(path).map_err(|e| StorageError::io(&display, 0, e))?;
        let file_len = file
            .metadata()
            .map_err(|e| StorageError::io(&display, 0, e))?
            .len();
        let header_len = body_offset(bucket_count).ok_or_else(|| {
            StorageError::from(CoreError::invalid_input(
                "bucket_count",
                format!("{bucket_count} header lines overflow a file offset"),
            ))
        })?;
        if file_len < header_len {
            return Err(StorageError::corrupt(
                &display,
                file_len,
                format!("file ends inside header of {bucket_count} buckets ({header_len} bytes)"),
            ));
        }

        let mut header = vec![0u8; bucket_count * HEADER_LINE_SIZE];
        file.read_exact(&mut header)
            .map_err(|e| StorageError::io(&display, 0, e))?;

        let mut centroids = Vec::with_capacity(bucket_count);
        let mut counts = Vec::with_capacity(bucket_count);
        let mut prefix = Vec::with_capacity(bucket_count + 1);
        let mut total = 0u64;
        prefix.push(0);
        for (bucket, raw) in header.chunks_exact(HEADER_LINE_SIZE).enumerate() {
            let line = HeaderLine::decode(raw);
            total = total.checked_add(line.count).ok_or_else(|| {
                StorageError::corrupt(
                    &display,
                    (bucket * HEADER_LINE_SIZE) as u64,
                    "bucket counts overflow",
                )
            })?;
            centroids.push(line.centroid);
            counts.push(line.count);
            prefix.push(total);
        }

        let expected = total
            .checked_mul(ENTRY_SIZE as u64)
            .and_then(|body| body.checked_add(header_len))
            .ok_or_else(|| StorageError::corrupt(&display, header_len, "body size overflows"))?;
        if expected != file_len {
            return Err(StorageError::corrupt(
                &display,
                file_len.min(expected),
                format!("expected {expected} bytes for {total} entries, file has {file_len}"),
            ));
        }

        let index = Self {
            path: path.to_path_buf(),
            centroids,
            counts,
            prefix,
            body: header_len,
        };
        info!(
            buckets = bucket_count,
            entries = total,
            non_empty_buckets = index.non_empty_buckets(),
            latency_us = started.elapsed().as_micros() as u64,
            "index header loaded"
        );
        Ok(index)
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn centroids(&self) -> &[FeatureVector] {
        &self.centroids
    }

    #[inline]
    pub fn centroid(&self, bucket: usize) -> &FeatureVector {
        &self.centroids[bucket]
    }

    #[inline]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    #[inline]
    pub fn count(&self, bucket: usize) -> u64 {
        self.counts[bucket]
    }

    /// Prefix sums over counts, `bucket_count + 1` long.
    #[inline]
    pub fn prefix_sums(&self) -> &[u64] {
        &self.prefix
    }

    /// Total entries in the body.
    #[inline]
    pub fn total_entries(&self) -> u64 {
        self.prefix[self.counts.len()]
    }

    pub fn non_empty_buckets(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    /// Body segment of `bucket`.
    #[inline]
    pub fn segment(&self, bucket: usize) -> Segment {
        Segment {
            bucket,
            offset: self.body + self.prefix[bucket] * ENTRY_SIZE as u64,
            count: self.counts[bucket],
        }
    }

    /// Read every entry of `bucket` through a fresh file handle.
    pub fn read_bucket(&self, bucket: usize) -> StorageResult<Vec<Entry>> {
        let display = self.path.display().to_string();
        let segment = self.segment(bucket);
        let mut file = File::open(&self.path).map_err(|e| StorageError::io(&display, 0, e))?;
        debug!(bucket, offset = segment.offset, count = segment.count, "reading bucket");
        format::read_entries(&mut file, &display, segment.offset, segment.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use histoseq_core::zero_vector;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_header(file: &mut NamedTempFile, counts: &[u64]) {
        let mut buf = vec![0u8; HEADER_LINE_SIZE];
        for (i, &count) in counts.iter().enumerate() {
            let mut centroid = zero_vector();
            centroid[i] = 1.0;
            HeaderLine { centroid, count }.encode_into(&mut buf);
            file.write_all(&buf).unwrap();
        }
    }

    fn write_entries(file: &mut NamedTempFile, n: u64) {
        let mut buf = vec![0u8; ENTRY_SIZE];
        for position in 0..n {
            Entry {
                vector: zero_vector(),
                symbol: b'e',
                position,
            }
            .encode_into(&mut buf);
            file.write_all(&buf).unwrap();
        }
    }

    #[test]
    fn test_prefix_sums_and_segments() {
        let mut file = NamedTempFile::new().unwrap();
        write_header(&mut file, &[2, 0, 3]);
        write_entries(&mut file, 5);
        file.flush().unwrap();

        let index = VectorIndex::load(file.path(), 3).unwrap();
        assert_eq!(index.prefix_sums(), &[0, 2, 2, 5]);
        assert_eq!(index.total_entries(), 5);
        assert_eq!(index.non_empty_buckets(), 2);

        let body = 3 * HEADER_LINE_SIZE as u64;
        assert_eq!(index.segment(0).offset, body);
        assert_eq!(index.segment(2).offset, body + 2 * ENTRY_SIZE as u64);
        assert_eq!(index.segment(2).byte_len(), 3 * ENTRY_SIZE as u64);

        let third = index.read_bucket(2).unwrap();
        let positions: Vec<u64> = third.iter().map(|e| e.position).collect();
        assert_eq!(positions, vec![2, 3, 4]);
        assert!(index.read_bucket(1).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_body_is_corrupt() {
        let mut file = NamedTempFile::new().unwrap();
        write_header(&mut file, &[4]);
        write_entries(&mut file, 3);
        file.flush().unwrap();

        let err = VectorIndex::load(file.path(), 1).unwrap_err();
        assert!(err.is_corruption(), "got {err:?}");
    }

    #[test]
    fn test_trailing_bytes_are_corrupt() {
        let mut file = NamedTempFile::new().unwrap();
        write_header(&mut file, &[1]);
        write_entries(&mut file, 1);
        file.write_all(&[0u8; 3]).unwrap();
        file.flush().unwrap();

        assert!(VectorIndex::load(file.path(), 1).unwrap_err().is_corruption());
    }

    #[test]
    fn test_file_shorter_than_header() {
        let mut file = NamedTempFile::new().unwrap();
        write_header(&mut file, &[0, 0]);
        file.flush().unwrap();

        // read with the wrong bucket count
        assert!(VectorIndex::load(file.path(), 3).unwrap_err().is_corruption());
    }

    #[test]
    fn test_overflowing_bucket_count_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write_header(&mut file, &[0]);
        file.flush().unwrap();

        let err = VectorIndex::load(file.path(), usize::MAX).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Core(CoreError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = VectorIndex::load("/nonexistent/histoseq.idx", 1).unwrap_err();
        assert!(matches!(err, StorageError::Io { offset: 0, .. }));
    }
}
