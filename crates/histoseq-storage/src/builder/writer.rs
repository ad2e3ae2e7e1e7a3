//! Index file writer.
//!
//! Writes to `<path>.partial` and renames into place once the body is
//! flushed, so a reader never observes a half-written index.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use histoseq_core::types::FeatureVector;

use crate::error::{StorageError, StorageResult};
use crate::format::{HeaderLine, ENTRY_SIZE, HEADER_LINE_SIZE};

use super::arena::MembershipArena;

pub(crate) fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".partial");
    PathBuf::from(name)
}

/// Buffered writer onto `<path>.partial`, committed by a rename.
pub(crate) struct PartialFile {
    out: BufWriter<File>,
    tmp: PathBuf,
    target: PathBuf,
    display: String,
    offset: u64,
}

impl PartialFile {
    /// Create parent directories and open `<path>.partial` for writing.
    pub(crate) fn create(path: &Path) -> StorageResult<Self> {
        let display = path.display().to_string();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(&display, 0, e))?;
        }
        let tmp = partial_path(path);
        let file = File::create(&tmp).map_err(|e| StorageError::io(&display, 0, e))?;
        Ok(Self {
            out: BufWriter::new(file),
            tmp,
            target: path.to_path_buf(),
            display,
            offset: 0,
        })
    }

    pub(crate) fn write_record(&mut self, record: &[u8]) -> StorageResult<()> {
        self.out
            .write_all(record)
            .map_err(|e| StorageError::io(&self.display, self.offset, e))?;
        self.offset += record.len() as u64;
        Ok(())
    }

    /// Flush, `sync_all`, and rename onto the target. Returns bytes written.
    pub(crate) fn commit(self) -> StorageResult<u64> {
        let Self {
            out,
            tmp,
            target,
            display,
            offset,
        } = self;
        let file = out
            .into_inner()
            .map_err(|e| StorageError::io(&display, offset, e.into_error()))?;
        file.sync_all()
            .map_err(|e| StorageError::io(&display, offset, e))?;
        drop(file);
        fs::rename(&tmp, &target).map_err(|e| StorageError::io(&display, offset, e))?;
        Ok(offset)
    }
}

/// Serialize header and body. Returns the number of bytes written.
pub(crate) fn write_index(
    path: &Path,
    centroids: &[FeatureVector],
    arena: &MembershipArena,
) -> StorageResult<u64> {
    let mut out = PartialFile::create(path)?;

    let mut line = vec![0u8; HEADER_LINE_SIZE];
    for (bucket, centroid) in centroids.iter().enumerate() {
        HeaderLine {
            centroid: *centroid,
            count: arena.counts()[bucket],
        }
        .encode_into(&mut line);
        out.write_record(&line)?;
    }

    let mut record = vec![0u8; ENTRY_SIZE];
    for bucket in 0..centroids.len() {
        for entry in arena.members(bucket) {
            entry.encode_into(&mut record);
            out.write_record(&record)?;
        }
    }
    out.commit()
}
