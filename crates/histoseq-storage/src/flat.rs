//! Exact brute-force store.
//!
//! Every corpus position is kept as one [`Entry`] with no buckets and no
//! header; the file is a bare sequence of `ENTRY_SIZE` records in position
//! order. Queries score every entry, in parallel with rayon.

use std::fs;
use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use histoseq_core::config::MixerConfig;
use histoseq_core::similarity::cosine_similarity;
use histoseq_core::types::{sort_candidates, Candidate, FeatureVector};
use histoseq_core::{ContextMixer, FeatureExtractor};

use crate::builder::writer::PartialFile;
use crate::error::{StorageError, StorageResult};
use crate::format::{Entry, ENTRY_SIZE};

/// In-memory exhaustive index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatStore {
    entries: Vec<Entry>,
}

impl FlatStore {
    pub fn from_entries(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    /// One entry per corpus position, after a leading sentinel.
    ///
    /// The mixer walk is sequential; the attention step runs in parallel.
    #[tracing::instrument(skip(corpus, mixer_config), fields(corpus_len = corpus.len(), mode = extractor.mode().as_str()))]
    pub fn build(corpus: &[u8], extractor: &FeatureExtractor, mixer_config: &MixerConfig) -> Self {
        let started = Instant::now();
        let mut mixer = ContextMixer::new(mixer_config);
        mixer.add(0);
        let matrices: Vec<_> = corpus
            .iter()
            .map(|&symbol| {
                let matrix = mixer.feature_matrix();
                mixer.add(symbol);
                matrix
            })
            .collect();

        let entries: Vec<Entry> = matrices
            .par_iter()
            .zip(corpus.par_iter())
            .enumerate()
            .map(|(position, (matrix, &symbol))| Entry {
                vector: extractor.extract_matrix(matrix),
                symbol,
                position: position as u64,
            })
            .collect();
        info!(
            entries = entries.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "flat store built"
        );
        Self { entries }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Write all entries in position order through `<path>.partial`,
    /// renamed into place once synced.
    pub fn persist(&self, path: &Path) -> StorageResult<()> {
        let mut out = PartialFile::create(path)?;
        let mut record = vec![0u8; ENTRY_SIZE];
        for entry in &self.entries {
            entry.encode_into(&mut record);
            out.write_record(&record)?;
        }
        let bytes = out.commit()?;
        debug!(path = %path.display(), bytes, "flat store persisted");
        Ok(())
    }

    /// Read a whole flat file into memory.
    ///
    /// # Errors
    ///
    /// `CorruptIndex` if the length is not a multiple of `ENTRY_SIZE`.
    pub fn load(path: &Path) -> StorageResult<Self> {
        let display = path.display().to_string();
        let bytes = fs::read(path).map_err(|e| StorageError::io(&display, 0, e))?;
        let whole = bytes.len() - bytes.len() % ENTRY_SIZE;
        if whole != bytes.len() {
            return Err(StorageError::corrupt(
                &display,
                whole as u64,
                format!("{} trailing bytes after last entry", bytes.len() - whole),
            ));
        }
        let entries = bytes.chunks_exact(ENTRY_SIZE).map(Entry::decode).collect();
        Ok(Self { entries })
    }

    /// Top `k` entries by cosine similarity, best first.
    pub fn nearest(&self, query: &FeatureVector, k: usize) -> Vec<Candidate> {
        let mut scored: Vec<Candidate> = self
            .entries
            .par_iter()
            .map(|e| e.to_candidate(cosine_similarity(query, &e.vector)))
            .collect();
        sort_candidates(&mut scored);
        scored.truncate(k);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use histoseq_core::FeatureMode;
    use tempfile::TempDir;

    fn store(corpus: &[u8]) -> FlatStore {
        FlatStore::build(
            corpus,
            &FeatureExtractor::new(FeatureMode::Entropy),
            &MixerConfig::default(),
        )
    }

    #[test]
    fn test_build_one_entry_per_position() {
        let s = store(b"hello");
        assert_eq!(s.len(), 5);
        for (i, e) in s.entries().iter().enumerate() {
            assert_eq!(e.position, i as u64);
            assert_eq!(e.symbol, b"hello"[i]);
        }
    }

    #[test]
    fn test_nearest_finds_exact_vector() {
        let s = store(b"abcdefgabcdefg");
        let query = s.entries()[9].vector;
        let top = s.nearest(&query, 3);
        assert_eq!(top.len(), 3);
        assert!((top[0].similarity - 1.0).abs() < 1e-5);
        for pair in top.windows(2) {
            assert!(pair[0].rank_cmp(&pair[1]).is_le());
        }
    }

    #[test]
    fn test_persist_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flat.bin");
        let s = store(b"round trip");
        s.persist(&path).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), (10 * ENTRY_SIZE) as u64);
        assert_eq!(FlatStore::load(&path).unwrap(), s);
    }

    #[test]
    fn test_persist_replaces_target_via_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("flat.bin");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, vec![0u8; 7]).unwrap();

        let s = store(b"abc");
        s.persist(&path).unwrap();

        assert!(!crate::builder::writer::partial_path(&path).exists());
        assert_eq!(FlatStore::load(&path).unwrap(), s);
        println!("[VERIFIED] persist swaps in a complete file and leaves no .partial");
    }

    #[test]
    fn test_partial_record_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flat.bin");
        fs::write(&path, vec![0u8; ENTRY_SIZE + 10]).unwrap();
        let err = FlatStore::load(&path).unwrap_err();
        assert!(err.is_corruption());
    }
}
