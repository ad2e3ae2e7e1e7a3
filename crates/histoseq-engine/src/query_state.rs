//! Per-request generation state.
//!
//! A [`QueryState`] owns a live mixer primed with the request's query, the
//! window of recent query vectors used as diffusion context, and a
//! [`Utf8Assembler`] that holds back bytes until a code point is complete.

use std::collections::VecDeque;

use histoseq_core::config::MixerConfig;
use histoseq_core::types::FeatureVector;
use histoseq_core::{ContextMixer, FeatureExtractor};

/// One output unit: a complete code point, or a byte run that could not
/// form one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedUnit {
    pub bytes: Vec<u8>,
    /// Corpus position of the candidate that produced the first byte.
    pub position: u64,
}

impl GeneratedUnit {
    /// True if `bytes` is one well-formed UTF-8 scalar.
    pub fn is_complete(&self) -> bool {
        std::str::from_utf8(&self.bytes).map_or(false, |s| s.chars().count() == 1)
    }
}

/// Expected sequence length for a UTF-8 lead byte; `None` for continuation
/// bytes. Bytes that can never start a valid sequence count as length 1.
fn sequence_len(byte: u8) -> Option<usize> {
    match byte {
        0x00..=0x7F => Some(1),
        0x80..=0xBF => None,
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => Some(1),
    }
}

/// Groups emitted bytes into code points.
///
/// A pending sequence interrupted by a new lead byte or an ASCII byte is
/// flushed as an incomplete unit. A stray continuation byte is emitted on
/// its own.
#[derive(Debug, Clone, Default)]
pub struct Utf8Assembler {
    pending: Vec<u8>,
    expected: usize,
    position: u64,
}

impl Utf8Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes held back so far.
    #[inline]
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Feed one byte. Returns the units completed by it (zero, one, or two
    /// when an interrupted sequence is flushed first).
    pub fn push(&mut self, byte: u8, position: u64) -> Vec<GeneratedUnit> {
        let mut out = Vec::new();
        match sequence_len(byte) {
            None if !self.pending.is_empty() => {
                self.pending.push(byte);
                if self.pending.len() == self.expected {
                    out.push(self.take());
                }
            }
            None => out.push(GeneratedUnit {
                bytes: vec![byte],
                position,
            }),
            Some(len) => {
                if !self.pending.is_empty() {
                    out.push(self.take());
                }
                if len == 1 {
                    out.push(GeneratedUnit {
                        bytes: vec![byte],
                        position,
                    });
                } else {
                    self.pending.push(byte);
                    self.expected = len;
                    self.position = position;
                }
            }
        }
        out
    }

    fn take(&mut self) -> GeneratedUnit {
        self.expected = 0;
        GeneratedUnit {
            bytes: std::mem::take(&mut self.pending),
            position: self.position,
        }
    }
}

/// Live mixer, query-vector window and output assembler for one request.
#[derive(Debug, Clone)]
pub struct QueryState {
    mixer: ContextMixer,
    extractor: FeatureExtractor,
    current: FeatureVector,
    window: VecDeque<FeatureVector>,
    window_len: usize,
    assembler: Utf8Assembler,
}

impl QueryState {
    pub fn new(mixer_config: &MixerConfig, extractor: FeatureExtractor, window_len: usize) -> Self {
        let mixer = ContextMixer::new(mixer_config);
        let current = extractor.extract(&mixer);
        Self {
            mixer,
            extractor,
            current,
            window: VecDeque::with_capacity(window_len),
            window_len,
            assembler: Utf8Assembler::new(),
        }
    }

    /// Absorb the query bytes. Only the last `window_len` positions are
    /// embedded; earlier bytes just update the mixer.
    pub fn prime(&mut self, query: &[u8]) {
        let embed_from = query.len().saturating_sub(self.window_len);
        for (i, &byte) in query.iter().enumerate() {
            if i >= embed_from {
                self.absorb(byte);
            } else {
                self.mixer.add(byte);
            }
        }
    }

    /// Feed one byte into the mixer and record the resulting query vector.
    pub fn absorb(&mut self, byte: u8) {
        self.mixer.add(byte);
        self.current = self.extractor.extract(&self.mixer);
        if self.window.len() == self.window_len {
            self.window.pop_front();
        }
        self.window.push_back(self.current);
    }

    /// Absorb a generated byte and return any units it completes.
    pub fn emit(&mut self, byte: u8, position: u64) -> Vec<GeneratedUnit> {
        self.absorb(byte);
        self.assembler.push(byte, position)
    }

    /// Feature vector of the current mixer state.
    #[inline]
    pub fn current(&self) -> &FeatureVector {
        &self.current
    }

    /// Recent query vectors, oldest first.
    pub fn context(&mut self) -> &[FeatureVector] {
        self.window.make_contiguous()
    }

    #[inline]
    pub fn mixer(&self) -> &ContextMixer {
        &self.mixer
    }

    #[inline]
    pub fn pending(&self) -> &[u8] {
        self.assembler.pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use histoseq_core::FeatureMode;

    fn feed(assembler: &mut Utf8Assembler, bytes: &[u8]) -> Vec<GeneratedUnit> {
        bytes
            .iter()
            .enumerate()
            .flat_map(|(i, &b)| assembler.push(b, i as u64))
            .collect()
    }

    #[test]
    fn test_three_byte_code_point_held_until_complete() {
        let mut a = Utf8Assembler::new();
        let euro = "€".as_bytes();
        assert!(a.push(euro[0], 10).is_empty());
        assert!(a.push(euro[1], 11).is_empty());
        assert_eq!(a.pending(), &euro[..2]);
        let units = a.push(euro[2], 12);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].bytes, euro);
        assert_eq!(units[0].position, 10);
        assert!(units[0].is_complete());
        assert!(a.pending().is_empty());
    }

    #[test]
    fn test_mixed_text_reassembles() {
        let text = "añ€😀z";
        let mut a = Utf8Assembler::new();
        let units = feed(&mut a, text.as_bytes());
        let chars: Vec<String> = units
            .iter()
            .map(|u| String::from_utf8(u.bytes.clone()).unwrap())
            .collect();
        assert_eq!(chars, vec!["a", "ñ", "€", "😀", "z"]);
    }

    #[test]
    fn test_interrupted_sequence_is_flushed() {
        let mut a = Utf8Assembler::new();
        let units = feed(&mut a, &[0xE2, 0x82, b'x']);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].bytes, vec![0xE2, 0x82]);
        assert!(!units[0].is_complete());
        assert_eq!(units[1].bytes, vec![b'x']);
    }

    #[test]
    fn test_stray_continuation_and_invalid_lead() {
        let mut a = Utf8Assembler::new();
        let units = feed(&mut a, &[0x82, 0xFF, 0xC3, 0xE2]);
        assert_eq!(units[0].bytes, vec![0x82]);
        assert_eq!(units[1].bytes, vec![0xFF]);
        assert_eq!(units[2].bytes, vec![0xC3]);
        assert_eq!(units.len(), 3);
        assert_eq!(a.pending(), &[0xE2]);
    }

    #[test]
    fn test_query_window_keeps_most_recent() {
        let mut state = QueryState::new(
            &MixerConfig::default(),
            FeatureExtractor::new(FeatureMode::Entropy),
            3,
        );
        state.prime(b"abcdef");
        assert_eq!(state.context().len(), 3);
        assert_eq!(state.mixer().markov()[0], b'f');
        let last = *state.current();
        assert_eq!(state.context()[2], last);

        state.emit(b'g', 0);
        assert_eq!(state.context().len(), 3);
        let cur = *state.current();
        assert_eq!(state.context()[2], cur);
    }

    #[test]
    fn test_empty_query_has_zero_vector() {
        let state = QueryState::new(
            &MixerConfig::default(),
            FeatureExtractor::new(FeatureMode::Attention),
            8,
        );
        assert!(state.current().iter().all(|&x| x == 0.0));
    }
}
