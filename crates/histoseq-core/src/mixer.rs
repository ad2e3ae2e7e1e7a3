//! Multi-scale context mixer.
//!
//! A [`ContextMixer`] owns a bank of [`Histogram`]s at geometric window
//! capacities (1, 2, 4, ..., 128 by default) plus a short Markov context of
//! the most recent symbols, most-recent-first.
//!
//! # Variants
//!
//! | Variant          | Banks | `add(s)` updates                     | Features read from          |
//! |------------------|-------|--------------------------------------|-----------------------------|
//! | `Flat`           | 1     | every histogram                      | the single bank             |
//! | `PreviousSymbol` | 257   | the previous symbol's bank + aggregate | the last symbol's bank    |
//!
//! In the previous-symbol variant, bank `p` accumulates the symbols that
//! followed `p`, so reading bank `markov[0]` describes what tends to follow
//! the current context. An extra aggregate bank sees every symbol; it is read
//! instead while bank `markov[0]` is still empty, which happens whenever the
//! last symbol has not been seen as a predecessor yet.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::MixerConfig;
use crate::features::FeatureMatrix;
use crate::histogram::Histogram;
use crate::ALPHABET_SIZE;

/// Index of the previous-symbol variant's aggregate bank.
const AGGREGATE_BANK: usize = ALPHABET_SIZE;

/// Which histogram bank layout the mixer uses.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MixerVariant {
    /// One bank shared by every context.
    #[default]
    Flat,
    /// One bank per previous-symbol value (first-order context).
    PreviousSymbol,
}

/// Bundle of histograms at multiple window scales plus recent-symbol history.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextMixer {
    variant: MixerVariant,
    markov: Vec<u8>,
    banks: Vec<Vec<Histogram>>,
}

impl ContextMixer {
    /// Create an empty mixer from configuration.
    pub fn new(config: &MixerConfig) -> Self {
        let bank: Vec<Histogram> = config.scales.iter().map(|&s| Histogram::new(s)).collect();
        let bank_count = match config.variant {
            MixerVariant::Flat => 1,
            MixerVariant::PreviousSymbol => ALPHABET_SIZE + 1,
        };
        Self {
            variant: config.variant,
            markov: vec![0; config.order + 1],
            banks: vec![bank; bank_count],
        }
    }

    #[inline]
    pub fn variant(&self) -> MixerVariant {
        self.variant
    }

    /// Recent symbols, most recent first.
    #[inline]
    pub fn markov(&self) -> &[u8] {
        &self.markov
    }

    /// Number of histograms per bank, i.e. feature matrix rows.
    #[inline]
    pub fn scales(&self) -> usize {
        self.banks[0].len()
    }

    /// Histograms whose state describes the current context.
    pub fn active_bank(&self) -> &[Histogram] {
        match self.variant {
            MixerVariant::Flat => &self.banks[0],
            MixerVariant::PreviousSymbol => {
                let bank = &self.banks[self.markov[0] as usize];
                if bank.iter().all(Histogram::is_empty) {
                    &self.banks[AGGREGATE_BANK]
                } else {
                    bank
                }
            }
        }
    }

    /// Absorb one symbol: update the histograms, then shift the Markov context.
    pub fn add(&mut self, symbol: u8) {
        let bank = match self.variant {
            MixerVariant::Flat => &mut self.banks[0],
            MixerVariant::PreviousSymbol => {
                for histogram in self.banks[AGGREGATE_BANK].iter_mut() {
                    histogram.add(symbol);
                }
                &mut self.banks[self.markov[0] as usize]
            }
        };
        for histogram in bank.iter_mut() {
            histogram.add(symbol);
        }
        self.markov.rotate_right(1);
        self.markov[0] = symbol;
    }

    /// Feed every symbol of `bytes` in order.
    pub fn prime(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.add(b);
        }
    }

    /// Pad every bank with a sentinel `0` without shifting the Markov context.
    pub fn zero(&mut self) {
        for bank in self.banks.iter_mut() {
            for histogram in bank.iter_mut() {
                histogram.add(0);
            }
        }
    }

    /// Normalized frequency rows of the active bank.
    ///
    /// An empty histogram contributes an all-zero row.
    pub fn feature_matrix(&self) -> FeatureMatrix {
        let bank = self.active_bank();
        let mut matrix = FeatureMatrix::zeros(bank.len());
        for (i, histogram) in bank.iter().enumerate() {
            if !histogram.normalize_into(matrix.row_mut(i)) {
                trace!(row = i, capacity = histogram.capacity(), "degenerate histogram row");
            }
        }
        matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat() -> ContextMixer {
        ContextMixer::new(&MixerConfig::default())
    }

    fn previous_symbol() -> ContextMixer {
        ContextMixer::new(&MixerConfig {
            variant: MixerVariant::PreviousSymbol,
            ..MixerConfig::default()
        })
    }

    #[test]
    fn test_markov_shifts_most_recent_first() {
        let mut m = flat();
        m.prime(b"abc");
        assert_eq!(&m.markov()[..3], b"cba");
        assert_eq!(m.markov().len(), 8);
    }

    #[test]
    fn test_flat_bank_histograms_see_same_stream() {
        let mut m = flat();
        m.prime(b"abracadabra");
        let bank = m.active_bank();
        assert_eq!(bank.len(), 8);
        for h in bank {
            assert_eq!(h.total() as usize, 11usize.min(h.capacity()));
        }
        // the capacity-1 histogram only holds the last symbol
        assert_eq!(bank[0].counts()[b'a' as usize], 1);
        assert_eq!(bank[7].counts()[b'a' as usize], 5);
    }

    #[test]
    fn test_zero_pads_without_shifting_markov() {
        let mut m = flat();
        m.prime(b"xy");
        let before = m.markov().to_vec();
        m.zero();
        assert_eq!(m.markov(), &before[..]);
        assert_eq!(m.active_bank()[0].counts()[0], 1);
        assert_eq!(m.active_bank()[7].total(), 3);
    }

    #[test]
    fn test_previous_symbol_variant_routes_updates() {
        let mut m = previous_symbol();
        // initial previous symbol is 0, so 'a' lands in bank 0
        m.prime(b"ab");
        // now markov[0] == 'b'; bank 'b' has never been updated
        assert!(m.banks[b'b' as usize].iter().all(|h| h.is_empty()));

        m.prime(b"ab");
        // "abab": bank 'b' received the second 'a'
        assert_eq!(m.markov()[0], b'b');
        let bank_a = &m.banks[b'a' as usize];
        assert_eq!(bank_a[7].counts()[b'b' as usize], 2);
    }

    #[test]
    fn test_previous_symbol_falls_back_to_aggregate_bank() {
        let mut m = previous_symbol();
        m.prime(b"ab");
        // bank 'b' is empty, so features come from the aggregate of "ab"
        let bank = m.active_bank();
        assert_eq!(bank[0].counts()[b'b' as usize], 1);
        assert_eq!(bank[7].counts()[b'a' as usize], 1);
        assert_eq!(bank[7].total(), 2);
        assert!(!m.feature_matrix().is_zero());

        // once 'b' has a successor the bank itself is read again
        m.prime(b"cab");
        let bank = m.active_bank();
        assert_eq!(bank[7].total(), 1);
        assert_eq!(bank[7].counts()[b'c' as usize], 1);
    }

    #[test]
    fn test_previous_symbol_zero_touches_every_bank() {
        let mut m = previous_symbol();
        m.zero();
        assert!(m
            .banks
            .iter()
            .all(|bank| bank.iter().all(|h| h.counts()[0] == 1)));
    }

    #[test]
    fn test_feature_matrix_rows_are_distributions() {
        let mut m = flat();
        m.prime(b"hello world");
        let matrix = m.feature_matrix();
        assert_eq!(matrix.rows(), 8);
        for row in matrix.iter_rows() {
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_feature_matrix_of_fresh_mixer_is_zero() {
        let m = flat();
        assert!(m.feature_matrix().is_zero());
    }
}
