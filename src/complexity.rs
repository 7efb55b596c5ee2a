//! Sequence complexity of a microstate labelling.
//!
//! - LZW code count of the per-sample labels and of the run-collapsed
//!   labels (one symbol per run).  Classic adaptive LZW: the dictionary
//!   starts with all 256 single bytes and grows by one entry per emitted
//!   code.
//! - k-mer tables: labels become letters (`0 → A`, `1 → B`, …), every
//!   contiguous substring of length `k` is counted, and substrings are
//!   grouped into classes of anagrams.  Each substring also carries its
//!   expected count under a memoryless source with the observed letter
//!   frequencies, so over- or under-represented orderings stand out within
//!   a class.
use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::config::KMER_BOUNDS;
use crate::error::{MicrostateError, Result};
use crate::runs::{run_labels, run_length_encode};

/// Largest label that still fits the one-byte LZW alphabet.
pub const MAX_LABEL: usize = u8::MAX as usize;

/// Number of codes emitted by LZW compression of `symbols`.
pub fn lzw_code_count(symbols: &[u8]) -> usize {
    let mut dict: HashMap<Vec<u8>, usize> = (0..=u8::MAX).map(|b| (vec![b], b as usize)).collect();
    let mut w: Vec<u8> = Vec::new();
    let mut codes = 0;
    for &c in symbols {
        w.push(c);
        if dict.contains_key(&w) {
            continue;
        }
        codes += 1;
        let code = dict.len();
        dict.insert(w.clone(), code);
        w.clear();
        w.push(c);
    }
    if !w.is_empty() {
        codes += 1;
    }
    codes
}

/// Letter used for `label` in k-mer strings.
pub fn label_letter(label: usize) -> char {
    char::from_u32(u32::from(b'A') + label as u32).unwrap_or('?')
}

/// Class key of a k-mer: its letters in sorted order.
pub fn equivalence_key(kmer: &str) -> String {
    let mut letters: Vec<char> = kmer.chars().collect();
    letters.sort_unstable();
    letters.into_iter().collect()
}

/// Observed and expected count of one k-mer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KmerCount {
    pub kmer: String,
    pub observed: usize,
    /// Expected count under an i.i.d. source with the observed letter frequencies.
    pub expected: f64,
}

/// All observed k-mers that are anagrams of each other.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KmerClass {
    /// Sorted letters shared by every member.
    pub key: String,
    pub observed: usize,
    pub members: Vec<KmerCount>,
}

/// k-mer counts for one length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KmerTable {
    pub k: usize,
    /// Number of length-`k` windows in the sequence.
    pub windows: usize,
    pub classes: Vec<KmerClass>,
}

impl KmerTable {
    /// Observed count of `kmer`, 0 if it never occurs.
    pub fn count(&self, kmer: &str) -> usize {
        self.find(kmer).map_or(0, |c| c.observed)
    }

    pub fn find(&self, kmer: &str) -> Option<&KmerCount> {
        let key = equivalence_key(kmer);
        self.classes
            .iter()
            .find(|c| c.key == key)
            .and_then(|c| c.members.iter().find(|m| m.kmer == kmer))
    }

    /// Class holding `kmer`, if it was observed.
    pub fn class_of(&self, kmer: &str) -> Option<&KmerClass> {
        let key = equivalence_key(kmer);
        self.classes
            .iter()
            .find(|c| c.key == key && c.members.iter().any(|m| m.kmer == kmer))
    }
}

/// Count every length-`k` substring of `letters`.
pub fn kmer_table(letters: &[char], k: usize) -> KmerTable {
    let windows = if k == 0 || letters.len() < k { 0 } else { letters.len() - k + 1 };

    let mut freq: HashMap<char, usize> = HashMap::new();
    for &c in letters {
        *freq.entry(c).or_default() += 1;
    }
    let n = letters.len() as f64;

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    if windows > 0 {
        for w in letters.windows(k) {
            *counts.entry(w.iter().collect()).or_default() += 1;
        }
    }

    let mut classes: BTreeMap<String, KmerClass> = BTreeMap::new();
    for (kmer, observed) in counts {
        let p: f64 = kmer.chars().map(|c| freq[&c] as f64 / n).product();
        let key = equivalence_key(&kmer);
        let class = classes.entry(key.clone()).or_insert_with(|| KmerClass {
            key,
            observed: 0,
            members: Vec::new(),
        });
        class.observed += observed;
        class.members.push(KmerCount { kmer, observed, expected: windows as f64 * p });
    }

    KmerTable { k, windows, classes: classes.into_values().collect() }
}

/// Complexity measures of one labelling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplexityBundle {
    /// LZW codes for the per-sample label sequence.
    pub lzw_points: usize,
    /// LZW codes for the run-collapsed label sequence.
    pub lzw_runs: usize,
    /// One table per k in `k_min..=k_max`.
    pub kmers: Vec<KmerTable>,
}

/// LZW and k-mer analysis of `labels` for k-mer lengths `k_min..=k_max`
/// (clamped to [2, 10]).
pub fn analyze_complexity(labels: &[usize], k_min: usize, k_max: usize) -> Result<ComplexityBundle> {
    let symbols = labels
        .iter()
        .map(|&l| u8::try_from(l))
        .collect::<std::result::Result<Vec<u8>, _>>()
        .map_err(|_| MicrostateError::LabelOutOfRange {
            label: labels.iter().copied().max().unwrap_or(0),
            n_states: MAX_LABEL + 1,
        })?;
    let run_symbols: Vec<u8> = run_labels(&run_length_encode(labels))
        .into_iter()
        .map(|l| l as u8)
        .collect();

    let (lo, hi) = KMER_BOUNDS;
    let (k_min, k_max) = (k_min.clamp(lo, hi), k_max.clamp(lo, hi));
    let letters: Vec<char> = labels.iter().map(|&l| label_letter(l)).collect();
    let kmers: Vec<KmerTable> = (k_min..=k_max).map(|k| kmer_table(&letters, k)).collect();

    let bundle = ComplexityBundle {
        lzw_points: lzw_code_count(&symbols),
        lzw_runs: lzw_code_count(&run_symbols),
        kmers,
    };
    debug!(lzw_points = bundle.lzw_points, lzw_runs = bundle.lzw_runs, "complexity computed");
    Ok(bundle)
}
