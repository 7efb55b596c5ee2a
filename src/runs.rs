//! Run-length encoding of label sequences.
//!
//! `[0, 0, 1, 1, 1, 0]` → `[(0, 2), (1, 3), (0, 1)]`
//!
//! Lengths always sum to the sequence length and adjacent runs never share
//! a label.
use serde::Serialize;

/// A maximal stretch of identical labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Run {
    pub label: usize,
    /// First sample of the run.
    pub start: usize,
    pub len: usize,
}

impl Run {
    /// One past the last sample.
    #[inline]
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

pub fn run_length_encode(labels: &[usize]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for (j, &label) in labels.iter().enumerate() {
        match runs.last_mut() {
            Some(run) if run.label == label => run.len += 1,
            _ => runs.push(Run { label, start: j, len: 1 }),
        }
    }
    runs
}

/// Inverse of [`run_length_encode`].
pub fn expand_runs(runs: &[Run]) -> Vec<usize> {
    runs.iter()
        .flat_map(|r| std::iter::repeat(r.label).take(r.len))
        .collect()
}

/// Labels of the runs only, one symbol per run.
pub fn run_labels(runs: &[Run]) -> Vec<usize> {
    runs.iter().map(|r| r.label).collect()
}
