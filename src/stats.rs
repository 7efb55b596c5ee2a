//! Per-state summary statistics and the transition matrix.
//!
//! For each state `k`, over the final label sequence of the `N` observed
//! samples:
//!
//! ```text
//! mean_gfp[k]   = mean GFP (ddof = 1) of samples labelled k
//! occurrence[k] = (# runs labelled k) / (N / sfreq)            [1/s]
//! duration[k]   = mean run length · 1000 / sfreq               [ms]
//! coverage[k]   = occurrence[k] · duration[k] / 1000           [fraction]
//! spatcorr(k,j) = 1 − GMD(k, j)² / 2
//! gev[k]        = Σ_{j∈k} (spatcorr(k,j) · gfp[j])²  /  Σ_j gfp[j]²
//! ```
//!
//! `gev_total` is computed separately from the spatial correlation of each
//! sample with its assigned prototype and the raw per-sample variance; it
//! equals `Σ_k gev[k]` up to rounding.
//!
//! Mean-based metrics of a state with no samples are `None`.  Samples whose
//! map is degenerate (zero GFP) are not observations: they have no label,
//! so they count towards no state, run, transition or time base.
use ndarray::{Array2, ArrayView2};
use serde::Serialize;
use tracing::warn;

use crate::backfit::Backfit;
use crate::error::{MicrostateError, Result};
use crate::maps::{gfp, gfp_sample};
use crate::runs::{run_length_encode, Run};

/// Statistics for one state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateStats {
    pub state: usize,
    /// Samples labelled with this state.
    pub n_samples: usize,
    /// Runs labelled with this state.
    pub n_runs: usize,
    pub mean_gfp: Option<f64>,
    /// Runs per second.
    pub occurrence: f64,
    /// Mean run duration in milliseconds.
    pub duration_ms: Option<f64>,
    /// Fraction of recording time.
    pub coverage: Option<f64>,
    pub gev: f64,
    pub spatial_correlation: Option<f64>,
}

/// Everything the statistics engine computes for one recording.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsBundle {
    pub states: Vec<StateStats>,
    pub gev_total: f64,
    /// Run-to-run transition counts, `[from][to]`.
    pub transition_counts: Vec<Vec<usize>>,
    /// Row-normalised transition probabilities; zero diagonal.
    pub transitions: Vec<Vec<f64>>,
    /// States that received no samples.
    pub empty_states: Vec<usize>,
}

fn mean(sum: f64, n: usize) -> Option<f64> {
    (n > 0).then(|| sum / n as f64)
}

/// Count `a → b` transitions between consecutive runs.
pub fn transition_counts(runs: &[Run], n_states: usize) -> Array2<usize> {
    let mut counts = Array2::<usize>::zeros((n_states, n_states));
    for w in runs.windows(2) {
        if w[0].label != w[1].label {
            counts[[w[0].label, w[1].label]] += 1;
        }
    }
    counts
}

/// Row-normalise transition counts.  Rows with no outgoing transitions stay 0.
pub fn transition_matrix(counts: &Array2<usize>) -> Array2<f64> {
    let mut p = counts.mapv(|c| c as f64);
    for (i, mut row) in p.rows_mut().into_iter().enumerate() {
        row[i] = 0.0;
        let total = row.sum();
        if total > 0.0 {
            row /= total;
        }
    }
    p
}

/// Independent GEV of the whole labelling.
///
/// `r(j)` is the dot product of the normalised sample and its assigned
/// normalised prototype over `C`; each sample contributes `r² · var(j)`.
fn total_gev(samples: ArrayView2<f64>, fit: &Backfit, labels: &[usize]) -> f64 {
    let n_ch = samples.ncols() as f64;
    let mut explained = 0.0;
    let mut total = 0.0;
    for (&j, &k) in fit.observed.iter().zip(labels) {
        let row = samples.row(j);
        let m = row.sum() / n_ch;
        let var = row.iter().map(|&v| (v - m) * (v - m)).sum::<f64>() / n_ch;
        let r = fit.samples_z.row(j).dot(&fit.prototypes_z.column(k)) / n_ch;
        if !r.is_finite() {
            continue;
        }
        explained += r * r * var;
        total += var;
    }
    if total > 0.0 { explained / total } else { 0.0 }
}

/// Compute per-state statistics for `labels`, one per observed sample of
/// `fit` (see [`Backfit::observed`]).
///
/// # Errors
///
/// * [`MicrostateError::Empty`] when no sample was observed.
/// * [`MicrostateError::DimensionMismatch`] when `labels` does not match the
///   observed samples, or `samples` does not match the fit.
/// * [`MicrostateError::LabelOutOfRange`] for a label that is not a state of
///   the fit.
pub fn compute_statistics(
    samples: ArrayView2<f64>,
    fit: &Backfit,
    labels: &[usize],
    sfreq: f64,
) -> Result<StatsBundle> {
    let n = labels.len();
    let n_states = fit.n_states();
    if samples.nrows() != fit.n_samples() {
        return Err(MicrostateError::DimensionMismatch {
            expected: fit.n_samples(),
            found: samples.nrows(),
        });
    }
    if n != fit.n_observed() {
        return Err(MicrostateError::DimensionMismatch {
            expected: fit.n_observed(),
            found: n,
        });
    }
    if n == 0 {
        return Err(MicrostateError::Empty("no sample with a non-flat map"));
    }
    if let Some(&label) = labels.iter().find(|&&k| k >= n_states) {
        return Err(MicrostateError::LabelOutOfRange { label, n_states });
    }

    // Per-sample sums.
    let mut n_samples = vec![0usize; n_states];
    let mut n_obs = vec![0usize; n_states];
    let mut gfp_sum = vec![0.0; n_states];
    let mut spc_sum = vec![0.0; n_states];
    let mut gev_num = vec![0.0; n_states];
    let mut gfp2_total = 0.0;

    for (&j, &k) in fit.observed.iter().zip(labels) {
        n_samples[k] += 1;
        let d = fit.gmd[[k, j]];
        if !d.is_finite() {
            continue;
        }
        let row = samples.row(j);
        let g = gfp(row);
        let spc = 1.0 - d * d / 2.0;
        n_obs[k] += 1;
        gfp_sum[k] += gfp_sample(row);
        spc_sum[k] += spc;
        gev_num[k] += (spc * g).powi(2);
        gfp2_total += g * g;
    }

    // Run-based metrics.
    let runs = run_length_encode(labels);
    let duration_s = n as f64 / sfreq;
    let ms_per_sample = 1000.0 / sfreq;
    let mut n_runs = vec![0usize; n_states];
    let mut run_samples = vec![0usize; n_states];
    for r in &runs {
        n_runs[r.label] += 1;
        run_samples[r.label] += r.len;
    }

    let states: Vec<StateStats> = (0..n_states)
        .map(|k| {
            let occurrence = n_runs[k] as f64 / duration_s;
            let duration_ms = mean(run_samples[k] as f64 * ms_per_sample, n_runs[k]);
            StateStats {
                state: k,
                n_samples: n_samples[k],
                n_runs: n_runs[k],
                mean_gfp: mean(gfp_sum[k], n_obs[k]),
                occurrence,
                duration_ms,
                coverage: duration_ms.map(|d| occurrence * d / 1000.0),
                gev: if gfp2_total > 0.0 { gev_num[k] / gfp2_total } else { 0.0 },
                spatial_correlation: mean(spc_sum[k], n_obs[k]),
            }
        })
        .collect();

    let empty_states: Vec<usize> = (0..n_states).filter(|&k| n_samples[k] == 0).collect();
    if !empty_states.is_empty() {
        warn!(?empty_states, "states with no assigned samples; their mean statistics are undefined");
    }

    let counts = transition_counts(&runs, n_states);
    let probs = transition_matrix(&counts);

    Ok(StatsBundle {
        states,
        gev_total: total_gev(samples, fit, labels),
        transition_counts: counts.rows().into_iter().map(|r| r.to_vec()).collect(),
        transitions: probs.rows().into_iter().map(|r| r.to_vec()).collect(),
        empty_states,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_rows_sum_to_one() {
        let runs = run_length_encode(&[0, 0, 1, 2, 2, 0, 1, 0, 2]);
        let counts = transition_counts(&runs, 3);
        assert_eq!(counts[[0, 1]], 2);
        assert_eq!(counts[[0, 2]], 1);
        let p = transition_matrix(&counts);
        for i in 0..3 {
            assert_eq!(p[[i, i]], 0.0);
            approx::assert_abs_diff_eq!(p.row(i).sum(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn row_without_outgoing_transitions_is_zero() {
        let runs = run_length_encode(&[0, 0, 1, 1]);
        let p = transition_matrix(&transition_counts(&runs, 3));
        assert_eq!(p.row(1).sum(), 0.0);
        assert_eq!(p.row(2).sum(), 0.0);
        assert_eq!(p[[0, 1]], 1.0);
    }
}
