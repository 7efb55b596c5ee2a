//! GFP peak extraction.
//!
//! Candidate maps for prototype fitting are taken at local maxima of the
//! global field power, where the topography is most stable and the
//! signal-to-noise ratio is highest.
//!
//! ```text
//! gfp[j]   = population SD across channels at sample j
//! peak j   ⇔ 1 ≤ j ≤ N−2  and  gfp[j−1] < gfp[j] > gfp[j+1]
//! outliers : keep gfp ≤ mean(peak gfp) + z · sd(peak gfp)   (sd with ddof = 1)
//! cap      : if more than M peaks remain, draw M without replacement
//! ```
//!
//! The outlier filter only looks at the upper tail; low-GFP peaks are
//! never rejected.
use ndarray::{Array1, ArrayView2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::debug;

use crate::config::PeakConfig;
use crate::maps::global_field_power;

/// Peak indices together with the GFP value at each peak.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakSelection {
    /// Sample indices, ascending.
    pub indices: Vec<usize>,
    /// `gfp[indices[i]]`.
    pub gfp: Vec<f64>,
}

impl PeakSelection {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Strict local maxima of `gfp`, endpoints excluded.
pub fn local_maxima(gfp: &Array1<f64>) -> Vec<usize> {
    let n = gfp.len();
    if n < 3 {
        return vec![];
    }
    (1..n - 1)
        .filter(|&j| gfp[j] > gfp[j - 1] && gfp[j] > gfp[j + 1])
        .collect()
}

/// Keep peaks whose GFP is at or below `mean + z · sd` (upper tail only).
pub fn reject_upper_outliers(peaks: &[usize], gfp: &Array1<f64>, z: f64) -> Vec<usize> {
    if peaks.len() < 2 {
        return peaks.to_vec();
    }
    let n = peaks.len() as f64;
    let mean = peaks.iter().map(|&j| gfp[j]).sum::<f64>() / n;
    let var = peaks.iter().map(|&j| (gfp[j] - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let threshold = mean + z * var.sqrt();
    peaks.iter().copied().filter(|&j| gfp[j] <= threshold).collect()
}

/// Draw `max` peaks uniformly without replacement; order is preserved.
pub fn subsample(peaks: &[usize], max: usize, seed: u64) -> Vec<usize> {
    if peaks.len() <= max {
        return peaks.to_vec();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = rand::seq::index::sample(&mut rng, peaks.len(), max).into_vec();
    picked.sort_unstable();
    picked.into_iter().map(|i| peaks[i]).collect()
}

/// Find GFP peaks of `samples` ([N, C]) and apply the configured filters.
pub fn extract_peaks(samples: ArrayView2<f64>, cfg: &PeakConfig) -> PeakSelection {
    let gfp = global_field_power(samples);
    let mut peaks = local_maxima(&gfp);
    let n_found = peaks.len();

    if let Some(z) = cfg.outlier_z.filter(|z| *z > 0.0) {
        peaks = reject_upper_outliers(&peaks, &gfp, z);
    }
    let n_kept = peaks.len();

    if let Some(max) = cfg.max_peaks.filter(|m| *m > 0) {
        peaks = subsample(&peaks, max, cfg.seed);
    }

    debug!(
        n_samples = gfp.len(),
        n_found,
        n_after_outliers = n_kept,
        n_selected = peaks.len(),
        "extracted GFP peaks"
    );

    let values = peaks.iter().map(|&j| gfp[j]).collect();
    PeakSelection { indices: peaks, gfp: values }
}
