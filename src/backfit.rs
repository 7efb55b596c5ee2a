//! Backfitting: rank every prototype at every sample.
//!
//! Both the sample maps and the prototype maps are normalised first
//! (mean-subtracted, divided by GFP).  The distance between a normalised
//! sample `u` and a normalised prototype `v` is the global map dissimilarity
//!
//! ```text
//! GMD(u, v) = min( rms(u − v), rms(u + v) )
//! ```
//!
//! The `min` over both polarities makes a map and its voltage-inverted twin
//! the same topography.  For normalised maps `GMD² = 2 − 2·|r|`, where `r` is
//! the spatial correlation.
//!
//! Every sample keeps the *full* ranking of states, ascending by GMD with
//! ties going to the lower label, so the smoother can promote the next-best
//! candidate later.
//!
//! A sample with zero GFP has no topography.  It gets no label at all: the
//! ranked assignment only covers the observed samples, listed in
//! [`Backfit::observed`], so a flat sample can neither start nor split a run.
use std::cmp::Ordering;

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use tracing::{debug, warn};

use crate::error::{MicrostateError, Result};
use crate::maps::normalize_maps;
use crate::prototypes::PrototypeSet;

// ── Ranked candidates ─────────────────────────────────────────────────────

/// States for one sample, best first.  Length is fixed at `K`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedList(Box<[usize]>);

impl RankedList {
    pub fn new(order: Vec<usize>) -> Self {
        Self(order.into_boxed_slice())
    }

    /// Current label (head of the list).
    #[inline]
    pub fn best(&self) -> usize {
        self.0[0]
    }

    /// Promote the next candidate: head moves to the tail.
    #[inline]
    pub fn rotate(&mut self) {
        self.0.rotate_left(1);
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

/// One [`RankedList`] per sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedAssignment {
    lists: Vec<RankedList>,
}

impl RankedAssignment {
    pub fn new(lists: Vec<RankedList>) -> Self {
        Self { lists }
    }

    /// Assignment where each sample's only candidate order is `labels[j]`
    /// followed by the remaining states in ascending order.
    pub fn from_labels(labels: &[usize], n_states: usize) -> Self {
        let lists = labels
            .iter()
            .map(|&l| {
                let mut order = Vec::with_capacity(n_states);
                order.push(l);
                order.extend((0..n_states).filter(|&k| k != l));
                RankedList::new(order)
            })
            .collect();
        Self { lists }
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Best label of every sample.
    pub fn best(&self) -> Vec<usize> {
        self.lists.iter().map(RankedList::best).collect()
    }

    pub fn rotate(&mut self, sample: usize) {
        self.lists[sample].rotate();
    }

    pub fn get(&self, sample: usize) -> &RankedList {
        &self.lists[sample]
    }
}

// ── Distances ─────────────────────────────────────────────────────────────

/// Polarity-invariant GMD between two normalised maps.
pub fn gmd(u: ArrayView1<f64>, v: ArrayView1<f64>) -> f64 {
    let n = u.len() as f64;
    let (mut same, mut flipped) = (0.0, 0.0);
    for (&a, &b) in u.iter().zip(v.iter()) {
        same += (a - b) * (a - b);
        flipped += (a + b) * (a + b);
    }
    (same / n).sqrt().min((flipped / n).sqrt())
}

/// `[K, N]` GMD of normalised samples (`[N, C]`) against normalised
/// prototypes (`[C, K]`).  NaN wherever either map is degenerate.
pub fn gmd_matrix(samples_z: ArrayView2<f64>, prototypes_z: ArrayView2<f64>) -> Array2<f64> {
    let n = samples_z.nrows();
    let k = prototypes_z.ncols();
    Array2::from_shape_fn((k, n), |(s, j)| gmd(samples_z.row(j), prototypes_z.column(s)))
}

// NaN (of either sign) compares greater than any number.
fn cmp_distance(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => a.total_cmp(&b),
        (a_nan, b_nan) => a_nan.cmp(&b_nan),
    }
}

/// States ordered by ascending distance; ties keep the lower label first.
/// NaN distances sort last.
pub fn rank_states(distances: ArrayView1<f64>) -> RankedList {
    let mut order: Vec<usize> = (0..distances.len()).collect();
    order.sort_by(|&a, &b| cmp_distance(distances[a], distances[b]).then(a.cmp(&b)));
    RankedList::new(order)
}

// ── Backfit ───────────────────────────────────────────────────────────────

/// Result of fitting one recording to a prototype set.
#[derive(Debug, Clone)]
pub struct Backfit {
    /// Normalised samples, `[N, C]`.
    pub samples_z: Array2<f64>,
    /// Normalised prototypes, `[C, K]`.
    pub prototypes_z: Array2<f64>,
    /// GMD of every state at every sample, `[K, N]`.
    pub gmd: Array2<f64>,
    /// Full ranking per observed sample; entry `i` belongs to sample
    /// `observed[i]`.
    pub assignment: RankedAssignment,
    /// Indices of the samples whose map could be normalised, ascending.
    pub observed: Vec<usize>,
}

impl Backfit {
    pub fn n_states(&self) -> usize {
        self.gmd.nrows()
    }

    /// All samples of the recording, flat ones included.
    pub fn n_samples(&self) -> usize {
        self.gmd.ncols()
    }

    /// Samples that carry a label.
    pub fn n_observed(&self) -> usize {
        self.observed.len()
    }
}

fn same_channel(a: &str, b: &str) -> bool {
    let norm = |s: &str| s.replace(' ', "").to_lowercase();
    norm(a) == norm(b)
}

/// Check that samples and prototypes describe the same channels.
///
/// `ch_names` may be empty, in which case only the channel count is checked.
pub fn check_channels(n_channels: usize, ch_names: &[String], prototypes: &PrototypeSet) -> Result<()> {
    if n_channels < 2 {
        return Err(MicrostateError::InsufficientSignals { found: n_channels });
    }
    if n_channels != prototypes.n_channels() {
        return Err(MicrostateError::DimensionMismatch {
            expected: prototypes.n_channels(),
            found: n_channels,
        });
    }
    if ch_names.is_empty() {
        return Ok(());
    }
    if ch_names.len() != n_channels {
        return Err(MicrostateError::DimensionMismatch {
            expected: n_channels,
            found: ch_names.len(),
        });
    }
    for (index, (found, expected)) in ch_names.iter().zip(prototypes.labels()).enumerate() {
        if !same_channel(found, expected) {
            return Err(MicrostateError::ChannelMismatch {
                index,
                expected: expected.clone(),
                found: found.clone(),
            });
        }
    }
    Ok(())
}

/// Rank all prototypes at every sample of `samples` ([N, C]).
pub fn backfit(samples: ArrayView2<f64>, ch_names: &[String], prototypes: &PrototypeSet) -> Result<Backfit> {
    check_channels(samples.ncols(), ch_names, prototypes)?;

    let samples_z = normalize_maps(samples, Axis(0));
    let prototypes_z = prototypes.normalized();
    if prototypes_z.iter().any(|v| !v.is_finite()) {
        warn!("prototype set contains a flat map; it can never be assigned");
    }

    let gmd = gmd_matrix(samples_z.view(), prototypes_z.view());
    let observed: Vec<usize> = samples_z
        .rows()
        .into_iter()
        .enumerate()
        .filter(|(_, r)| r.iter().all(|v| v.is_finite()))
        .map(|(j, _)| j)
        .collect();
    let lists = observed.iter().map(|&j| rank_states(gmd.column(j))).collect();
    let n_degenerate = samples_z.nrows() - observed.len();
    let fit = Backfit {
        samples_z,
        prototypes_z,
        gmd,
        assignment: RankedAssignment::new(lists),
        observed,
    };

    if n_degenerate > 0 {
        warn!(n_degenerate, "samples with zero GFP carry no label and are left out of all statistics");
    }
    debug!(
        n_samples = fit.n_samples(),
        n_observed = fit.n_observed(),
        n_states = fit.n_states(),
        "backfit complete"
    );
    Ok(fit)
}
