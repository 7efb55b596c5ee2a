//! Rejection of implausibly short runs.
//!
//! Every sample in a run shorter than `min_run` has its ranked candidate
//! list rotated, so its next-best state becomes its label.  Short runs are
//! attacked in escalating order, `k = 1, 2, …, min_run − 1`:
//!
//! ```text
//! for k in 1..min_run:
//!     while enforce_min_run(assignment, k) { }
//! ```
//!
//! Promotion is per sample, so a short run may fragment instead of being
//! relabelled as a whole.  The procedure is a greedy local heuristic; it is
//! not guaranteed to converge, so each level is capped at `max_passes`
//! passes and any runs still too short afterwards are left in place.
use serde::Serialize;
use tracing::{debug, warn};

use crate::backfit::RankedAssignment;
use crate::runs::run_length_encode;

/// What the smoother did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SmoothSummary {
    /// Total passes over the sequence, all levels.
    pub passes: usize,
    /// Total per-sample promotions.
    pub rotations: usize,
    /// Runs shorter than `min_run` left after hitting the pass cap.
    pub unresolved_runs: usize,
}

/// One pass: rotate every sample lying in a run of length `<= k`.
///
/// Returns `true` if anything was rotated.  A sequence made of a single run
/// has nothing to merge into and is left untouched.
pub fn enforce_min_run(assignment: &mut RankedAssignment, k: usize) -> bool {
    let runs = run_length_encode(&assignment.best());
    if runs.len() < 2 {
        return false;
    }
    let mut changed = false;
    for run in runs.iter().filter(|r| r.len <= k) {
        for j in run.start..run.end() {
            assignment.rotate(j);
        }
        changed = true;
    }
    changed
}

/// Count of runs strictly shorter than `min_run`.
pub fn count_short_runs(labels: &[usize], min_run: usize) -> usize {
    let runs = run_length_encode(labels);
    if runs.len() < 2 {
        return 0;
    }
    runs.iter().filter(|r| r.len < min_run).count()
}

/// Remove runs shorter than `min_run` samples.  `min_run <= 1` is a no-op.
pub fn smooth(assignment: &mut RankedAssignment, min_run: usize, max_passes: usize) -> SmoothSummary {
    let mut summary = SmoothSummary::default();

    for k in 1..min_run {
        let mut level_passes = 0;
        loop {
            if level_passes >= max_passes {
                warn!(k, max_passes, "smoother hit its pass cap; short runs remain");
                break;
            }
            let before = short_run_samples(assignment, k);
            if !enforce_min_run(assignment, k) {
                break;
            }
            level_passes += 1;
            summary.rotations += before;
        }
        summary.passes += level_passes;
    }

    summary.unresolved_runs = count_short_runs(&assignment.best(), min_run);
    debug!(
        min_run,
        passes = summary.passes,
        rotations = summary.rotations,
        unresolved = summary.unresolved_runs,
        "smoothing finished"
    );
    summary
}

fn short_run_samples(assignment: &RankedAssignment, k: usize) -> usize {
    let runs = run_length_encode(&assignment.best());
    if runs.len() < 2 {
        return 0;
    }
    runs.iter().filter(|r| r.len <= k).map(|r| r.len).sum()
}
