//! # microstates — EEG microstate analysis in pure Rust
//!
//! `microstates` reduces a continuous multichannel EEG recording to a short
//! sequence of recurring scalp topographies, labels every sample with its
//! closest topography, cleans up the label sequence, and summarises it with
//! descriptive and complexity statistics.
//!
//! ## Pipeline overview
//!
//! ```text
//! samples [N, C] f64
//!   │
//!   ├─ peaks::extract_peaks()      GFP local maxima (+ outlier filter, subsampling)
//!   ├─ PrototypeFitter (external)  peak maps → K prototype maps [C, K]
//!   ├─ backfit::backfit()          polarity-invariant GMD, full ranking per sample
//!   ├─ smooth::smooth()            promote next-best state in runs < min_run
//!   ├─ stats::compute_statistics() GFP, occurrence, duration, coverage, GEV, transitions
//!   └─ complexity::analyze_complexity()  LZW code counts, k-mer classes
//!        │
//!        └─→ MicrostateReport  (JSON via serde, TSV via ReportSession)
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use microstates::{analyze, AnalysisConfig, PrototypeSet, Recording};
//!
//! // Prototype maps fitted elsewhere, one line per channel.
//! let prototypes = PrototypeSet::load("maps.txt").unwrap();
//!
//! // `data` [C, T], `sfreq` and `ch_names`, in the prototypes' channel order.
//! let rec = Recording::load(std::path::Path::new("rest.safetensors")).unwrap();
//!
//! let report = analyze(&rec, &prototypes, &AnalysisConfig::default()).unwrap();
//! for s in &report.stats.states {
//!     println!("state {}: coverage {:?}", s.state, s.coverage);
//! }
//! ```
//!
//! ## Running individual steps
//!
//! ```no_run
//! use microstates::backfit::backfit;
//! use microstates::smooth::smooth;
//! use microstates::stats::compute_statistics;
//! use microstates::complexity::analyze_complexity;
//! # use microstates::PrototypeSet;
//! # use ndarray::Array2;
//! # let prototypes = PrototypeSet::load("maps.txt").unwrap();
//! # let samples: Array2<f64> = Array2::zeros((1000, prototypes.n_channels()));
//!
//! let mut fit = backfit(samples.view(), &[], &prototypes).unwrap();
//! smooth(&mut fit.assignment, 3, 1000);
//! let labels = fit.assignment.best();
//! let stats = compute_statistics(samples.view(), &fit, &labels, 250.0).unwrap();
//! let cx = analyze_complexity(&labels, 2, 4).unwrap();
//! ```

pub mod backfit;
pub mod complexity;
pub mod config;
pub mod error;
pub mod io;
pub mod maps;
pub mod peaks;
pub mod prototypes;
pub mod report;
pub mod runs;
pub mod smooth;
pub mod stats;

use ndarray::Axis;
use rayon::prelude::*;
use tracing::info;

// ── Crate-root re-exports ─────────────────────────────────────────────────

pub use config::{AnalysisConfig, PeakConfig};
pub use error::{MicrostateError, Result};
pub use io::Recording;
pub use report::{MicrostateReport, ReportSession};

pub use backfit::{backfit, gmd, Backfit, RankedAssignment, RankedList};
pub use complexity::{analyze_complexity, lzw_code_count, ComplexityBundle, KmerTable};
pub use maps::{gfp, global_field_power};
pub use peaks::{extract_peaks, PeakSelection};
pub use prototypes::{best_candidate, fit_candidates, FitCandidate, FitDiagnostics, PrototypeFitter, PrototypeSet};
pub use runs::{run_length_encode, Run};
pub use smooth::{enforce_min_run, smooth, SmoothSummary};
pub use stats::{compute_statistics, StateStats, StatsBundle};

fn check_recording(recording: &Recording) -> Result<()> {
    if recording.n_channels() < 2 {
        return Err(MicrostateError::InsufficientSignals { found: recording.n_channels() });
    }
    if recording.n_samples() == 0 {
        return Err(MicrostateError::Empty("recording has no samples"));
    }
    if recording.sfreq == 0 {
        return Err(MicrostateError::InvalidSamplingRate(recording.sfreq));
    }
    Ok(())
}

/// Run the **full microstate analysis** of one recording.
///
/// # Steps
///
/// 1. Validate the recording (≥ 2 channels, ≥ 1 sample, sfreq > 0) and
///    that its channels match the prototype set.
/// 2. Backfit every sample to the prototypes.
/// 3. Reject runs shorter than [`AnalysisConfig::min_run`].
/// 4. Per-state statistics and the transition matrix.
/// 5. LZW and k-mer complexity.
/// 6. Optionally, the GFP trace at every detected peak.
///
/// # Errors
///
/// * [`MicrostateError::InsufficientSignals`] for fewer than two channels.
/// * [`MicrostateError::DimensionMismatch`] / [`MicrostateError::ChannelMismatch`]
///   when recording and prototypes disagree on channels.
///
/// * [`MicrostateError::Empty`] when every sample is flat (zero GFP).
///
/// Empty states and isolated flat samples are not errors; see [`StatsBundle`]
/// and [`Backfit::observed`].
pub fn analyze(recording: &Recording, prototypes: &PrototypeSet, cfg: &AnalysisConfig) -> Result<MicrostateReport> {
    check_recording(recording)?;
    let samples = recording.data.view();

    let mut fit = backfit(samples, &recording.ch_names, prototypes)?;
    let smoothing = smooth(&mut fit.assignment, cfg.min_run, cfg.max_smoothing_passes);
    let labels = fit.assignment.best();

    let stats = compute_statistics(samples, &fit, &labels, f64::from(recording.sfreq))?;
    let (k_min, k_max) = cfg.kmer_range();
    let complexity = analyze_complexity(&labels, k_min, k_max)?;
    let peak_gfp = cfg.trace_peaks.then(|| extract_peaks(samples, &cfg.peaks).gfp);

    info!(
        n_samples = recording.n_samples(),
        n_states = prototypes.n_states(),
        gev_total = stats.gev_total,
        lzw_points = complexity.lzw_points,
        "microstate analysis complete"
    );

    Ok(MicrostateReport {
        n_samples: recording.n_samples(),
        n_channels: recording.n_channels(),
        n_states: prototypes.n_states(),
        sfreq: recording.sfreq,
        smoothing,
        stats,
        complexity,
        peak_gfp,
    })
}

/// Analyse many recordings against one shared prototype set.
///
/// Recordings run in parallel on the rayon thread pool; results come back
/// in input order, one per recording.
pub fn analyze_batch(
    recordings: &[Recording],
    prototypes: &PrototypeSet,
    cfg: &AnalysisConfig,
) -> Vec<Result<MicrostateReport>> {
    recordings.par_iter().map(|rec| analyze(rec, prototypes, cfg)).collect()
}

/// Fit prototype maps to the GFP peaks of `recording`, once per candidate `K`.
///
/// Peaks are selected with [`AnalysisConfig::peaks`]; the fitter sees the
/// `[M, C]` peak maps.  Use [`best_candidate`] to pick one.
pub fn fit_prototypes<F: PrototypeFitter + ?Sized>(
    recording: &Recording,
    fitter: &F,
    cfg: &AnalysisConfig,
    candidates: &[usize],
) -> Result<Vec<FitCandidate>> {
    check_recording(recording)?;
    let peaks = extract_peaks(recording.data.view(), &cfg.peaks);
    if peaks.is_empty() {
        return Err(MicrostateError::Empty("recording has no GFP peaks"));
    }
    let maps = recording.data.select(Axis(0), &peaks.indices);
    info!(n_peaks = peaks.len(), ?candidates, "fitting prototypes to GFP peaks");
    fit_candidates(fitter, maps.view(), candidates)
}
