//! Analysis configuration.
//!
//! [`AnalysisConfig`] holds every tunable parameter of the backfit → smooth →
//! statistics → complexity pipeline.  Defaults follow common microstate
//! practice; every field can be overridden from a JSON file because the
//! struct deserialises with `#[serde(default)]`.
use serde::{Deserialize, Serialize};

/// Shortest and longest k-mer length the complexity analyzer accepts.
pub const KMER_BOUNDS: (usize, usize) = (2, 10);

/// Options for GFP peak extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakConfig {
    /// Reject peaks whose GFP exceeds `mean + z · sd` of all peak GFPs.
    ///
    /// Only the upper tail is rejected.  `None` disables the filter.
    ///
    /// Default: `None`.
    pub outlier_z: Option<f64>,

    /// Randomly keep at most this many peaks (without replacement).
    ///
    /// Default: `None` (keep all).
    pub max_peaks: Option<usize>,

    /// Seed for the subsampling RNG.  Same seed, same peaks.
    ///
    /// Default: `0`.
    pub seed: u64,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            outlier_z: None,
            max_peaks: None,
            seed: 0,
        }
    }
}

/// Configuration for a single-recording microstate analysis.
///
/// All fields are `pub` so you can construct one with struct-update syntax:
///
/// ```
/// use microstates::AnalysisConfig;
///
/// let cfg = AnalysisConfig {
///     min_run: 5,        // reject runs shorter than 5 samples
///     ..AnalysisConfig::default()
/// };
/// assert_eq!(cfg.kmer_range(), (2, 4));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Minimum plausible run length in samples.
    ///
    /// Runs strictly shorter than this are broken up by promoting each
    /// offending sample's next-best state.  `1` disables smoothing.
    ///
    /// Default: `3`.
    pub min_run: usize,

    /// Pass cap per escalation level of the smoother.
    ///
    /// When reached, remaining short runs are left in place and a warning is
    /// logged.
    ///
    /// Default: `1000`.
    pub max_smoothing_passes: usize,

    /// GFP peak extraction options (used for fitting and the peak trace).
    pub peaks: PeakConfig,

    /// Shortest k-mer tabulated.  Default: `2`.
    pub kmer_min: usize,

    /// Longest k-mer tabulated.  Default: `4`.
    pub kmer_max: usize,

    /// Attach the GFP value of every retained peak to the report.
    ///
    /// Default: `false`.
    pub trace_peaks: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_run: 3,
            max_smoothing_passes: 1000,
            peaks: PeakConfig::default(),
            kmer_min: 2,
            kmer_max: 4,
            trace_peaks: false,
        }
    }
}

impl AnalysisConfig {
    /// Inclusive k-mer length range, clamped to [`KMER_BOUNDS`] and ordered.
    ///
    /// ```
    /// use microstates::AnalysisConfig;
    /// let cfg = AnalysisConfig { kmer_min: 0, kmer_max: 40, ..Default::default() };
    /// assert_eq!(cfg.kmer_range(), (2, 10));
    /// ```
    pub fn kmer_range(&self) -> (usize, usize) {
        let (lo, hi) = KMER_BOUNDS;
        let a = self.kmer_min.clamp(lo, hi);
        let b = self.kmer_max.clamp(lo, hi);
        (a.min(b), a.max(b))
    }

    /// Parse a (possibly partial) configuration from JSON.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
