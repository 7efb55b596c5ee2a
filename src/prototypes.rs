//! Prototype maps: storage, persistence and the fitting contract.
//!
//! A [`PrototypeSet`] is a `[C, K]` matrix (one topography per column) plus
//! the `C` channel labels it was fitted on.  It is immutable once built and
//! can be shared across many recordings and threads.
//!
//! # Text format
//!
//! One line per channel, tab separated:
//!
//! ```text
//! <label>\t<A[c,0]>\t<A[c,1]>\t…\t<A[c,K-1]>
//! ```
//!
//! `K` comes from the first line; every other line must have the same number
//! of columns.  Values are written with Rust's shortest round-trip float
//! formatting, so a save → load cycle reproduces every bit.
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use ndarray::{Array2, ArrayView2, Axis};
use serde::Serialize;
use tracing::debug;

use crate::backfit::gmd_matrix;
use crate::error::{MicrostateError, Result};
use crate::maps::{gfp, normalize_maps};

/// K prototype topographies over C labelled channels.
#[derive(Debug, Clone, PartialEq)]
pub struct PrototypeSet {
    labels: Vec<String>,
    maps: Array2<f64>,
}

impl PrototypeSet {
    /// Build from channel labels and a `[C, K]` matrix.
    pub fn new(labels: Vec<String>, maps: Array2<f64>) -> Result<Self> {
        let (n_ch, n_states) = maps.dim();
        if n_ch < 2 {
            return Err(MicrostateError::InsufficientSignals { found: n_ch });
        }
        if n_states == 0 {
            return Err(MicrostateError::Empty("prototype set has no states"));
        }
        if labels.len() != n_ch {
            return Err(MicrostateError::DimensionMismatch {
                expected: n_ch,
                found: labels.len(),
            });
        }
        Ok(Self { labels, maps })
    }

    /// Number of channels `C`.
    pub fn n_channels(&self) -> usize {
        self.maps.nrows()
    }

    /// Number of states `K`.
    pub fn n_states(&self) -> usize {
        self.maps.ncols()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Raw `[C, K]` maps as fitted.
    pub fn maps(&self) -> ArrayView2<'_, f64> {
        self.maps.view()
    }

    /// Mean-subtracted, GFP-normalised `[C, K]` copy.  Flat columns are NaN.
    pub fn normalized(&self) -> Array2<f64> {
        normalize_maps(self.maps.view(), Axis(1))
    }

    /// Parse the tab-separated text format.
    pub fn read_from<R: BufRead>(reader: R) -> Result<Self> {
        let mut labels = Vec::new();
        let mut values: Vec<f64> = Vec::new();
        let mut n_states: Option<usize> = None;

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = i + 1;
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.trim_end_matches(['\r', '\n']).split('\t');
            let label = fields.next().unwrap_or_default().trim().to_string();
            let row = fields
                .map(|f| {
                    f.trim().parse::<f64>().map_err(|e| MicrostateError::MalformedPrototypeFile {
                        line: line_no,
                        reason: format!("'{f}' is not a number ({e})"),
                    })
                })
                .collect::<Result<Vec<f64>>>()?;

            match n_states {
                None if row.is_empty() => {
                    return Err(MicrostateError::MalformedPrototypeFile {
                        line: line_no,
                        reason: "no map values after the channel label".into(),
                    });
                }
                None => n_states = Some(row.len()),
                Some(k) if k != row.len() => {
                    return Err(MicrostateError::MalformedPrototypeFile {
                        line: line_no,
                        reason: format!("expected {k} values, found {}", row.len()),
                    });
                }
                Some(_) => {}
            }
            labels.push(label);
            values.extend(row);
        }

        let Some(k) = n_states else {
            return Err(MicrostateError::MalformedPrototypeFile {
                line: 0,
                reason: "file contains no channels".into(),
            });
        };
        let maps = Array2::from_shape_vec((labels.len(), k), values).map_err(|e| {
            MicrostateError::MalformedPrototypeFile { line: 0, reason: e.to_string() }
        })?;
        debug!(n_channels = labels.len(), n_states = k, "read prototype set");
        Self::new(labels, maps)
    }

    /// Write the tab-separated text format.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        for (label, row) in self.labels.iter().zip(self.maps.rows()) {
            write!(writer, "{label}")?;
            for v in row.iter() {
                write!(writer, "\t{v}")?;
            }
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::read_from(BufReader::new(File::open(path)?))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.write_to(BufWriter::new(File::create(path)?))
    }
}

// ── Fitting contract ──────────────────────────────────────────────────────

/// Anything that turns candidate topographies into `K` prototype maps.
///
/// `maps` is `[M, C]` (one candidate topography per row, usually the
/// samples at GFP peaks).  The result must be `[C, K]` in the same channel
/// order.  How the prototypes are found is up to the implementor.
pub trait PrototypeFitter {
    fn fit(&self, maps: ArrayView2<f64>, n_states: usize) -> Result<Array2<f64>>;
}

/// Quality of a prototype matrix on the maps it was fitted to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitDiagnostics {
    pub n_states: usize,
    /// Global explained variance of `maps` under polarity-invariant assignment.
    pub gev: f64,
    /// Mean squared GMD of each map to its closest prototype.
    pub residual: f64,
}

/// One fitted candidate.
#[derive(Debug, Clone)]
pub struct FitCandidate {
    pub prototypes: Array2<f64>,
    pub diagnostics: FitDiagnostics,
}

/// Score a `[C, K]` prototype matrix against `[M, C]` maps.
pub fn fit_diagnostics(maps: ArrayView2<f64>, prototypes: ArrayView2<f64>) -> Result<FitDiagnostics> {
    if maps.ncols() != prototypes.nrows() {
        return Err(MicrostateError::DimensionMismatch {
            expected: prototypes.nrows(),
            found: maps.ncols(),
        });
    }
    let z_maps = normalize_maps(maps, Axis(0));
    let z_protos = normalize_maps(prototypes, Axis(1));
    let gmd = gmd_matrix(z_maps.view(), z_protos.view());

    let mut explained = 0.0;
    let mut total = 0.0;
    let mut residual = 0.0;
    let mut n_valid = 0usize;
    for (j, col) in gmd.columns().into_iter().enumerate() {
        let best = col.iter().copied().fold(f64::INFINITY, f64::min);
        if !best.is_finite() {
            continue;
        }
        let g = gfp(maps.row(j));
        let corr = 1.0 - best * best / 2.0;
        explained += (corr * g).powi(2);
        total += g * g;
        residual += best * best;
        n_valid += 1;
    }

    Ok(FitDiagnostics {
        n_states: prototypes.ncols(),
        gev: if total > 0.0 { explained / total } else { 0.0 },
        residual: if n_valid > 0 { residual / n_valid as f64 } else { f64::NAN },
    })
}

/// Run `fitter` once per candidate `K` and score every result.
pub fn fit_candidates<F: PrototypeFitter + ?Sized>(
    fitter: &F,
    maps: ArrayView2<f64>,
    candidates: &[usize],
) -> Result<Vec<FitCandidate>> {
    candidates
        .iter()
        .map(|&k| {
            let prototypes = fitter.fit(maps, k)?;
            if prototypes.nrows() != maps.ncols() {
                return Err(MicrostateError::DimensionMismatch {
                    expected: maps.ncols(),
                    found: prototypes.nrows(),
                });
            }
            let diagnostics = fit_diagnostics(maps, prototypes.view())?;
            debug!(k, gev = diagnostics.gev, residual = diagnostics.residual, "scored candidate");
            Ok(FitCandidate { prototypes, diagnostics })
        })
        .collect()
}

/// Candidate with the highest GEV (first one wins on ties).
pub fn best_candidate(candidates: &[FitCandidate]) -> Option<&FitCandidate> {
    candidates.iter().reduce(|best, c| {
        if c.diagnostics.gev > best.diagnostics.gev { c } else { best }
    })
}
