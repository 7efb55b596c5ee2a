//! Output handed to the reporting layer.
//!
//! [`MicrostateReport`] bundles everything computed for one recording and
//! serialises to JSON.  [`ReportSession`] writes a tab-separated table with
//! one row per recording; the header is written once per session, and the
//! session object carries that state instead of anything process-wide.
use std::io::Write;

use anyhow::{bail, Result};
use serde::Serialize;

use crate::complexity::ComplexityBundle;
use crate::smooth::SmoothSummary;
use crate::stats::StatsBundle;

/// Full analysis result for one recording.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MicrostateReport {
    pub n_samples: usize,
    pub n_channels: usize,
    pub n_states: usize,
    pub sfreq: u32,
    pub smoothing: SmoothSummary,
    pub stats: StatsBundle,
    pub complexity: ComplexityBundle,
    /// GFP at every retained peak, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_gfp: Option<Vec<f64>>,
}

impl MicrostateReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

const STATE_COLUMNS: [&str; 6] = ["mean_gfp", "occurrence", "duration_ms", "coverage", "gev", "spatcorr"];

fn fmt_opt(v: Option<f64>) -> String {
    v.map_or_else(|| "NA".to_string(), |x| x.to_string())
}

/// Tab-separated summary table spanning several recordings.
pub struct ReportSession<W: Write> {
    writer: W,
    n_states: Option<usize>,
    rows: usize,
}

impl<W: Write> ReportSession<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, n_states: None, rows: 0 }
    }

    /// Whether the header line has gone out.
    pub fn header_written(&self) -> bool {
        self.n_states.is_some()
    }

    /// Rows written so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    fn write_header(&mut self, n_states: usize) -> Result<()> {
        let mut cols: Vec<String> = ["recording", "n_samples", "gev_total", "lzw_points", "lzw_runs"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        for k in 0..n_states {
            cols.extend(STATE_COLUMNS.iter().map(|c| format!("s{k}_{c}")));
        }
        for a in 0..n_states {
            for b in (0..n_states).filter(|&b| b != a) {
                cols.push(format!("p_{a}_{b}"));
            }
        }
        writeln!(self.writer, "{}", cols.join("\t"))?;
        self.n_states = Some(n_states);
        Ok(())
    }

    /// Append one recording.  Every row in a session must have the same `K`.
    pub fn write_recording(&mut self, name: &str, report: &MicrostateReport) -> Result<()> {
        match self.n_states {
            None => self.write_header(report.n_states)?,
            Some(k) if k != report.n_states => {
                bail!("recording '{name}' has {} states, session table has {k}", report.n_states)
            }
            Some(_) => {}
        }

        let mut cells = vec![
            name.to_string(),
            report.n_samples.to_string(),
            report.stats.gev_total.to_string(),
            report.complexity.lzw_points.to_string(),
            report.complexity.lzw_runs.to_string(),
        ];
        for s in &report.stats.states {
            cells.push(fmt_opt(s.mean_gfp));
            cells.push(s.occurrence.to_string());
            cells.push(fmt_opt(s.duration_ms));
            cells.push(fmt_opt(s.coverage));
            cells.push(s.gev.to_string());
            cells.push(fmt_opt(s.spatial_correlation));
        }
        for (a, row) in report.stats.transitions.iter().enumerate() {
            for (b, p) in row.iter().enumerate() {
                if a != b {
                    cells.push(p.to_string());
                }
            }
        }
        writeln!(self.writer, "{}", cells.join("\t"))?;
        self.rows += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}
