/// microstates: backfit one or more recordings to a prototype set and write
/// per-recording statistics.
///
/// Outputs:
///   --tsv   one tab-separated row per recording (header written once)
///   --json  full report of every recording, as a JSON array
use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use microstates::io::write_json_reports;
use microstates::{analyze_batch, AnalysisConfig, PrototypeSet, Recording, ReportSession};

#[derive(Parser, Debug)]
#[command(name = "microstates", about = "EEG microstate backfitting and sequence statistics")]
struct Args {
    /// Recording(s) as safetensors (`data` [C, T], `sfreq`, optional `ch_names`).
    #[arg(long, required = true, num_args = 1..)]
    input: Vec<PathBuf>,

    /// Prototype maps, one tab-separated line per channel.
    #[arg(long)]
    prototypes: PathBuf,

    /// JSON file with analysis settings (any subset of fields).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Minimum run length in samples (overrides the config file).
    #[arg(long)]
    min_run: Option<usize>,

    /// Attach the GFP value at every peak to the JSON report.
    #[arg(long)]
    trace_peaks: bool,

    /// Tab-separated summary output.
    #[arg(long)]
    tsv: Option<PathBuf>,

    /// JSON report output.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let mut cfg = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            AnalysisConfig::from_json(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => AnalysisConfig::default(),
    };
    if let Some(m) = args.min_run {
        cfg.min_run = m;
    }
    cfg.trace_peaks |= args.trace_peaks;

    let prototypes = PrototypeSet::load(&args.prototypes)
        .with_context(|| format!("loading prototypes from {}", args.prototypes.display()))?;
    info!(
        n_channels = prototypes.n_channels(),
        n_states = prototypes.n_states(),
        "loaded prototype set"
    );

    let recordings = args
        .input
        .iter()
        .map(|p| Recording::load(p))
        .collect::<Result<Vec<_>>>()?;

    let results = analyze_batch(&recordings, &prototypes, &cfg);

    let mut session = match &args.tsv {
        Some(path) => Some(ReportSession::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ))),
        None => None,
    };
    let mut reports = Vec::new();
    for (path, res) in args.input.iter().zip(results) {
        let name = path.display().to_string();
        match res {
            Ok(report) => {
                eprintln!(
                    "{name}: {} samples, GEV {:.4}, LZW {} / {}",
                    report.n_samples, report.stats.gev_total, report.complexity.lzw_points, report.complexity.lzw_runs
                );
                if let Some(s) = session.as_mut() {
                    s.write_recording(&name, &report)?;
                }
                reports.push(report);
            }
            Err(e) => warn!(recording = %name, error = %e, "analysis failed"),
        }
    }

    if let Some(s) = session {
        let rows = s.rows();
        s.finish()?;
        info!(rows, "wrote summary table");
    }
    if let Some(path) = &args.json {
        write_json_reports(path, &reports)?;
        eprintln!("Written → {}", path.display());
    }
    Ok(())
}
