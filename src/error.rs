//! Error kinds surfaced by the analysis core.
//!
//! Dimension and format problems are fatal and abort the call that hit them.
//! Empty states and degenerate samples are *not* errors: they are recovered
//! locally and show up as `None` metrics in [`crate::stats::StatsBundle`].
use thiserror::Error;

/// Fatal errors raised by the microstate pipeline.
#[derive(Error, Debug)]
pub enum MicrostateError {
    /// Two inputs disagree on a size: channels of prototypes and samples,
    /// or labels and observed samples.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// A label names a state the prototype set does not have.
    #[error("label {label} out of range for {n_states} states")]
    LabelOutOfRange { label: usize, n_states: usize },

    /// Channel labels disagree at some position.
    #[error("channel {index} mismatch: prototypes expect '{expected}', recording has '{found}'")]
    ChannelMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    /// Prototype text file could not be parsed.
    #[error("malformed prototype file (line {line}): {reason}")]
    MalformedPrototypeFile { line: usize, reason: String },

    /// Fewer than two channels: GFP and normalisation are meaningless.
    #[error("insufficient signals: need at least 2 channels, got {found}")]
    InsufficientSignals { found: usize },

    /// Sampling rate must be a positive number of Hz.
    #[error("invalid sampling rate: {0} Hz")]
    InvalidSamplingRate(u32),

    /// A recording with no samples, or a prototype set with no states.
    #[error("nothing to analyse: {0}")]
    Empty(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MicrostateError>;
