//! Monte Carlo guess-number estimation for probabilistic password grammars.
//!
//! This crate provides:
//! - A read-only grammar model and its on-disk rule-set loader
//! - Uniform-index random walks of the grammar, scored in the log domain
//! - A calibration curve mapping a probability to an estimated guess number
//! - Batch evaluation of candidate lists and a result-file writer
//!
//! Only the high-level API is exposed publicly. Low-level file helpers
//! are kept internal.

/// Error type and result alias.
pub mod error;

/// Grammar tables, category tags and rule-set loading.
pub mod grammar;

/// Sampling, calibration, scoring and batch evaluation.
pub mod model;

/// Run configuration and its defaults.
pub mod config;

/// Result and run-summary files.
pub mod report;

/// End-to-end run driven by an `EvaluatorConfig`.
pub mod pipeline;

/// I/O utilities (file loading, path helpers).
///
/// Not exposed
pub(crate) mod io;

pub use config::EvaluatorConfig;
pub use error::{EvalError, Result};
pub use pipeline::{RunOutcome, run_evaluation};
