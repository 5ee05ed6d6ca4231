//! Top-level module for guess-number estimation.
//!
//! This module provides the Monte Carlo evaluation pipeline, including:
//! - Random parse-tree sampling from a grammar (`GrammarSampler`)
//! - Calibration and rank queries (`GuessNumberEstimator`)
//! - Probability lookup of real candidates (`PcfgScorer`)
//! - Batch evaluation with per-candidate error isolation (`evaluate_batch`, `evaluate_lines`)

/// Random walks of the grammar.
///
/// Draws one base structure and one entry per slot, and records the
/// probability of every part of the resulting parse tree.
pub mod sampler;

/// Calibration curve construction and rank queries.
pub mod estimator;

/// Grammar scorer: the probability of an arbitrary candidate.
pub mod scorer;

/// Ordered batch evaluation of candidate lists.
pub mod evaluation;

pub use estimator::{CalibrationCurve, GuessNumberEstimator, LogBase, OutOfCalibrationRange, RankEstimate};
pub use evaluation::{BatchReport, CandidateFailure, CandidateOutcome, evaluate_batch, evaluate_lines};
pub use sampler::{GrammarSampler, ParseTreeSample};
pub use scorer::{PcfgScorer, ProbabilityOracle};
