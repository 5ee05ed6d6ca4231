//! Error type shared by every stage of the evaluator.
//!
//! Grammar, configuration and I/O errors abort a run before any output is
//! produced. During batch evaluation, errors raised while scoring a single
//! candidate are collected by the batch evaluator instead of being propagated.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EvalError>;

#[derive(Debug, Error)]
pub enum EvalError {
	/// The grammar has no base structure that can be sampled.
	#[error("grammar has no eligible base structure (all are empty or Markov-only)")]
	EmptyGrammar,

	/// A base structure references a category with no production entries.
	#[error("category '{0}' has no production entries")]
	EmptyCategory(String),

	/// A probability outside (0, 1] reached a log transform or the grammar table.
	#[error("probability {0} is outside (0, 1]")]
	Domain(f64),

	/// A rank was requested before the estimator was calibrated.
	#[error("estimator has not been calibrated")]
	NotCalibrated,

	/// The scorer could not decompose a candidate under the grammar.
	#[error("'{candidate}' is not generated by the grammar: {reason}")]
	UngrammaticalInput { candidate: String, reason: String },

	/// A line in a rule-set file could not be parsed.
	#[error("{}:{line}: {reason}", path.display())]
	InvalidRule {
		path: PathBuf,
		line: usize,
		reason: String,
	},

	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	#[error("I/O error: {context}")]
	Io {
		context: String,
		#[source]
		source: std::io::Error,
	},

	#[error("grammar cache error: {0}")]
	Cache(#[from] postcard::Error),
}

impl EvalError {
	/// Wraps an `io::Error` with a short description of what was being done.
	pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
		Self::Io {
			context: context.into(),
			source,
		}
	}

	pub(crate) fn ungrammatical(candidate: &str, reason: impl Into<String>) -> Self {
		Self::UngrammaticalInput {
			candidate: candidate.to_owned(),
			reason: reason.into(),
		}
	}

	/// Returns `true` for errors that only concern a single candidate.
	pub fn is_per_candidate(&self) -> bool {
		matches!(self, Self::UngrammaticalInput { .. })
	}
}
