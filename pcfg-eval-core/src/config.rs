use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{EvalError, Result};
use crate::model::LogBase;

pub const DEFAULT_RULE_NAME: &str = "Default";
pub const DEFAULT_SAMPLE_COUNT: usize = 10_000;

/// Parameters of one evaluation run.
///
/// # Invariants
/// - `sample_count > 0` and `workers > 0` once `validate` succeeded
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluatorConfig {
	/// Rule set to load from `rules_dir`.
	pub rule_name: String,

	/// Directory holding one sub-directory per rule set.
	pub rules_dir: PathBuf,

	/// Number of random walks used for calibration.
	pub sample_count: usize,

	pub log_base: LogBase,

	/// Free-form label, only used to namespace output files.
	pub label: String,

	/// Root of the result files; the label becomes a sub-directory.
	pub output_dir: PathBuf,

	/// Calibration seed. `None` takes one from the clock.
	pub seed: Option<u64>,

	/// Calibration threads.
	pub workers: usize,

	/// Reparse the rule set's text files even if its cache is up to date.
	pub rebuild_cache: bool,
}

impl Default for EvaluatorConfig {
	fn default() -> Self {
		Self {
			rule_name: DEFAULT_RULE_NAME.to_owned(),
			rules_dir: PathBuf::from("Rules"),
			sample_count: DEFAULT_SAMPLE_COUNT,
			log_base: LogBase::Two,
			label: String::new(),
			output_dir: PathBuf::from("Evaluation_Result"),
			seed: None,
			workers: 1,
			rebuild_cache: false,
		}
	}
}

impl EvaluatorConfig {
	/// # Errors
	/// `InvalidConfig` on a zero sample count, zero workers or an empty rule name.
	pub fn validate(&self) -> Result<()> {
		if self.sample_count == 0 {
			return Err(EvalError::InvalidConfig("sample count must be positive".to_owned()));
		}
		if self.workers == 0 {
			return Err(EvalError::InvalidConfig("worker count must be positive".to_owned()));
		}
		if self.rule_name.trim().is_empty() {
			return Err(EvalError::InvalidConfig("rule name cannot be empty".to_owned()));
		}
		Ok(())
	}

	/// The configured seed, or one taken from the high-resolution clock so
	/// that runs started in quick succession do not share a stream.
	pub fn resolved_seed(&self) -> u64 {
		self.seed.unwrap_or_else(|| {
			SystemTime::now()
				.duration_since(UNIX_EPOCH)
				.map(|d| d.as_nanos() as u64)
				.unwrap_or_default()
		})
	}

	/// Sets the worker count, `0` meaning one per logical CPU.
	pub fn set_workers(&mut self, workers: usize) {
		self.workers = if workers == 0 { num_cpus::get() } else { workers };
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_are_valid() {
		let config = EvaluatorConfig::default();
		assert_eq!(config.sample_count, 10_000);
		assert_eq!(config.log_base, LogBase::Two);
		assert_eq!(config.rule_name, "Default");
		assert!(!config.rebuild_cache);
		assert!(config.validate().is_ok());
	}

	#[test]
	fn zero_samples_and_workers_are_invalid() {
		let config = EvaluatorConfig { sample_count: 0, ..Default::default() };
		assert!(config.validate().is_err());

		let config = EvaluatorConfig { workers: 0, ..Default::default() };
		assert!(config.validate().is_err());
	}

	#[test]
	fn explicit_seed_wins() {
		let config = EvaluatorConfig { seed: Some(12), ..Default::default() };
		assert_eq!(config.resolved_seed(), 12);
	}

	#[test]
	fn zero_workers_means_all_cpus() {
		let mut config = EvaluatorConfig::default();
		config.set_workers(0);
		assert!(config.workers >= 1);
		config.set_workers(3);
		assert_eq!(config.workers, 3);
	}
}
