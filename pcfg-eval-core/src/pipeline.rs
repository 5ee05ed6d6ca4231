//! One complete evaluation run: load, calibrate, score, write.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Instant;

use chrono::Local;
use log::info;

use crate::config::EvaluatorConfig;
use crate::error::{EvalError, Result};
use crate::grammar::RuleSet;
use crate::model::{BatchReport, GuessNumberEstimator, PcfgScorer, evaluate_lines};
use crate::report::{ReportWriter, RunSummary, WrittenFiles};

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunOutcome {
	pub report: BatchReport,
	pub summary: RunSummary,
	pub files: WrittenFiles,
}

/// Evaluates every line of `input` against the configured rule set.
///
/// The grammar is loaded and the estimator calibrated before the input is
/// read, and nothing is created under `config.output_dir` until all
/// candidates are scored. A run that fails early leaves the output
/// directory untouched.
///
/// # Errors
/// - `InvalidConfig` if `config` does not validate
/// - Any rule-set loading or calibration error (`Io`, `InvalidRule`, `EmptyGrammar`, ...)
/// - `Io` if the input cannot be read or the results cannot be written
pub fn run_evaluation(config: &EvaluatorConfig, input: &Path) -> Result<RunOutcome> {
	config.validate()?;

	info!("loading rule set '{}'", config.rule_name);
	let rule_set = RuleSet::new(&config.rules_dir, &config.rule_name);
	let grammar = if config.rebuild_cache {
		rule_set.load_uncached()?
	} else {
		rule_set.load()?
	};

	let seed = config.resolved_seed();
	let mut estimator = GuessNumberEstimator::new(&grammar, config.log_base)?;
	estimator.calibrate_parallel(config.sample_count, seed, config.workers)?;

	let file = File::open(input).map_err(|e| EvalError::io(format!("opening input {}", input.display()), e))?;
	let started = Local::now();
	let clock = Instant::now();

	let scorer = PcfgScorer::new(&grammar);
	let report = evaluate_lines(&estimator, &scorer, BufReader::new(file))?;

	let summary = RunSummary {
		label: config.label.clone(),
		rule_name: config.rule_name.clone(),
		input_path: input.to_path_buf(),
		candidate_count: report.len(),
		failure_count: report.failures.len(),
		sample_count: config.sample_count,
		log_base: config.log_base,
		seed,
		started,
		elapsed: clock.elapsed(),
	};

	let files = ReportWriter::new(&config.output_dir, &config.label, started).write(&report, &summary)?;

	Ok(RunOutcome { report, summary, files })
}
