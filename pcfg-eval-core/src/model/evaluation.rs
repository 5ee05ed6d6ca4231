use std::io::BufRead;

use log::{debug, warn};

use crate::error::{EvalError, Result};
use super::estimator::{GuessNumberEstimator, RankEstimate};
use super::scorer::ProbabilityOracle;

/// A candidate that received a rank.
#[derive(Clone, Debug, PartialEq)]
pub struct CandidateOutcome {
	/// Position of the candidate in the input.
	pub index: usize,
	pub candidate: String,
	/// `-log(probability)` in the estimator's base.
	pub surprisal: f64,
	/// Linear probability, 0 when it is too small for an `f64`.
	pub probability: f64,
	pub estimate: RankEstimate,
}

/// A candidate the oracle could not score.
#[derive(Debug)]
pub struct CandidateFailure {
	pub index: usize,
	pub candidate: String,
	pub error: EvalError,
}

/// Result of a batch evaluation. Both lists follow input order.
#[derive(Debug, Default)]
pub struct BatchReport {
	pub successes: Vec<CandidateOutcome>,
	pub failures: Vec<CandidateFailure>,
}

impl BatchReport {
	/// Number of candidates the batch looked at.
	pub fn len(&self) -> usize {
		self.successes.len() + self.failures.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Successes whose rank is a calibration boundary.
	pub fn out_of_range_count(&self) -> usize {
		self.successes.iter().filter(|s| s.estimate.is_out_of_range()).count()
	}

	fn fail(&mut self, index: usize, candidate: String, error: EvalError) {
		warn!("#{index}: {error}");
		self.failures.push(CandidateFailure { index, candidate, error });
	}

	fn score<O: ProbabilityOracle + ?Sized>(
		&mut self,
		estimator: &GuessNumberEstimator<'_>,
		oracle: &O,
		index: usize,
		raw: &str,
	) {
		let candidate = raw.trim_end_matches(['\r', '\n']);
		let log_base = estimator.log_base();

		let scored = oracle
			.surprisal_of(candidate, log_base)
			.and_then(|surprisal| estimator.estimate_rank_surprisal(surprisal).map(|estimate| (surprisal, estimate)));

		match scored {
			Ok((surprisal, estimate)) => {
				debug!("#{index} -log(p)={surprisal} rank={}", estimate.rank);
				self.successes.push(CandidateOutcome {
					index,
					candidate: candidate.to_owned(),
					surprisal,
					probability: log_base.probability(surprisal),
					estimate,
				});
			}
			Err(error) => self.fail(index, candidate.to_owned(), error),
		}
	}
}

/// Scores and ranks every candidate, in input order.
///
/// Per-candidate errors (ungrammatical input, an oracle handing back an
/// invalid probability) are recorded in `failures` and the batch goes on.
/// Candidates are neither reordered nor deduplicated; a trailing `\r` or
/// `\n` is stripped. Scoring happens in the surprisal domain, so candidates
/// whose probability underflows an `f64` are still ranked.
///
/// # Errors
/// `NotCalibrated` before any candidate is looked at, if the estimator has no curve.
pub fn evaluate_batch<O, I, S>(estimator: &GuessNumberEstimator<'_>, oracle: &O, candidates: I) -> Result<BatchReport>
where
	O: ProbabilityOracle + ?Sized,
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	if estimator.curve().is_none() {
		return Err(EvalError::NotCalibrated);
	}

	let mut report = BatchReport::default();
	for (index, raw) in candidates.into_iter().enumerate() {
		report.score(estimator, oracle, index, raw.as_ref());
	}

	Ok(report)
}

/// Same as `evaluate_batch`, reading one candidate per line of `reader`.
///
/// Lines are split on `\n` as raw bytes. A line that is not valid UTF-8 is
/// recorded as an `UngrammaticalInput` failure at its index (with a lossy
/// rendering of the bytes) and the following lines are still evaluated.
///
/// # Errors
/// - `NotCalibrated` if the estimator has no curve
/// - `Io` if reading fails
pub fn evaluate_lines<O, R>(estimator: &GuessNumberEstimator<'_>, oracle: &O, reader: R) -> Result<BatchReport>
where
	O: ProbabilityOracle + ?Sized,
	R: BufRead,
{
	if estimator.curve().is_none() {
		return Err(EvalError::NotCalibrated);
	}

	let mut report = BatchReport::default();
	for (index, line) in reader.split(b'\n').enumerate() {
		let bytes = line.map_err(|e| EvalError::io(format!("reading candidate #{index}"), e))?;
		match String::from_utf8(bytes) {
			Ok(candidate) => report.score(estimator, oracle, index, &candidate),
			Err(e) => {
				let lossy = String::from_utf8_lossy(e.as_bytes()).trim_end_matches('\r').to_owned();
				let error = EvalError::ungrammatical(&lossy, format!("not valid UTF-8 ({})", e.utf8_error()));
				report.fail(index, lossy, error);
			}
		}
	}

	Ok(report)
}
