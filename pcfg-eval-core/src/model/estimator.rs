use std::fmt;
use std::sync::mpsc;
use std::thread;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{EvalError, Result};
use crate::grammar::Grammar;
use super::sampler::GrammarSampler;

/// Logarithm base of the surprisal domain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogBase {
	#[default]
	Two,
	Ten,
}

impl LogBase {
	pub fn log(self, x: f64) -> f64 {
		match self {
			Self::Two => x.log2(),
			Self::Ten => x.log10(),
		}
	}

	/// `-log(p)` for a probability in (0, 1].
	///
	/// # Errors
	/// `Domain` if `p` is outside (0, 1].
	pub fn surprisal(self, p: f64) -> Result<f64> {
		if !(p > 0.0 && p <= 1.0) {
			return Err(EvalError::Domain(p));
		}
		// `+ 0.0` turns the -0.0 of p == 1 into 0.0
		Ok(-self.log(p) + 0.0)
	}

	/// Inverse of `surprisal`; underflows to 0 for very rare values.
	pub fn probability(self, surprisal: f64) -> f64 {
		match self {
			Self::Two => (-surprisal).exp2(),
			Self::Ten => 10f64.powf(-surprisal),
		}
	}

	pub fn value(self) -> u32 {
		match self {
			Self::Two => 2,
			Self::Ten => 10,
		}
	}
}

impl TryFrom<u32> for LogBase {
	type Error = EvalError;

	fn try_from(value: u32) -> Result<Self> {
		match value {
			2 => Ok(Self::Two),
			10 => Ok(Self::Ten),
			other => Err(EvalError::InvalidConfig(format!("log base must be 2 or 10, got {other}"))),
		}
	}
}

impl fmt::Display for LogBase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.value())
	}
}

/// Probability → rank mapping built from one calibration run.
///
/// ## Invariants
/// - `sorted_log_probabilities.len() == position_estimates.len() == sample_count`
/// - `sorted_log_probabilities` is non-increasing: index 0 holds the rarest sample
/// - `position_estimates[i] = Σ_{j<=i} (sorted_log_probabilities[j] - log(sample_count))`
#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationCurve {
	sample_count: usize,
	log_base: LogBase,
	sorted_log_probabilities: Vec<f64>,
	position_estimates: Vec<f64>,
}

impl CalibrationCurve {
	/// Builds the curve from raw sample probabilities.
	///
	/// # Errors
	/// - `InvalidConfig` if `probabilities` is empty
	/// - `Domain` if any probability is outside (0, 1]
	pub fn from_probabilities(probabilities: &[f64], log_base: LogBase) -> Result<Self> {
		let surprisals = probabilities
			.iter()
			.map(|p| log_base.surprisal(*p))
			.collect::<Result<Vec<f64>>>()?;
		Self::from_surprisals(surprisals, log_base)
	}

	/// Builds the curve from per-sample surprisals `-log(p)` in `log_base`.
	///
	/// This is the single serialized aggregation step of a calibration:
	/// sort, then cumulative sum.
	///
	/// # Errors
	/// - `InvalidConfig` if `surprisals` is empty
	/// - `Domain` if a surprisal is negative or not finite
	pub fn from_surprisals(mut surprisals: Vec<f64>, log_base: LogBase) -> Result<Self> {
		if surprisals.is_empty() {
			return Err(EvalError::InvalidConfig("sample count must be positive".to_owned()));
		}
		if let Some(bad) = surprisals.iter().find(|lp| !(lp.is_finite() && **lp >= 0.0)) {
			return Err(EvalError::Domain(log_base.probability(*bad)));
		}

		surprisals.sort_by(|a, b| b.total_cmp(a));
		let sorted_log_probabilities = surprisals;

		let sample_count = sorted_log_probabilities.len();
		let log_n = log_base.log(sample_count as f64);

		let position_estimates = sorted_log_probabilities
			.iter()
			.scan(0.0, |acc, lp| {
				*acc += lp - log_n;
				Some(*acc)
			})
			.collect();

		Ok(Self { sample_count, log_base, sorted_log_probabilities, position_estimates })
	}

	pub fn sample_count(&self) -> usize {
		self.sample_count
	}

	pub fn log_base(&self) -> LogBase {
		self.log_base
	}

	pub fn sorted_log_probabilities(&self) -> &[f64] {
		&self.sorted_log_probabilities
	}

	pub fn position_estimates(&self) -> &[f64] {
		&self.position_estimates
	}

	/// Maps a surprisal value onto the curve.
	///
	/// In-range values are interpolated linearly between the two bracketing
	/// samples; an exact hit returns the last sample among equal values.
	pub fn locate(&self, log_probability: f64) -> RankEstimate {
		let s = &self.sorted_log_probabilities;
		let pos = &self.position_estimates;
		let last = s.len() - 1;

		if log_probability > s[0] {
			return RankEstimate::boundary(pos[0], OutOfCalibrationRange::RarerThanSamples);
		}
		if log_probability < s[last] {
			return RankEstimate::boundary(pos[last], OutOfCalibrationRange::LikelierThanSamples);
		}

		// s[0] >= log_probability, so at least one element qualifies
		let j = s.partition_point(|&x| x >= log_probability) - 1;
		if s[j] == log_probability || j == last {
			return RankEstimate::within(pos[j]);
		}

		let t = (s[j] - log_probability) / (s[j] - s[j + 1]);
		RankEstimate::within(pos[j] + t * (pos[j + 1] - pos[j]))
	}
}

/// Side of the calibration range a query fell off.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutOfCalibrationRange {
	/// Less probable than every sample.
	RarerThanSamples,
	/// More probable than every sample.
	LikelierThanSamples,
}

impl fmt::Display for OutOfCalibrationRange {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::RarerThanSamples => write!(f, "rarer than every calibration sample"),
			Self::LikelierThanSamples => write!(f, "likelier than every calibration sample"),
		}
	}
}

/// Estimated rank of one probability.
///
/// The rank is an expectation, hence a real number.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RankEstimate {
	pub rank: f64,
	/// Set when the rank is the curve's boundary value rather than a bracketed estimate.
	pub out_of_range: Option<OutOfCalibrationRange>,
}

impl RankEstimate {
	fn within(rank: f64) -> Self {
		Self { rank, out_of_range: None }
	}

	fn boundary(rank: f64, side: OutOfCalibrationRange) -> Self {
		Self { rank, out_of_range: Some(side) }
	}

	pub fn is_out_of_range(&self) -> bool {
		self.out_of_range.is_some()
	}
}

/// Monte Carlo guess-number estimator.
///
/// # Responsibilities
/// - Calibrate: draw samples through a `GrammarSampler` and build a `CalibrationCurve`
/// - Answer rank queries for arbitrary probabilities against that curve
///
/// Re-calibrating replaces the curve; old and new samples are never mixed.
#[derive(Debug)]
pub struct GuessNumberEstimator<'g> {
	sampler: GrammarSampler<'g>,
	log_base: LogBase,
	curve: Option<CalibrationCurve>,
}

impl<'g> GuessNumberEstimator<'g> {
	/// # Errors
	/// Same as `GrammarSampler::new`.
	pub fn new(grammar: &'g Grammar, log_base: LogBase) -> Result<Self> {
		Ok(Self { sampler: GrammarSampler::new(grammar)?, log_base, curve: None })
	}

	pub fn log_base(&self) -> LogBase {
		self.log_base
	}

	pub fn sampler(&self) -> &GrammarSampler<'g> {
		&self.sampler
	}

	/// The current curve, `None` until the first calibration.
	pub fn curve(&self) -> Option<&CalibrationCurve> {
		self.curve.as_ref()
	}

	/// Draws `sample_count` samples from `rng` and rebuilds the curve.
	///
	/// The curve is only replaced once every draw succeeded.
	pub fn calibrate<R: Rng>(&mut self, sample_count: usize, rng: &mut R) -> Result<&CalibrationCurve> {
		if sample_count == 0 {
			return Err(EvalError::InvalidConfig("sample count must be positive".to_owned()));
		}

		info!("calibrating with {sample_count} samples (log base {})", self.log_base);
		let mut surprisals = Vec::with_capacity(sample_count);
		for _ in 0..sample_count {
			surprisals.push(self.sampler.draw(rng)?.surprisal(self.log_base)?);
		}

		self.install(surprisals)
	}

	/// Same as `calibrate`, with draws split over `workers` threads.
	///
	/// Each worker owns a `StdRng` seeded from a master generator seeded with
	/// `seed`. Worker results are concatenated in worker order before the
	/// single sort + cumulative sum, so a fixed `(seed, workers)` pair always
	/// yields the same curve.
	pub fn calibrate_parallel(&mut self, sample_count: usize, seed: u64, workers: usize) -> Result<&CalibrationCurve> {
		if sample_count == 0 {
			return Err(EvalError::InvalidConfig("sample count must be positive".to_owned()));
		}
		if workers == 0 {
			return Err(EvalError::InvalidConfig("worker count must be positive".to_owned()));
		}

		let workers = workers.min(sample_count);
		info!("calibrating with {sample_count} samples on {workers} workers (log base {})", self.log_base);

		let mut master = StdRng::seed_from_u64(seed);
		let jobs: Vec<(usize, usize, u64)> = (0..workers)
			.map(|w| {
				let share = sample_count / workers + usize::from(w < sample_count % workers);
				(w, share, master.random::<u64>())
			})
			.collect();

		let sampler = &self.sampler;
		let log_base = self.log_base;
		let (tx, rx) = mpsc::channel();
		thread::scope(|scope| {
			for (worker, share, worker_seed) in jobs {
				let tx = tx.clone();
				scope.spawn(move || {
					let mut rng = StdRng::seed_from_u64(worker_seed);
					let drawn = (0..share)
						.map(|_| sampler.draw(&mut rng).and_then(|s| s.surprisal(log_base)))
						.collect::<Result<Vec<f64>>>();
					// The receiver outlives the scope
					let _ = tx.send((worker, drawn));
				});
			}
		});
		drop(tx);

		let mut partials: Vec<(usize, Result<Vec<f64>>)> = rx.iter().collect();
		partials.sort_by_key(|(worker, _)| *worker);

		let mut surprisals = Vec::with_capacity(sample_count);
		for (worker, drawn) in partials {
			let drawn = drawn?;
			debug!("worker {worker} drew {} samples", drawn.len());
			surprisals.extend(drawn);
		}

		self.install(surprisals)
	}

	fn install(&mut self, surprisals: Vec<f64>) -> Result<&CalibrationCurve> {
		let curve = CalibrationCurve::from_surprisals(surprisals, self.log_base)?;
		debug!(
			"curve surprisal range [{}, {}]",
			curve.sorted_log_probabilities[curve.sample_count - 1],
			curve.sorted_log_probabilities[0]
		);
		Ok(&*self.curve.insert(curve))
	}

	/// Estimates the rank of a string with the given probability.
	///
	/// # Errors
	/// - `NotCalibrated` if `calibrate` never ran
	/// - `Domain` if the probability is outside (0, 1]
	pub fn estimate_rank(&self, probability: f64) -> Result<RankEstimate> {
		self.curve.as_ref().ok_or(EvalError::NotCalibrated)?;
		self.estimate_rank_surprisal(self.log_base.surprisal(probability)?)
	}

	/// Same as `estimate_rank` for a value already in the surprisal domain,
	/// so probabilities too small for an `f64` can still be ranked.
	///
	/// # Errors
	/// - `NotCalibrated` if `calibrate` never ran
	/// - `Domain` if the surprisal is negative or not finite
	pub fn estimate_rank_surprisal(&self, surprisal: f64) -> Result<RankEstimate> {
		let curve = self.curve.as_ref().ok_or(EvalError::NotCalibrated)?;
		if !(surprisal.is_finite() && surprisal >= 0.0) {
			return Err(EvalError::Domain(self.log_base.probability(surprisal)));
		}
		let estimate = curve.locate(surprisal);
		if let Some(side) = estimate.out_of_range {
			warn!("surprisal {surprisal} is {side}; reporting boundary rank {}", estimate.rank);
		}
		Ok(estimate)
	}
}
