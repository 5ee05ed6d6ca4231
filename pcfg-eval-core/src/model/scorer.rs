use std::collections::HashMap;

use crate::error::{EvalError, Result};
use crate::grammar::{CategoryKind, Grammar};
use super::estimator::LogBase;

/// Anything able to assign a grammar probability to a candidate string.
pub trait ProbabilityOracle {
	/// Probability in (0, 1] of `candidate` under the grammar.
	///
	/// # Errors
	/// `UngrammaticalInput` if the candidate cannot be decomposed.
	fn probability_of(&self, candidate: &str) -> Result<f64>;

	/// `-log(probability)` of `candidate`.
	///
	/// Oracles that multiply many factors should override this and sum the
	/// logs instead, so long candidates do not underflow.
	///
	/// # Errors
	/// Same as `probability_of`, plus `Domain` for a probability outside (0, 1].
	fn surprisal_of(&self, candidate: &str, log_base: LogBase) -> Result<f64> {
		log_base.surprisal(self.probability_of(candidate)?)
	}
}

/// Scores candidates by decomposing them the way the grammar generates.
///
/// The candidate is cut into maximal runs of letters, digits and other
/// characters. A letter run becomes an `A<n>` slot (lower-cased value)
/// followed by its `C<n>` mask, digits become `D<n>` and the rest `O<n>`.
/// The resulting structure must exist as a base structure, and every value
/// must exist in its category.
#[derive(Debug)]
pub struct PcfgScorer {
	/// category tag → value → probability
	terminals: HashMap<String, HashMap<String, f64>>,
	/// structure key (e.g. `A4C4D2`) → prior
	structures: HashMap<String, f64>,
}

impl PcfgScorer {
	/// Indexes the grammar for lookups. Duplicate values keep their first
	/// (most probable, given file order) probability.
	pub fn new(grammar: &Grammar) -> Self {
		let mut terminals: HashMap<String, HashMap<String, f64>> = HashMap::new();
		for (category, entries) in grammar.categories() {
			let values = terminals.entry(category.to_owned()).or_default();
			for entry in entries {
				for value in entry.values() {
					values.entry(value.clone()).or_insert(entry.probability());
				}
			}
		}

		let mut structures = HashMap::new();
		for base in grammar.base_structures().iter().filter(|b| b.is_sampleable()) {
			structures.entry(base.key()).or_insert(base.probability());
		}

		Self { terminals, structures }
	}

	fn terminal(&self, candidate: &str, category: &str, value: &str) -> Result<f64> {
		self.terminals
			.get(category)
			.and_then(|values| values.get(value))
			.copied()
			.ok_or_else(|| EvalError::ungrammatical(candidate, format!("'{value}' is not in {category}")))
	}
}

fn kind_of(c: char) -> CategoryKind {
	if c.is_alphabetic() {
		CategoryKind::Alpha
	} else if c.is_ascii_digit() {
		CategoryKind::Digits
	} else {
		CategoryKind::Other
	}
}

/// Splits `s` into maximal runs of the same `kind_of` class.
fn runs(s: &str) -> Vec<(CategoryKind, &str)> {
	let mut out = Vec::new();
	let mut start = 0;
	let mut current: Option<CategoryKind> = None;

	for (i, c) in s.char_indices() {
		let kind = kind_of(c);
		match current {
			Some(k) if k == kind => {}
			Some(k) => {
				out.push((k, &s[start..i]));
				start = i;
				current = Some(kind);
			}
			None => current = Some(kind),
		}
	}
	if let Some(k) = current {
		out.push((k, &s[start..]));
	}
	out
}

impl PcfgScorer {
	/// Structure prior followed by the probability of every slot.
	fn factors(&self, candidate: &str) -> Result<Vec<f64>> {
		if candidate.is_empty() {
			return Err(EvalError::ungrammatical(candidate, "empty candidate"));
		}

		let mut structure = String::new();
		let mut factors = vec![0.0];

		for (kind, run) in runs(candidate) {
			let len = run.chars().count();
			let tag = kind.tag(len);

			if kind == CategoryKind::Alpha {
				let lower = run.to_lowercase();
				factors.push(self.terminal(candidate, &tag, &lower)?);

				let mask: String = run.chars().map(|c| if c.is_uppercase() { 'U' } else { 'L' }).collect();
				let mask_tag = CategoryKind::Capitalization.tag(len);
				factors.push(self.terminal(candidate, &mask_tag, &mask)?);

				structure.push_str(&tag);
				structure.push_str(&mask_tag);
			} else {
				factors.push(self.terminal(candidate, &tag, run)?);
				structure.push_str(&tag);
			}
		}

		factors[0] = *self
			.structures
			.get(&structure)
			.ok_or_else(|| EvalError::ungrammatical(candidate, format!("no base structure {structure}")))?;

		Ok(factors)
	}
}

impl ProbabilityOracle for PcfgScorer {
	/// # Errors
	/// `Domain(0.0)` when the product underflows; `surprisal_of` does not.
	fn probability_of(&self, candidate: &str) -> Result<f64> {
		let probability = self.factors(candidate)?.iter().product::<f64>();
		if probability == 0.0 {
			return Err(EvalError::Domain(probability));
		}
		Ok(probability)
	}

	fn surprisal_of(&self, candidate: &str, log_base: LogBase) -> Result<f64> {
		let mut total = 0.0;
		for p in self.factors(candidate)? {
			total += log_base.surprisal(p)?;
		}
		Ok(total)
	}
}
