use rand::Rng;
use rand::seq::IndexedRandom;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use super::category::is_markov;

/// Checks that `probability` lies in (0, 1].
pub(crate) fn check_probability(probability: f64) -> Result<f64> {
	if probability > 0.0 && probability <= 1.0 {
		Ok(probability)
	} else {
		Err(EvalError::Domain(probability))
	}
}

/// One terminal group of a category.
///
/// All `values` share the same `probability`: the grammar stores terminals
/// grouped by probability, and a group is what a parse tree points at.
///
/// ## Invariants
/// - `values` is never empty
/// - `probability` is in (0, 1]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProductionEntry {
	/// Concrete realizations (literal substrings, or masks for `C` categories).
	values: Vec<String>,
	/// Probability of each single value of the group.
	probability: f64,
}

impl ProductionEntry {
	/// Creates a group from its values and shared probability.
	///
	/// # Errors
	/// - `Domain` if the probability is outside (0, 1]
	/// - `InvalidConfig` if `values` is empty
	pub fn new(values: Vec<String>, probability: f64) -> Result<Self> {
		if values.is_empty() {
			return Err(EvalError::InvalidConfig("production entry without values".to_owned()));
		}
		Ok(Self { values, probability: check_probability(probability)? })
	}

	pub fn values(&self) -> &[String] {
		&self.values
	}

	pub fn probability(&self) -> f64 {
		self.probability
	}

	pub(crate) fn push_value(&mut self, value: String) {
		self.values.push(value);
	}

	/// Picks one concrete value of the group uniformly at random.
	pub fn pick_value<R: Rng>(&self, rng: &mut R) -> &str {
		// `values` is never empty, see invariants
		self.values.choose(rng).map(String::as_str).unwrap_or_default()
	}
}

/// A complete generation skeleton: an ordered list of category tags plus
/// the prior probability of the skeleton itself.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BaseStructure {
	probability: f64,
	replacements: Vec<String>,
}

impl BaseStructure {
	/// # Errors
	/// - `Domain` if the probability is outside (0, 1]
	/// - `InvalidConfig` if the skeleton has no slot
	pub fn new(replacements: Vec<String>, probability: f64) -> Result<Self> {
		if replacements.is_empty() {
			return Err(EvalError::InvalidConfig("base structure without categories".to_owned()));
		}
		Ok(Self { probability: check_probability(probability)?, replacements })
	}

	pub fn probability(&self) -> f64 {
		self.probability
	}

	pub fn replacements(&self) -> &[String] {
		&self.replacements
	}

	/// Whether this skeleton can be sampled, i.e. has no Markov slot.
	pub fn is_sampleable(&self) -> bool {
		!self.replacements.iter().any(|tag| is_markov(tag))
	}

	/// Concatenated structure string, e.g. `A4C4D3`.
	pub fn key(&self) -> String {
		self.replacements.concat()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	#[test]
	fn rejects_probabilities_outside_unit_interval() {
		assert!(matches!(ProductionEntry::new(vec!["1".into()], 0.0), Err(EvalError::Domain(_))));
		assert!(matches!(ProductionEntry::new(vec!["1".into()], 1.5), Err(EvalError::Domain(_))));
		assert!(ProductionEntry::new(vec!["1".into()], 1.0).is_ok());
	}

	#[test]
	fn empty_groups_are_refused() {
		assert!(ProductionEntry::new(Vec::new(), 0.5).is_err());
		assert!(BaseStructure::new(Vec::new(), 0.5).is_err());
	}

	#[test]
	fn pick_value_stays_in_group() {
		let entry = ProductionEntry::new(vec!["12".into(), "34".into()], 0.1).unwrap();
		let mut rng = StdRng::seed_from_u64(7);
		for _ in 0..20 {
			assert!(entry.values().iter().any(|v| v == entry.pick_value(&mut rng)));
		}
	}

	#[test]
	fn markov_structures_are_not_sampleable() {
		let plain = BaseStructure::new(vec!["D3".into()], 0.5).unwrap();
		let markov = BaseStructure::new(vec!["M".into()], 0.5).unwrap();
		assert!(plain.is_sampleable());
		assert!(!markov.is_sampleable());
		assert_eq!(plain.key(), "D3");
	}
}
