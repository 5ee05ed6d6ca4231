use log::trace;
use rand::Rng;

use crate::error::{EvalError, Result};
use crate::grammar::{CategoryKind, Grammar, ProductionEntry};
use super::estimator::LogBase;

/// One random generation drawn from the grammar.
///
/// Created fresh per draw, never mutated afterwards.
///
/// ## Invariants
/// - `factors == [base_probability, entry probabilities in slot order...]`
/// - `joint_probability == Π factors`, which may underflow to 0 on long skeletons
/// - `surprisal(base) == Σ -log(factor)`, always finite
#[derive(Clone, Debug, PartialEq)]
pub struct ParseTreeSample {
	base_probability: f64,
	/// `(category tag, entry index)` per skeleton slot.
	components: Vec<(String, usize)>,
	factors: Vec<f64>,
	joint_probability: f64,
}

impl ParseTreeSample {
	pub fn base_probability(&self) -> f64 {
		self.base_probability
	}

	pub fn components(&self) -> &[(String, usize)] {
		&self.components
	}

	/// Product of every factor in the linear domain.
	///
	/// Only meaningful for short skeletons: the product reaches 0 once it
	/// drops below the smallest `f64`. Ranking goes through `surprisal`.
	pub fn joint_probability(&self) -> f64 {
		self.joint_probability
	}

	/// `-log(joint probability)`, summed factor by factor so it never underflows.
	///
	/// # Errors
	/// `Domain` if a factor is outside (0, 1].
	pub fn surprisal(&self, log_base: LogBase) -> Result<f64> {
		let mut total = 0.0;
		for p in &self.factors {
			total += log_base.surprisal(*p)?;
		}
		Ok(total)
	}

	/// Produces one concrete guess for this parse tree.
	///
	/// A value is picked at random in every selected group. Capitalization
	/// masks (`U` upper, anything else lower) apply to the last `len`
	/// characters produced so far.
	pub fn render<R: Rng>(&self, grammar: &Grammar, rng: &mut R) -> Result<String> {
		let mut guess: Vec<char> = Vec::new();

		for (category, index) in &self.components {
			let entry = lookup(grammar, category, *index)?;
			let value = entry.pick_value(rng);

			if CategoryKind::of_tag(category) == Some(CategoryKind::Capitalization) {
				let start = guess.len().saturating_sub(value.chars().count());
				for (c, m) in guess[start..].iter_mut().zip(value.chars()) {
					*c = if m == 'U' {
						c.to_uppercase().next().unwrap_or(*c)
					} else {
						c.to_lowercase().next().unwrap_or(*c)
					};
				}
			} else {
				guess.extend(value.chars());
			}
		}

		Ok(guess.into_iter().collect())
	}
}

fn lookup<'g>(grammar: &'g Grammar, category: &str, index: usize) -> Result<&'g ProductionEntry> {
	grammar
		.entries(category)
		.and_then(|entries| entries.get(index))
		.ok_or_else(|| EvalError::EmptyCategory(category.to_owned()))
}

/// Draws random parse trees from a grammar.
///
/// # Sampling discipline
/// - Base structure: reject-and-retry uniform selection. An index is drawn
///   uniformly over *all* base structures and redrawn while the skeleton
///   holds a Markov slot. The prior does not weight the choice; it is only
///   recorded in the sample's probability.
/// - Entries: a category with one entry is selected without consuming
///   randomness, otherwise an index is drawn uniformly. Entry probabilities
///   only feed the joint probability.
#[derive(Debug)]
pub struct GrammarSampler<'g> {
	grammar: &'g Grammar,
}

impl<'g> GrammarSampler<'g> {
	/// Wraps a grammar after checking it can be sampled.
	///
	/// # Errors
	/// - `EmptyGrammar` if no base structure is free of Markov slots
	/// - `EmptyCategory` if an eligible base structure references a category
	///   with no production entry
	pub fn new(grammar: &'g Grammar) -> Result<Self> {
		let mut eligible = grammar.base_structures().iter().filter(|b| b.is_sampleable()).peekable();
		if eligible.peek().is_none() {
			return Err(EvalError::EmptyGrammar);
		}

		for base in eligible {
			if let Some(tag) = base.replacements().iter().find(|tag| grammar.entry_count(tag) == 0) {
				return Err(EvalError::EmptyCategory(tag.clone()));
			}
		}

		Ok(Self { grammar })
	}

	pub fn grammar(&self) -> &'g Grammar {
		self.grammar
	}

	/// Draws one parse tree and records the probability of every part.
	pub fn draw<R: Rng>(&self, rng: &mut R) -> Result<ParseTreeSample> {
		let bases = self.grammar.base_structures();

		// Terminates: `new` guarantees at least one eligible structure
		let base = loop {
			let candidate = &bases[rng.random_range(0..bases.len())];
			if candidate.is_sampleable() {
				break candidate;
			}
		};

		let mut components = Vec::with_capacity(base.replacements().len());
		let mut factors = Vec::with_capacity(base.replacements().len() + 1);
		factors.push(base.probability());

		for category in base.replacements() {
			let count = self.grammar.entry_count(category);
			let index = match count {
				0 => return Err(EvalError::EmptyCategory(category.clone())),
				1 => 0,
				_ => rng.random_range(0..count),
			};
			factors.push(lookup(self.grammar, category, index)?.probability());
			components.push((category.clone(), index));
		}

		let joint_probability = factors.iter().product::<f64>();
		trace!("sampled {:?} p={joint_probability:e}", components);

		Ok(ParseTreeSample { base_probability: base.probability(), components, factors, joint_probability })
	}
}
