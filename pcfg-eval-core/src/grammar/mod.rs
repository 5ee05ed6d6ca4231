//! Read-only probability grammar.
//!
//! A grammar is a set of base structures (ordered skeletons of category tags,
//! each with a prior) and, for every category tag, an ordered list of
//! production entries. The evaluator only ever reads it.

/// Category tags and base-structure string parsing.
pub mod category;

/// Production entries and base structures.
pub mod production;

/// On-disk rule sets and their binary cache.
pub mod rule_set;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use category::CategoryKind;
pub use production::{BaseStructure, ProductionEntry};
pub use rule_set::RuleSet;

/// A trained probability grammar.
///
/// # Invariants
/// - Entry order within a category never changes after construction, so an
///   entry index is a stable identifier.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Grammar {
	name: String,
	base_structures: Vec<BaseStructure>,
	categories: HashMap<String, Vec<ProductionEntry>>,
}

impl Grammar {
	pub fn new(
		name: impl Into<String>,
		base_structures: Vec<BaseStructure>,
		categories: HashMap<String, Vec<ProductionEntry>>,
	) -> Self {
		Self { name: name.into(), base_structures, categories }
	}

	/// Rule-set identifier this grammar was loaded from.
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn base_structures(&self) -> &[BaseStructure] {
		&self.base_structures
	}

	/// Production entries of `category`, or `None` if the grammar never saw it.
	pub fn entries(&self, category: &str) -> Option<&[ProductionEntry]> {
		self.categories.get(category).map(Vec::as_slice)
	}

	/// Number of production entries of `category` (0 when unknown).
	pub fn entry_count(&self, category: &str) -> usize {
		self.categories.get(category).map_or(0, Vec::len)
	}

	/// Iterates over every category tag and its entries, in no particular order.
	pub fn categories(&self) -> impl Iterator<Item = (&str, &[ProductionEntry])> {
		self.categories.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unknown_categories_have_no_entries() {
		let mut categories = HashMap::new();
		categories.insert(
			"D1".to_owned(),
			vec![ProductionEntry::new(vec!["1".into()], 0.6).unwrap(), ProductionEntry::new(vec!["2".into()], 0.4).unwrap()],
		);
		let grammar = Grammar::new("t", vec![BaseStructure::new(vec!["D1".into()], 1.0).unwrap()], categories);

		assert_eq!(grammar.entry_count("D1"), 2);
		assert_eq!(grammar.entry_count("D2"), 0);
		assert!(grammar.entries("D2").is_none());
		assert_eq!(grammar.name(), "t");
	}
}
