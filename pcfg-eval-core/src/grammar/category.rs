/// Class of transformation a category tag stands for.
///
/// A category tag is the kind letter followed by an optional length,
/// e.g. `D3` (three digits) or `C5` (five-character capitalization mask).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CategoryKind {
	Alpha,
	Capitalization,
	Digits,
	Other,
	Keyboard,
	Year,
	Context,
	Email,
	Website,
	/// Markov (statistical language model) continuation. Never sampled here.
	Markov,
}

impl CategoryKind {
	/// All kinds backed by a directory of terminal files in a rule set.
	pub const TERMINALS: [CategoryKind; 9] = [
		CategoryKind::Alpha,
		CategoryKind::Capitalization,
		CategoryKind::Digits,
		CategoryKind::Other,
		CategoryKind::Keyboard,
		CategoryKind::Year,
		CategoryKind::Context,
		CategoryKind::Email,
		CategoryKind::Website,
	];

	pub fn from_letter(letter: char) -> Option<Self> {
		Some(match letter {
			'A' => Self::Alpha,
			'C' => Self::Capitalization,
			'D' => Self::Digits,
			'O' => Self::Other,
			'K' => Self::Keyboard,
			'Y' => Self::Year,
			'X' => Self::Context,
			'E' => Self::Email,
			'W' => Self::Website,
			'M' => Self::Markov,
			_ => return None,
		})
	}

	/// Kind of a full category tag such as `A4`.
	pub fn of_tag(tag: &str) -> Option<Self> {
		tag.chars().next().and_then(Self::from_letter)
	}

	pub fn letter(self) -> char {
		match self {
			Self::Alpha => 'A',
			Self::Capitalization => 'C',
			Self::Digits => 'D',
			Self::Other => 'O',
			Self::Keyboard => 'K',
			Self::Year => 'Y',
			Self::Context => 'X',
			Self::Email => 'E',
			Self::Website => 'W',
			Self::Markov => 'M',
		}
	}

	/// Directory of a rule set holding this kind's `<length>.txt` files.
	pub fn directory(self) -> Option<&'static str> {
		match self {
			Self::Alpha => Some("Alpha"),
			Self::Capitalization => Some("Capitalization"),
			Self::Digits => Some("Digits"),
			Self::Other => Some("Other"),
			Self::Keyboard => Some("Keyboard"),
			Self::Year => Some("Years"),
			Self::Context => Some("Context"),
			Self::Email => Some("Emails"),
			Self::Website => Some("Websites"),
			Self::Markov => None,
		}
	}

	/// Builds the category tag for a run of `len` characters.
	pub fn tag(self, len: usize) -> String {
		format!("{}{}", self.letter(), len)
	}
}

/// Returns `true` if `tag` names the Markov continuation category.
pub fn is_markov(tag: &str) -> bool {
	CategoryKind::of_tag(tag) == Some(CategoryKind::Markov)
}

/// Splits a base-structure string such as `A4D3O1` into its category tags.
///
/// Every alpha slot `A<n>` is followed by its capitalization slot `C<n>`, the
/// mask being applied to the letters produced just before it.
///
/// # Errors
/// Returns a human-readable reason on an unknown kind letter or a missing length.
pub fn split_structure(structure: &str) -> Result<Vec<String>, String> {
	let mut tags = Vec::new();
	let mut chars = structure.chars().peekable();

	while let Some(letter) = chars.next() {
		let kind = CategoryKind::from_letter(letter)
			.ok_or_else(|| format!("unknown category letter '{letter}' in '{structure}'"))?;

		let mut len = String::new();
		while let Some(d) = chars.peek().filter(|c| c.is_ascii_digit()) {
			len.push(*d);
			chars.next();
		}

		if len.is_empty() && kind != CategoryKind::Markov {
			return Err(format!("category '{letter}' without length in '{structure}'"));
		}

		tags.push(format!("{letter}{len}"));
		if kind == CategoryKind::Alpha {
			tags.push(format!("C{len}"));
		}
	}

	if tags.is_empty() {
		return Err("empty base structure".to_owned());
	}
	Ok(tags)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn alpha_slots_get_a_capitalization_slot() {
		let tags = split_structure("A4D3").unwrap();
		assert_eq!(tags, vec!["A4", "C4", "D3"]);
	}

	#[test]
	fn markov_needs_no_length() {
		assert_eq!(split_structure("M").unwrap(), vec!["M"]);
		assert!(is_markov("M"));
		assert!(!is_markov("D1"));
	}

	#[test]
	fn multi_digit_lengths() {
		assert_eq!(split_structure("D12O1").unwrap(), vec!["D12", "O1"]);
	}

	#[test]
	fn rejects_unknown_letter_and_missing_length() {
		assert!(split_structure("Q3").is_err());
		assert!(split_structure("A").is_err());
		assert!(split_structure("").is_err());
	}
}
