use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::error::{EvalError, Result};
use crate::io::{build_output_path, get_filename, list_files, modified, normalize_folder, read_file};
use super::category::{CategoryKind, split_structure};
use super::production::{BaseStructure, ProductionEntry};
use super::Grammar;

/// Location of a trained rule set on disk.
///
/// Layout (relative to `<rules_dir>/<rule_name>`):
/// - `Grammar/grammar.txt`: `structure<TAB>probability` per line
/// - `<Kind>/<length>.txt`: `value<TAB>probability` per line, for every
///   terminal kind (`Alpha`, `Digits`, `Capitalization`, ...)
/// - `Grammar/grammar.bin`: `postcard` cache written after a text load, and
///   only trusted while it is newer than every text file
#[derive(Clone, Debug)]
pub struct RuleSet {
	name: String,
	root: PathBuf,
}

impl RuleSet {
	/// Resolves `<rules_dir>/<rule_name>` without touching the disk.
	pub fn new<P: AsRef<Path>>(rules_dir: P, rule_name: &str) -> Self {
		Self {
			name: rule_name.to_owned(),
			root: normalize_folder(rules_dir.as_ref()).join(rule_name),
		}
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	fn structure_file(&self) -> PathBuf {
		self.root.join("Grammar").join("grammar.txt")
	}

	/// Path of the binary cache next to `grammar.txt`.
	pub fn cache_file(&self) -> Result<PathBuf> {
		build_output_path(self.structure_file(), "bin")
	}

	/// Text files the grammar is parsed from: `grammar.txt` then every
	/// terminal file.
	fn source_files(&self) -> Result<Vec<PathBuf>> {
		let mut files = vec![self.structure_file()];
		for kind in CategoryKind::TERMINALS {
			if let Some(dir) = kind.directory() {
				files.extend(list_files(self.root.join(dir), "txt")?);
			}
		}
		Ok(files)
	}

	/// Whether the cache was written after the last change to any text file.
	///
	/// Text files that do not exist are skipped.
	fn cache_is_fresh(&self, cache: &Path) -> Result<bool> {
		let Some(written) = modified(cache) else {
			return Ok(false);
		};
		for source in self.source_files()? {
			if modified(&source).is_some_and(|changed| changed > written) {
				debug!("{} changed after the cache was written", source.display());
				return Ok(false);
			}
		}
		Ok(true)
	}

	fn read_cache(&self, cache: &Path) -> Result<Grammar> {
		let bytes = std::fs::read(cache).map_err(|e| EvalError::io(format!("reading {}", cache.display()), e))?;
		Ok(postcard::from_bytes(&bytes)?)
	}

	/// Loads the grammar from the binary cache when it is up to date,
	/// otherwise from the text files (and then rewrites the cache).
	///
	/// A cache that is older than a text file, or cannot be decoded, is
	/// ignored.
	///
	/// # Errors
	/// - `Io` if the rule set directory or a file cannot be read
	/// - `InvalidRule` / `Domain` on malformed content
	pub fn load(&self) -> Result<Grammar> {
		let cache = self.cache_file()?;
		if cache.is_file() {
			if self.cache_is_fresh(&cache)? {
				debug!("reading grammar cache {}", cache.display());
				match self.read_cache(&cache) {
					Ok(grammar) => {
						info!("loaded rule set '{}' from cache", self.name);
						return Ok(grammar);
					}
					Err(e) => warn!("ignoring unreadable grammar cache: {e}"),
				}
			} else {
				info!("grammar cache of '{}' is stale, reparsing", self.name);
			}
		}
		self.load_uncached()
	}

	/// Parses the text files, ignoring any cache, then refreshes the cache.
	///
	/// Failing to write the cache is logged and does not fail the load.
	pub fn load_uncached(&self) -> Result<Grammar> {
		if !self.root.is_dir() {
			return Err(EvalError::io(
				format!("opening rule set '{}'", self.name),
				std::io::Error::new(
					std::io::ErrorKind::NotFound,
					format!("{} is not a directory", self.root.display()),
				),
			));
		}

		let base_structures = self.read_base_structures()?;
		let mut categories = HashMap::new();
		for kind in CategoryKind::TERMINALS {
			if let Some(dir) = kind.directory() {
				self.read_terminals(kind, &self.root.join(dir), &mut categories)?;
			}
		}

		info!(
			"loaded rule set '{}': {} base structures, {} categories",
			self.name,
			base_structures.len(),
			categories.len()
		);

		let grammar = Grammar::new(self.name.clone(), base_structures, categories);

		match self.write_cache(&grammar) {
			Ok(cache) => debug!("wrote grammar cache {}", cache.display()),
			Err(e) => warn!("grammar cache not written: {e}"),
		}

		Ok(grammar)
	}

	fn write_cache(&self, grammar: &Grammar) -> Result<PathBuf> {
		let cache = self.cache_file()?;
		let bytes = postcard::to_stdvec(grammar)?;
		std::fs::write(&cache, bytes).map_err(|e| EvalError::io(format!("writing {}", cache.display()), e))?;
		Ok(cache)
	}

	fn read_base_structures(&self) -> Result<Vec<BaseStructure>> {
		let path = self.structure_file();
		let mut structures = Vec::new();

		for (number, line) in read_file(&path)?.iter().enumerate() {
			let Some((structure, probability)) = parse_line(&path, number + 1, line)? else {
				continue;
			};
			let tags = split_structure(&structure).map_err(|reason| EvalError::InvalidRule {
				path: path.clone(),
				line: number + 1,
				reason,
			})?;
			structures.push(BaseStructure::new(tags, probability)?);
		}

		Ok(structures)
	}

	/// Reads every `<length>.txt` of one terminal directory into `categories`.
	///
	/// Consecutive lines sharing the same probability become one group.
	fn read_terminals(
		&self,
		kind: CategoryKind,
		dir: &Path,
		categories: &mut HashMap<String, Vec<ProductionEntry>>,
	) -> Result<()> {
		for path in list_files(dir, "txt")? {
			let len = get_filename(&path)
				.and_then(|stem| stem.parse::<usize>().ok())
				.ok_or_else(|| EvalError::InvalidRule {
					path: path.clone(),
					line: 0,
					reason: "terminal file name must be a length".to_owned(),
				})?;

			let mut entries: Vec<ProductionEntry> = Vec::new();
			for (number, line) in read_file(&path)?.iter().enumerate() {
				let Some((value, probability)) = parse_line(&path, number + 1, line)? else {
					continue;
				};
				match entries.last_mut() {
					Some(last) if last.probability() == probability => last.push_value(value),
					_ => entries.push(ProductionEntry::new(vec![value], probability)?),
				}
			}

			if !entries.is_empty() {
				debug!("{}: {} groups", kind.tag(len), entries.len());
				categories.insert(kind.tag(len), entries);
			}
		}
		Ok(())
	}
}

/// Parses a `value<TAB>probability` line.
///
/// Returns `Ok(None)` for blank lines. Only the last tab separates the
/// probability, so values may themselves contain tabs.
fn parse_line(path: &Path, line: usize, raw: &str) -> Result<Option<(String, f64)>> {
	let raw = raw.trim_end_matches(['\r', '\n']);
	if raw.trim().is_empty() {
		return Ok(None);
	}

	let invalid = |reason: String| EvalError::InvalidRule { path: path.to_path_buf(), line, reason };

	let (value, probability) = raw
		.rsplit_once('\t')
		.ok_or_else(|| invalid("expected 'value<TAB>probability'".to_owned()))?;
	let probability: f64 = probability
		.trim()
		.parse()
		.map_err(|_| invalid(format!("'{probability}' is not a number")))?;

	Ok(Some((value.to_owned(), probability)))
}
