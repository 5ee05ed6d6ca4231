//! Calibration and batch evaluation against small, fully known grammars.

use std::collections::HashMap;
use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};

use pcfg_eval_core::grammar::{BaseStructure, Grammar, ProductionEntry, RuleSet};
use pcfg_eval_core::model::{GuessNumberEstimator, LogBase, PcfgScorer, ProbabilityOracle, evaluate_batch};
use pcfg_eval_core::EvalError;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn entry(values: &[&str], probability: f64) -> ProductionEntry {
	ProductionEntry::new(values.iter().map(|v| v.to_string()).collect(), probability).unwrap()
}

#[test]
fn single_coin_category_calibrates_to_closed_form() {
	let mut categories = HashMap::new();
	categories.insert("D1".to_owned(), vec![entry(&["0"], 0.5), entry(&["1"], 0.5)]);
	let grammar = Grammar::new("coin", vec![BaseStructure::new(vec!["D1".into()], 1.0).unwrap()], categories);

	let mut estimator = GuessNumberEstimator::new(&grammar, LogBase::Two).unwrap();
	let curve = estimator.calibrate(100, &mut StdRng::seed_from_u64(2024)).unwrap();

	assert_eq!(curve.sorted_log_probabilities().len(), 100);
	assert!(curve.sorted_log_probabilities().iter().all(|lp| *lp == 1.0));

	let step = 1.0 - 100f64.log2();
	for (i, pos) in curve.position_estimates().iter().enumerate() {
		assert!((pos - (i + 1) as f64 * step).abs() < 1e-9);
	}
}

fn write(path: &Path, contents: &str) {
	fs::create_dir_all(path.parent().unwrap()).unwrap();
	fs::write(path, contents).unwrap();
}

/// Rule set with structures `A4D2` and `D2O1` plus an untrainable Markov structure.
fn write_rule_set(rules: &Path) {
	let root = rules.join("Tiny");
	write(&root.join("Grammar/grammar.txt"), "A4D2\t0.6\nM\t0.1\nD2O1\t0.3\n");
	write(&root.join("Alpha/4.txt"), "pass\t0.3\nword\t0.3\nlove\t0.2\n\n");
	write(&root.join("Capitalization/4.txt"), "LLLL\t0.9\nULLL\t0.1\n");
	write(&root.join("Digits/2.txt"), "12\t0.5\n99\t0.25\n00\t0.25\n");
	write(&root.join("Other/1.txt"), "!\t0.7\n.\t0.3\n");
}

#[test]
fn rule_set_loads_groups_and_caches() {
	let dir = tempfile::tempdir().unwrap();
	write_rule_set(dir.path());
	let rule_set = RuleSet::new(dir.path(), "Tiny");

	let grammar = rule_set.load().unwrap();
	assert_eq!(grammar.name(), "Tiny");
	assert_eq!(grammar.base_structures().len(), 3);
	assert_eq!(grammar.base_structures()[0].replacements(), &["A4", "C4", "D2"]);

	// Equal consecutive probabilities form one group
	let alpha = grammar.entries("A4").unwrap();
	assert_eq!(alpha.len(), 2);
	assert_eq!(alpha[0].values(), &["pass", "word"]);
	assert_eq!(grammar.entry_count("D2"), 2);

	let cache = rule_set.cache_file().unwrap();
	assert!(cache.exists());

	let cached = rule_set.load().unwrap();
	assert_eq!(cached.entries("A4"), grammar.entries("A4"));
	assert_eq!(cached.base_structures(), grammar.base_structures());
}

fn age(path: &Path, by: Duration) {
	let file = File::options().write(true).open(path).unwrap();
	file.set_modified(SystemTime::now() - by).unwrap();
}

#[test]
fn edited_rule_file_invalidates_the_cache() {
	let dir = tempfile::tempdir().unwrap();
	write_rule_set(dir.path());
	let rule_set = RuleSet::new(dir.path(), "Tiny");
	rule_set.load().unwrap();

	let cache = rule_set.cache_file().unwrap();
	age(&cache, Duration::from_secs(3600));
	write(&dir.path().join("Tiny/Digits/2.txt"), "12\t0.5\n77\t0.5\n");

	let reloaded = rule_set.load().unwrap();
	let digits = reloaded.entries("D2").unwrap();
	assert_eq!(digits.len(), 1);
	assert_eq!(digits[0].values(), &["12", "77"]);

	// The rewritten cache is fresh again and carries the edit
	let cached = rule_set.load().unwrap();
	assert_eq!(cached.entries("D2"), reloaded.entries("D2"));
}

#[test]
fn unwritable_or_corrupt_cache_does_not_fail_the_load() {
	let dir = tempfile::tempdir().unwrap();
	write_rule_set(dir.path());
	let rule_set = RuleSet::new(dir.path(), "Tiny");
	let cache = rule_set.cache_file().unwrap();

	// A directory in place of the cache file makes every write fail
	fs::create_dir_all(&cache).unwrap();
	let grammar = rule_set.load().unwrap();
	assert_eq!(grammar.base_structures().len(), 3);
	assert!(cache.is_dir());

	fs::remove_dir(&cache).unwrap();
	fs::write(&cache, b"\xff\xff\xff").unwrap();
	let reparsed = rule_set.load().unwrap();
	assert_eq!(reparsed.entries("A4"), grammar.entries("A4"));
}

#[test]
fn malformed_rule_line_is_reported_with_location() {
	let dir = tempfile::tempdir().unwrap();
	write_rule_set(dir.path());
	write(&dir.path().join("Tiny/Digits/2.txt"), "12\t0.5\n99 0.25\n");

	match RuleSet::new(dir.path(), "Tiny").load_uncached() {
		Err(EvalError::InvalidRule { line, .. }) => assert_eq!(line, 2),
		other => panic!("unexpected {other:?}"),
	}
}

#[test]
fn missing_rule_set_is_an_io_error() {
	let dir = tempfile::tempdir().unwrap();
	assert!(matches!(RuleSet::new(dir.path(), "Nope").load(), Err(EvalError::Io { .. })));
}

#[test]
fn batch_with_one_ungrammatical_candidate() {
	let dir = tempfile::tempdir().unwrap();
	write_rule_set(dir.path());
	let grammar = RuleSet::new(dir.path(), "Tiny").load().unwrap();

	let mut estimator = GuessNumberEstimator::new(&grammar, LogBase::Two).unwrap();
	estimator.calibrate_parallel(1_000, 31, 3).unwrap();
	let scorer = PcfgScorer::new(&grammar);

	let report = evaluate_batch(&estimator, &scorer, ["pass12", "hello!!", "99!"]).unwrap();

	assert_eq!(report.successes.len(), 2);
	assert_eq!(report.failures.len(), 1);
	assert_eq!(report.successes[0].candidate, "pass12");
	assert_eq!(report.successes[1].candidate, "99!");
	assert_eq!(report.failures[0].index, 1);
	assert!(matches!(report.failures[0].error, EvalError::UngrammaticalInput { .. }));

	let expected = 0.6 * 0.3 * 0.9 * 0.5;
	assert!((report.successes[0].probability - expected).abs() < 1e-12);
	assert!((scorer.probability_of("pass12").unwrap() - report.successes[0].probability).abs() < 1e-15);
}

#[test]
fn sampled_guesses_are_scored_back_to_their_probability() {
	let dir = tempfile::tempdir().unwrap();
	write_rule_set(dir.path());
	let grammar = RuleSet::new(dir.path(), "Tiny").load().unwrap();

	let estimator = GuessNumberEstimator::new(&grammar, LogBase::Two).unwrap();
	let scorer = PcfgScorer::new(&grammar);
	let mut rng = StdRng::seed_from_u64(5);

	for _ in 0..200 {
		let sample = estimator.sampler().draw(&mut rng).unwrap();
		let guess = sample.render(&grammar, &mut rng).unwrap();
		let p = scorer.probability_of(&guess).unwrap();
		assert!((p - sample.joint_probability()).abs() < 1e-12, "{guess}");
	}
}
