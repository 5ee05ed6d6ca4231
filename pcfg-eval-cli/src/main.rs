use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};

use pcfg_eval_core::model::LogBase;
use pcfg_eval_core::{EvaluatorConfig, run_evaluation};

const NAME: &str = "PCFG guess-number evaluator";

/// Estimates how many guesses a PCFG attacker needs for each input password,
/// using Monte Carlo sampling of the grammar.
#[derive(Parser, Debug)]
#[command(name = "pcfg-eval")]
#[command(version)]
#[command(about = "Evaluate the guessing performance of a PCFG rule set by Monte Carlo estimation")]
struct Cli {
	/// Newline separated file of passwords to evaluate
	#[arg(short, long, value_name = "INPUT_FILENAME")]
	input: PathBuf,

	/// Rule set to use
	#[arg(short, long = "rule", value_name = "RULESET_NAME", default_value = "Default")]
	rule: String,

	/// Directory holding the rule sets
	#[arg(long, default_value = "Rules")]
	rules_dir: PathBuf,

	/// Number of random samples used for calibration
	#[arg(short = 'n', long = "samples-num", default_value_t = 10_000)]
	samples_num: usize,

	/// Logarithm base of the surprisal domain (2 or 10)
	#[arg(long, default_value_t = 2)]
	log_base: u32,

	/// Directory the results are written to
	#[arg(short, long, default_value = "Evaluation_Result")]
	output: PathBuf,

	/// Label identifying the evaluation (sub-directory of the output)
	#[arg(short, long, default_value = "")]
	label: String,

	/// Calibration seed (defaults to the clock)
	#[arg(long)]
	seed: Option<u64>,

	/// Calibration threads, 0 for one per CPU
	#[arg(short, long, default_value_t = 1)]
	workers: usize,

	/// Reparse the rule set text files instead of trusting the grammar cache
	#[arg(long)]
	rebuild_cache: bool,

	/// Debug logging
	#[arg(short, long)]
	verbose: bool,
}

impl Cli {
	fn into_config(self) -> Result<(EvaluatorConfig, PathBuf)> {
		let mut config = EvaluatorConfig {
			rule_name: self.rule,
			rules_dir: self.rules_dir,
			sample_count: self.samples_num,
			log_base: LogBase::try_from(self.log_base)?,
			label: self.label,
			output_dir: self.output,
			seed: self.seed,
			workers: 1,
			rebuild_cache: self.rebuild_cache,
		};
		config.set_workers(self.workers);
		config.validate()?;
		Ok((config, self.input))
	}
}

fn setup_logging(verbose: bool) {
	let level = if verbose { "debug" } else { "info" };
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
		.format_target(false)
		.init();
}

fn print_banner(config: &EvaluatorConfig) {
	println!();
	println!("[ {NAME} ]");
	println!();
	println!("Version: {}", env!("CARGO_PKG_VERSION"));
	println!("Sample size: {}", config.sample_count);
	println!("RuleSet: {}", config.rule_name);
	println!();
}

fn run(config: EvaluatorConfig, input: PathBuf) -> Result<()> {
	print_banner(&config);

	let outcome = run_evaluation(&config, &input)
		.with_context(|| format!("evaluating {} with rule set '{}'", input.display(), config.rule_name))?;
	let report = &outcome.report;

	info!(
		"{} candidates evaluated, {} ranked, {} at the calibration boundary",
		report.len(),
		report.successes.len(),
		report.out_of_range_count()
	);
	if let Some(failures) = &outcome.files.failures {
		warn!("{} candidates could not be scored, see {}", report.failures.len(), failures.display());
	}

	Ok(())
}

fn main() -> ExitCode {
	let cli = Cli::parse();
	setup_logging(cli.verbose);

	let outcome = cli.into_config().and_then(|(config, input)| run(config, input));
	match outcome {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			error!("{e:#}");
			ExitCode::FAILURE
		}
	}
}
