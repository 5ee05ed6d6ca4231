//! Result sink.
//!
//! Layout under `<output_dir>/<label>/`:
//! - `evaluation_result_<yymmdd-HHMMSS>.txt`: `probability,rank[,boundary]` per success
//! - `evaluation_failures_<yymmdd-HHMMSS>.txt`: `index<TAB>candidate<TAB>reason`, only when needed
//! - `evaluation_config_<yymmdd>.txt`: appended run summaries
//!
//! Every file is opened in append mode, so two runs sharing a stamp never
//! erase each other's lines.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};
use log::info;

use crate::error::{EvalError, Result};
use crate::io::ensure_dir;
use crate::model::{BatchReport, LogBase};

/// Fields recorded once per run.
#[derive(Clone, Debug)]
pub struct RunSummary {
	pub label: String,
	pub rule_name: String,
	pub input_path: PathBuf,
	pub candidate_count: usize,
	pub failure_count: usize,
	pub sample_count: usize,
	pub log_base: LogBase,
	pub seed: u64,
	pub started: DateTime<Local>,
	pub elapsed: Duration,
}

impl RunSummary {
	fn render(&self) -> String {
		format!(
			"[Label-{}]\nRule_set:{}\nTest_set:{}\nTest_set_size:{}\nFailed:{}\nSampling_num:{}\nLog_base:{}\nSeed:{}\nStart_time:{}\nExecution_time:{}s\n",
			self.label,
			self.rule_name,
			self.input_path.display(),
			self.candidate_count,
			self.failure_count,
			self.sample_count,
			self.log_base,
			self.seed,
			self.started.format("%Y-%m-%d %H:%M:%S"),
			self.elapsed.as_secs(),
		)
	}
}

/// Paths of the files written for one run.
#[derive(Clone, Debug, PartialEq)]
pub struct WrittenFiles {
	pub results: PathBuf,
	pub failures: Option<PathBuf>,
	pub summary: PathBuf,
}

/// Writes evaluation results for one labelled run.
#[derive(Clone, Debug)]
pub struct ReportWriter {
	directory: PathBuf,
	stamp: DateTime<Local>,
}

impl ReportWriter {
	/// Targets `<output_dir>/<label>/`, naming files after `stamp`.
	///
	/// Nothing is created until `write`.
	pub fn new<P: AsRef<Path>>(output_dir: P, label: &str, stamp: DateTime<Local>) -> Self {
		Self { directory: output_dir.as_ref().join(label), stamp }
	}

	pub fn directory(&self) -> &Path {
		&self.directory
	}

	const RUN_STAMP: &'static str = "%y%m%d-%H%M%S";

	fn path(&self, prefix: &str, format: &str) -> PathBuf {
		self.directory.join(format!("{prefix}_{}.txt", self.stamp.format(format)))
	}

	/// Writes the result file, the failure file (if any) and appends the summary.
	///
	/// # Errors
	/// `Io` if the directory or a file cannot be created or written.
	pub fn write(&self, report: &BatchReport, summary: &RunSummary) -> Result<WrittenFiles> {
		ensure_dir(&self.directory)?;

		let results = self.path("evaluation_result", Self::RUN_STAMP);
		write_lines(&results, report.successes.iter().map(|s| {
			match s.estimate.out_of_range {
				Some(_) => format!("{},{},boundary", s.probability, s.estimate.rank),
				None => format!("{},{}", s.probability, s.estimate.rank),
			}
		}))?;

		let failures = if report.failures.is_empty() {
			None
		} else {
			let path = self.path("evaluation_failures", Self::RUN_STAMP);
			write_lines(&path, report.failures.iter().map(|f| format!("{}\t{}\t{}", f.index, f.candidate, f.error)))?;
			Some(path)
		};

		let summary_path = self.path("evaluation_config", "%y%m%d");
		write_lines(&summary_path, std::iter::once(summary.render()))?;

		info!("results written to {}", results.display());
		Ok(WrittenFiles { results, failures, summary: summary_path })
	}
}

/// Appends one line per item to `path`, creating it if needed.
fn write_lines<I: Iterator<Item = String>>(path: &Path, lines: I) -> Result<()> {
	let context = || format!("writing {}", path.display());
	let file = OpenOptions::new()
		.create(true)
		.append(true)
		.open(path)
		.map_err(|e| EvalError::io(context(), e))?;
	let mut out = BufWriter::new(file);
	for line in lines {
		writeln!(out, "{line}").map_err(|e| EvalError::io(context(), e))?;
	}
	out.flush().map_err(|e| EvalError::io(context(), e))
}
