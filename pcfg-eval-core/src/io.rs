use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use std::{env, io};

use crate::error::{EvalError, Result};

/// Reads a text file and returns all its lines as a `Vec<String>`.
///
/// - Reads the entire file into memory
/// - Splits on `\n` / `\r\n`
pub(crate) fn read_file<P: AsRef<Path>>(filename: P) -> Result<Vec<String>> {
	let path = filename.as_ref();
	let mut contents = String::new();
	File::open(path)
		.and_then(|mut file| file.read_to_string(&mut contents))
		.map_err(|e| EvalError::io(format!("reading {}", path.display()), e))?;
	Ok(contents.lines().map(str::to_owned).collect())
}

/// Builds an output path based on an input path and a new extension.
///
/// Example:
/// `Rules/Default/Grammar/grammar.txt` + `"bin"` → `Rules/Default/Grammar/grammar.bin`
pub(crate) fn build_output_path<P: AsRef<Path>>(
	input_path: P,
	output_extension: &str,
) -> Result<PathBuf> {
	let input_path = input_path.as_ref();

	let parent = input_path.parent().unwrap_or_else(|| Path::new("."));
	let file_stem = input_path.file_stem().ok_or_else(|| {
		EvalError::io(
			format!("building output path for {}", input_path.display()),
			io::Error::new(io::ErrorKind::InvalidInput, "Input path has no filename"),
		)
	})?;

	let mut output = PathBuf::from(parent);
	output.push(file_stem);
	output.set_extension(output_extension);

	Ok(output)
}

/// Extracts the base filename without extension.
///
/// Examples:
/// - `"./Digits/3.txt"` → `"3"`
/// - `"1.txt"` → `"1"`
pub(crate) fn get_filename<P: AsRef<Path>>(input_path: P) -> Option<String> {
	input_path
		.as_ref()
		.file_stem()
		.map(|stem| stem.to_string_lossy().to_string())
}

/// Normalize a folder path.
///
/// - `"."` or `"./"` resolves to the current working directory
/// - Other paths are returned as-is (not canonicalized)
pub(crate) fn normalize_folder(input: &Path) -> PathBuf {
	if input == Path::new(".") || input == Path::new("./") {
		env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
	} else {
		input.to_path_buf()
	}
}

/// Lists all files with a given extension in a directory, sorted by name.
///
/// Returns full paths. A missing directory yields an empty list: rule sets
/// are free to omit categories they never trained.
pub(crate) fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
	let dir = dir.as_ref();
	if !dir.is_dir() {
		return Ok(Vec::new());
	}

	let mut files = Vec::new();
	let entries = fs::read_dir(dir).map_err(|e| EvalError::io(format!("listing {}", dir.display()), e))?;
	for entry in entries {
		let path = entry
			.map_err(|e| EvalError::io(format!("listing {}", dir.display()), e))?
			.path();

		if path.is_file() && path.extension() == Some(std::ffi::OsStr::new(extension)) {
			files.push(path);
		}
	}

	files.sort();
	Ok(files)
}

/// Last modification time of `path`, `None` if it cannot be read.
pub(crate) fn modified<P: AsRef<Path>>(path: P) -> Option<SystemTime> {
	fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Creates `dir` and all missing parents.
pub(crate) fn ensure_dir<P: AsRef<Path>>(dir: P) -> Result<()> {
	let dir = dir.as_ref();
	fs::create_dir_all(dir).map_err(|e| EvalError::io(format!("creating {}", dir.display()), e))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn output_path_swaps_extension() {
		let out = build_output_path("Rules/Default/Grammar/grammar.txt", "bin").unwrap();
		assert_eq!(out, PathBuf::from("Rules/Default/Grammar/grammar.bin"));
	}

	#[test]
	fn filename_strips_extension() {
		assert_eq!(get_filename("Digits/3.txt").as_deref(), Some("3"));
		assert_eq!(get_filename("").as_deref(), None);
	}

	#[test]
	fn missing_directory_lists_nothing() {
		let files = list_files("/definitely/not/a/real/dir", "txt").unwrap();
		assert!(files.is_empty());
	}

	#[test]
	fn missing_file_has_no_modification_time() {
		assert!(modified("/definitely/not/a/real/file.txt").is_none());
		let file = tempfile::NamedTempFile::new().unwrap();
		assert!(modified(file.path()).is_some());
	}
}
