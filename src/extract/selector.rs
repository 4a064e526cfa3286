use crate::error::CustomsError;
use crate::extract::ExtractError;
use glob::Pattern;
use log::debug;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

/// Collapses every run of whitespace in a file name to a single space.
pub(crate) fn normalize_name(name: &str) -> String {
    let pattern = Regex::new(r"\s+").expect("Hardcode regex pattern");
    pattern.replace_all(name, " ").into_owned()
}

/// Lists the files of `directory` whose normalized name matches `pattern`.
///
/// # Arguments
/// * `directory` - Folder to scan (not recursive)
/// * `pattern` - Glob pattern applied to the whole normalized file name
/// * `max_file_size` - Largest accepted file size in bytes
///
/// # Returns
/// Matching paths sorted by their original file name
pub(crate) fn select_files(directory: &Path, pattern: &str, max_file_size: u64) -> Result<Vec<PathBuf>, CustomsError> {
    let matcher = Pattern::new(pattern)?;
    let mut files: Vec<(String, PathBuf)> = Vec::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !matcher.matches(&normalize_name(&name)) {
            continue;
        }
        if metadata.len() > max_file_size {
            Err(ExtractError::FileTooLargeError(entry.path().display().to_string(), metadata.len(), max_file_size))?
        }
        files.push((name, entry.path()));
    }
    files.sort_by(|(left, _), (right, _)| left.cmp(right));
    debug!("{} file(s) in {} match '{}'", files.len(), directory.display(), pattern);
    Ok(files.into_iter().map(|(_, path)| path).collect())
}
