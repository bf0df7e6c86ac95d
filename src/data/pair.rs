//! Task pairing
//!
//! A task exists when a file with the same basename appears in both language
//! trees. Names compare case-sensitively with the language suffix stripped.

use std::collections::BTreeSet;
use std::path::Path;

use crate::{Error, Result};

/// Regular files in `dir` whose name ends in `.{extension}`, sorted
///
/// # Errors
///
/// Returns [`Error::Data`] if `dir` is not a directory, or an I/O error if it
/// cannot be read
pub fn list_dataset_files(dir: &Path, extension: &str) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Err(Error::Data(format!(
            "dataset path '{}' does not exist or is not a directory",
            dir.display()
        )));
    }
    log::info!("listing .{extension} files in {}", dir.display());

    let suffix = format!(".{extension}");
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.path().is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if name.len() > suffix.len() && name.ends_with(&suffix) {
                files.push(name.to_string());
            }
        }
    }
    files.sort();
    Ok(files)
}

/// File names with their final extension removed
#[must_use]
pub fn base_names(files: &[String]) -> BTreeSet<String> {
    files
        .iter()
        .filter_map(|f| Path::new(f).file_stem()?.to_str().map(str::to_string))
        .collect()
}

/// Task identifiers present in both sets, sorted
#[must_use]
pub fn pair_tasks(a: &BTreeSet<String>, b: &BTreeSet<String>) -> Vec<String> {
    a.intersection(b).cloned().collect()
}

/// List both trees and pair their basenames
///
/// # Errors
///
/// Returns an error if either tree cannot be listed
pub fn discover_tasks(
    dir_a: &Path,
    extension_a: &str,
    dir_b: &Path,
    extension_b: &str,
) -> Result<Vec<String>> {
    let names_a = base_names(&list_dataset_files(dir_a, extension_a)?);
    let names_b = base_names(&list_dataset_files(dir_b, extension_b)?);
    let tasks = pair_tasks(&names_a, &names_b);
    log::info!(
        "{} tasks paired ({} vs {} files)",
        tasks.len(),
        names_a.len(),
        names_b.len()
    );
    Ok(tasks)
}
