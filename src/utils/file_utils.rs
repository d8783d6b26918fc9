//! File system utilities

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::core::models::AppResult;

/// Ensure directory exists
pub fn ensure_dir_exists(path: &Path) -> AppResult<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Absolute form of `path`, resolved against the working directory
pub fn absolute_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Get file extension
pub fn get_file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Paths with their modification times, as taken by [`snapshot_files`]
pub type FileSnapshot = HashMap<PathBuf, Option<SystemTime>>;

/// Regular files directly inside `dir`
pub fn snapshot_files(dir: &Path) -> FileSnapshot {
    let Ok(entries) = fs::read_dir(dir) else {
        return FileSnapshot::new();
    };

    entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            metadata
                .is_file()
                .then(|| (entry.path(), metadata.modified().ok()))
        })
        .collect()
}

/// Whether `path` has one of `extensions` (lowercase, without the dot)
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    get_file_extension(path)
        .map(|ext| extensions.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Files in `dir` created or rewritten since `before`, filtered by extension
pub fn changed_files_with_extensions(
    dir: &Path,
    before: &FileSnapshot,
    extensions: &[&str],
) -> Vec<PathBuf> {
    let mut changed: Vec<PathBuf> = snapshot_files(dir)
        .into_iter()
        .filter(|(path, modified)| match before.get(path) {
            Some(previous) => previous != modified,
            None => true,
        })
        .map(|(path, _)| path)
        .filter(|path| has_extension(path, extensions))
        .collect();
    changed.sort();
    changed
}
