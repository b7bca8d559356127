use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Lists regular, non-hidden files in `dir` whose extension is exactly
/// `extension` (no leading dot), sorted by path.
///
/// A missing directory or an empty listing is not an error.
pub fn list_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read directory: {}", dir.display()))
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && !is_hidden(path) && has_extension(path, extension))
        .collect();

    // Sort alphabetically so the save counter follows a reproducible video order
    files.sort();

    Ok(files)
}

pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().map_or(false, |ext| ext == extension)
}

/// Dot-files, including `._name` AppleDouble sidecars.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map_or(false, |name| name.to_string_lossy().starts_with('.'))
}

pub fn require_dir(path: &Path, what: &str) -> Result<()> {
    if !path.is_dir() {
        anyhow::bail!("{} directory does not exist: {}", what, path.display());
    }
    Ok(())
}

pub fn require_file(path: &Path, what: &str) -> Result<()> {
    if !path.is_file() {
        anyhow::bail!("{} not found: {}", what, path.display());
    }
    Ok(())
}
