use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Read a whole input file as text.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Write the finished output text in one shot.
///
/// Callers only reach this after the core pipeline has succeeded, so an
/// aborted run never leaves a partial artifact behind.
pub fn write_text(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}
