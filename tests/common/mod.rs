/*!
 * Common test utilities for the paysplit test suite
 */

use std::path::PathBuf;
use std::fs;
use anyhow::Result;
use tempfile::TempDir;

// Re-export the PDF fixture builders
pub mod fixtures;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &PathBuf, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a roster file with one recipient name per line
pub fn create_test_roster(dir: &PathBuf, filename: &str, names: &[&str]) -> Result<PathBuf> {
    let content = names.join("\n");
    create_test_file(dir, filename, &content)
}
