/*!
 * Common test utilities for the ibut test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use ibut::language_utils::LanguagePair;

// Re-export the scripted generators module
pub mod mock_generators;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Route library logs to the test output; set RUST_LOG=debug to see prompts
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Chinese to English, the pair most tests run on
pub fn zh_en() -> LanguagePair {
    LanguagePair::new("zh", "en").unwrap()
}

/// The sentence used throughout the protocol tests
pub const CLIMATE_SENTENCE: &str = "气候变化是当今人类面临的最严峻挑战之一，我们需要立即采取行动减少温室气体排放，实现碳中和。";
