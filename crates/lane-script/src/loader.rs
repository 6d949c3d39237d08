//! Reading scripts from disk.

use std::path::{Path, PathBuf};

use lane_types::{LaneError, Result};

use crate::ast::ParsedProgram;
use crate::parser::compile;

/// Locations searched by [`find_fastfile`], relative to the project directory.
pub const FASTFILE_LOCATIONS: &[&str] = &["fastlane/Fastfile", "Fastfile"];

/// Read and compile the script at `path`.
pub fn load(path: &Path) -> Result<ParsedProgram> {
    if !path.is_file() {
        return Err(LaneError::ScriptNotFound {
            path: path.display().to_string(),
        });
    }
    let source = std::fs::read_to_string(path)?;
    tracing::debug!(path = %path.display(), bytes = source.len(), "loading script");
    compile(&source)
}

/// Find the project's Fastfile under `dir`.
pub fn find_fastfile(dir: &Path) -> Option<PathBuf> {
    FASTFILE_LOCATIONS
        .iter()
        .map(|rel| dir.join(rel))
        .find(|p| p.is_file())
}
