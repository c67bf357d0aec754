//! Build file discovery and parsing

use crate::config::schema::check_fields;
use crate::config::types::BuildFile;
use crate::error::{BuildError, ResolutionError, ResolutionResult};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default build file names to search for
pub const BUILD_FILE_NAMES: &[&str] = &["build.yml", "build.yaml"];

/// Find the build file by searching current and parent directories
pub fn find_build_file() -> ResolutionResult<PathBuf> {
    let current = env::current_dir()
        .map_err(|e| ResolutionError::BuildFileNotFound(format!("current directory: {}", e)))?;
    find_build_file_from(current)
}

/// Find the build file starting from a specific directory
pub fn find_build_file_from(start_dir: PathBuf) -> ResolutionResult<PathBuf> {
    let mut current_dir = start_dir;
    let mut searched_paths = Vec::new();

    loop {
        for file_name in BUILD_FILE_NAMES {
            let build_path = current_dir.join(file_name);
            searched_paths.push(build_path.display().to_string());

            if build_path.is_file() {
                return Ok(build_path);
            }
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => return Err(ResolutionError::BuildFileNotFound(searched_paths.join(", "))),
        }
    }
}

/// Parse a build file from a path
pub fn parse_build_file(path: &Path) -> Result<BuildFile, BuildError> {
    let contents = fs::read_to_string(path)?;
    parse_build(&contents)
}

/// Parse a build file from a string
///
/// Unknown top-level keys are reported as configuration errors before the
/// typed decoding runs.
pub fn parse_build(yaml: &str) -> Result<BuildFile, BuildError> {
    let value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
    if value.is_null() {
        return Ok(BuildFile::default());
    }
    check_fields(&value)?;
    let build: BuildFile = serde_yaml::from_value(value)?;
    Ok(build)
}
