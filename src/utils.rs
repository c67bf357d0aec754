//! Path and platform helpers

use directories::BaseDirs;
use std::path::{Path, PathBuf};

/// Name of the directory holding parent builds and templates, under the home directory
const DEFAULT_REPOSITORY: &str = ".spire";

/// Home directory of the invoking user
pub fn home_dir() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

/// Expand a leading `~/` (or a lone `~`) to the user's home directory
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = home_dir() {
            return home;
        }
    }
    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Expand home and make the path absolute relative to `base`
pub fn resolve_path(base: &Path, path: &str) -> PathBuf {
    let expanded = expand_home(path);
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

/// Default repository location (`~/.spire`)
pub fn default_repository() -> PathBuf {
    home_dir()
        .map(|home| home.join(DEFAULT_REPOSITORY))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REPOSITORY))
}

/// Make a path absolute without touching the file system
pub fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|dir| dir.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Number of CPUs available to this process
pub fn cpu_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
