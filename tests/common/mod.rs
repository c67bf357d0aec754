//! Common test utilities

#![allow(dead_code)]

use spire::build::{BuildTree, LoadOptions};
use spire::runner::{self, ExecutionContext};
use spire::tasks::Registry;
use spire::ui::Verbosity;
use spire::Result;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Create a temporary directory holding the given files
pub fn create_files(files: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    for (name, content) in files {
        let path = temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
    temp_dir
}

/// Create a temporary directory with a build.yml file
pub fn create_build(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = create_files(&[("build.yml", content)]);
    let build_path = temp_dir.path().join("build.yml");
    (temp_dir, build_path)
}

/// Load options rooted in a temporary directory, with a repository inside it
pub fn options(temp_dir: &TempDir) -> LoadOptions {
    LoadOptions::new()
        .with_here(temp_dir.path().to_path_buf())
        .with_repository(temp_dir.path().join("repo"))
}

/// Load build.yml from a temporary directory
pub fn load(temp_dir: &TempDir) -> Result<BuildTree> {
    BuildTree::load(
        &temp_dir.path().join("build.yml"),
        &Registry::with_defaults(),
        &options(temp_dir),
    )
}

/// Load and initialize a silent context for build.yml
pub fn context(temp_dir: &TempDir) -> Result<ExecutionContext> {
    let registry = Arc::new(Registry::with_defaults());
    let tree = BuildTree::load(
        &temp_dir.path().join("build.yml"),
        &registry,
        &options(temp_dir),
    )?;
    let mut ctx = ExecutionContext::new(Arc::new(tree), registry)?
        .with_verbosity(Verbosity::Silent);
    ctx.init()?;
    Ok(ctx)
}

/// Run targets of build.yml, returning the context for inspection
pub fn run(temp_dir: &TempDir, targets: &[&str]) -> (ExecutionContext, Result<()>) {
    let mut ctx = context(temp_dir).unwrap();
    let targets: Vec<String> = targets.iter().map(|t| t.to_string()).collect();
    let result = runner::run(&mut ctx, &targets);
    (ctx, result)
}

/// Read a string property
pub fn property(ctx: &ExecutionContext, name: &str) -> String {
    match ctx.get(name).unwrap() {
        Some(serde_yaml::Value::String(s)) => s,
        other => panic!("property '{}' is not a string: {:?}", name, other),
    }
}
