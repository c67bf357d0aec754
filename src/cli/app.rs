//! Main CLI application

use crate::build::load::find_parent;
use crate::build::{BuildTree, LoadOptions};
use crate::config::{find_build_file, property_map};
use crate::runner::{self, interpolate::to_text, ExecutionContext};
use crate::tasks::Registry;
use crate::ui::{Console, Verbosity};
use crate::utils::{absolute, default_repository};
use anyhow::{anyhow, bail};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use clap_complete::Shell;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Build the clap command
pub fn build_command() -> Command {
    Command::new("spire")
        .version(crate::VERSION)
        .about("Declarative build tool with inheritance and Lua expressions")
        .arg(
            Arg::new("targets")
                .value_name("TARGET")
                .help("Targets to run (default targets when none)")
                .num_args(0..),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .help("Build file to run (searched in parent directories by default)")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("template")
                .short('T')
                .long("template")
                .help("Run the build file as a template in the current directory")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("repo")
                .long("repo")
                .value_name("DIR")
                .help("Repository of parent builds and templates")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("props")
                .short('p')
                .long("props")
                .value_name("YAML")
                .help("Property overrides, as a YAML map"),
        )
        .arg(
            Arg::new("info")
                .long("info")
                .help("Print build information")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-targets")
                .long("targets")
                .help("List the targets of the build")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("tasks")
                .long("tasks")
                .help("List available tasks")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("task")
                .long("task")
                .value_name("NAME")
                .help("Print help on a task"),
        )
        .arg(
            Arg::new("builtins")
                .long("builtins")
                .help("List builtin functions")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("completion")
                .long("completion")
                .value_name("SHELL")
                .help("Print a shell completion script")
                .value_parser(value_parser!(Shell)),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print build output and errors")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print no output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output")
                .action(ArgAction::SetTrue),
        )
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("silent") {
        Verbosity::Silent
    } else if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Run the CLI application with the process arguments
pub fn run() -> anyhow::Result<()> {
    run_from(std::env::args_os())
}

/// Run the CLI application with the given arguments
pub fn run_from<I, T>(args: I) -> anyhow::Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = build_command().try_get_matches_from(args)?;
    let console = Console::new(get_verbosity(&matches));

    if let Some(shell) = matches.get_one::<Shell>("completion") {
        clap_complete::generate(*shell, &mut build_command(), "spire", &mut io::stdout());
        return Ok(());
    }

    let registry = Arc::new(Registry::with_defaults());
    if matches.get_flag("tasks") {
        print_tasks(&registry);
        return Ok(());
    }
    if let Some(name) = matches.get_one::<String>("task") {
        return print_task(&registry, name);
    }
    if matches.get_flag("builtins") {
        print_builtins(&registry);
        return Ok(());
    }

    let tree = Arc::new(load_build(&matches, &registry)?);
    if matches.get_flag("list-targets") {
        for name in tree.resolved_targets(tree.root_id()).keys() {
            println!("{}", name);
        }
        return Ok(());
    }
    if matches.get_flag("info") {
        print_info(&tree);
        return Ok(());
    }

    let overrides = match matches.get_one::<String>("props") {
        Some(yaml) => parse_overrides(yaml)?,
        None => BTreeMap::new(),
    };
    let targets: Vec<String> = matches
        .get_many::<String>("targets")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    let result = execute(tree, registry, console, overrides, &targets);
    console.outcome(result.is_ok());
    result
}

fn execute(
    tree: Arc<BuildTree>,
    registry: Arc<Registry>,
    console: Console,
    overrides: BTreeMap<String, Value>,
    targets: &[String],
) -> anyhow::Result<()> {
    let mut ctx = ExecutionContext::new(tree, registry)?
        .with_console(console)
        .with_overrides(overrides);
    ctx.init()
        .map_err(|e| anyhow!("Failed to initialize build: {}", e))?;
    runner::run(&mut ctx, targets)?;
    Ok(())
}

/// Locate and load the build file
fn load_build(matches: &ArgMatches, registry: &Registry) -> anyhow::Result<BuildTree> {
    let here = absolute(Path::new("."));
    let template = matches.get_flag("template");
    let mut options = LoadOptions::new()
        .with_here(here.clone())
        .with_template(template);
    if let Some(repository) = matches.get_one::<PathBuf>("repo") {
        options = options.with_repository(absolute(repository));
    }

    let file = matches.get_one::<PathBuf>("file");
    let path = match (template, file) {
        (true, Some(file)) => {
            let repository = options.repository.clone().unwrap_or_else(default_repository);
            find_parent(&file.to_string_lossy(), &here, &repository)?
        }
        (true, None) => bail!("Template mode needs a build file (-f)"),
        (false, Some(file)) => absolute(file),
        (false, None) => find_build_file()?,
    };

    BuildTree::load(&path, registry, &options)
        .map_err(|e| anyhow!("Failed to load build file '{}': {}", path.display(), e))
}

fn parse_overrides(yaml: &str) -> anyhow::Result<BTreeMap<String, Value>> {
    let mapping: Mapping = serde_yaml::from_str(yaml)
        .map_err(|e| anyhow!("Invalid property overrides '{}': {}", yaml, e))?;
    Ok(property_map(mapping)?)
}

fn print_tasks(registry: &Registry) {
    for task in registry.tasks() {
        let summary = task.help.lines().next().unwrap_or_default();
        println!("{:<10} {}", task.name, summary);
    }
}

fn print_task(registry: &Registry, name: &str) -> anyhow::Result<()> {
    let task = registry
        .task(name)
        .ok_or_else(|| anyhow!("Task '{}' not found", name))?;
    println!("{}", task.name);
    println!();
    println!("{}", task.help);
    Ok(())
}

fn print_builtins(registry: &Registry) {
    for builtin in registry.builtins() {
        println!("{:<10} {}", builtin.name, builtin.help);
    }
}

fn print_info(tree: &BuildTree) {
    let id = tree.root_id();
    let root = tree.root();

    if !root.doc.is_empty() {
        println!("doc: {}", root.doc);
    }
    println!("build: {}", root.file.display());
    println!("repository: {}", root.repository.display());
    if !root.extends.is_empty() {
        println!("extends: {}", root.extends.join(", "));
    }
    let default = tree.resolved_default_targets(id);
    if !default.is_empty() {
        println!("default: {}", default.join(", "));
    }

    let scripts = tree.resolved_scripts(id);
    if !scripts.is_empty() {
        println!("context:");
        for script in scripts {
            println!("  {}", script.lines().next().unwrap_or_default());
        }
    }

    let expose = tree.resolved_expose(id);
    let properties: Vec<(String, Value)> = tree
        .resolved_properties(id)
        .into_iter()
        .filter(|(name, _)| expose.is_empty() || expose.contains(name))
        .collect();
    if !properties.is_empty() {
        println!("properties:");
        for (name, value) in properties {
            println!("  {}: {}", name, to_text(&value));
        }
    }

    let environment = tree.resolved_environment(id);
    if !environment.is_empty() {
        println!("environment:");
        for (name, value) in environment {
            println!("  {}: {}", name, to_text(&value));
        }
    }

    println!("targets:");
    for (name, (_, target)) in tree.resolved_targets(id) {
        let mut line = format!("  {}", name);
        if !target.doc.is_empty() {
            line.push_str(&format!(": {}", target.doc));
        }
        if !target.depends.is_empty() {
            line.push_str(&format!(" [{}]", target.depends.join(", ")));
        }
        println!("{}", line);
    }
}
