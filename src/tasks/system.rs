//! System tasks: running commands and creating directories

use crate::error::{ArgumentError, EvalError, ExecutionError, Result};
use crate::runner::interpolate::to_text;
use crate::runner::ExecutionContext;
use crate::tasks::binder::{describe_value, BoundArgs, Field, Schema, Shape};
use crate::tasks::{Registry, TaskDescriptor};
use serde_yaml::Value;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};

pub fn register(registry: &mut Registry) {
    registry.register_task(TaskDescriptor {
        name: "$".to_string(),
        schema: Schema::new(vec![
            Field::new("command", Shape::Any).key("$"),
            Field::new("dir", Shape::String).optional().file(),
            Field::new("quiet", Shape::Bool).optional(),
            Field::new("output", Shape::String).optional(),
        ]),
        handler: run_command,
        help: "Run a command.\n\n\
               Arguments:\n\
               - $: a command line run through the shell (string), or a program and its\n\
               \x20 arguments run directly (list of strings)\n\
               - dir: working directory (string, file, optional)\n\
               - quiet: do not echo the command (boolean, optional)\n\
               - output: property receiving the trimmed standard output (string, optional)"
            .to_string(),
    });

    registry.register_task(TaskDescriptor {
        name: "mkdir".to_string(),
        schema: Schema::new(vec![
            Field::new("mkdir", Shape::List(Box::new(Shape::String))).wrap().file(),
        ]),
        handler: make_directories,
        help: "Create directories, with missing parents.\n\n\
               Arguments:\n\
               - mkdir: the directory or directories to create (strings, file, wrap)"
            .to_string(),
    });
}

fn run_command(ctx: &mut ExecutionContext, args: &BoundArgs) -> Result<()> {
    let (mut command, display) = match args.get("command") {
        Some(Value::String(line)) => {
            let shell = ctx.shell()?;
            let mut command = Command::new(&shell[0]);
            command.args(&shell[1..]).arg(line);
            (command, line.clone())
        }
        Some(Value::Sequence(items)) if !items.is_empty() => {
            let words: Vec<String> = items.iter().map(to_text).collect();
            let mut command = Command::new(&words[0]);
            command.args(&words[1..]);
            (command, words.join(" "))
        }
        other => {
            return Err(EvalError::Arguments {
                task: "$".to_string(),
                source: ArgumentError::Shape {
                    field: "$".to_string(),
                    expected: "a string or a non empty list".to_string(),
                    actual: other.map(describe_value).unwrap_or_else(|| "null".to_string()),
                },
            }
            .into())
        }
    };

    let dir = if args.is_set("dir") {
        PathBuf::from(args.string("dir"))
    } else {
        ctx.base_dir()
    };

    command.current_dir(&dir);
    command.env_clear();
    command.envs(ctx.environment());
    command.stdin(Stdio::inherit());
    command.stderr(Stdio::inherit());

    if !args.bool("quiet") {
        ctx.console.command(&display);
    }

    let start_error = |e: std::io::Error| ExecutionError::CommandStart {
        command: display.clone(),
        error: e.to_string(),
    };

    if args.is_set("output") {
        command.stdout(Stdio::piped());
        let output = command.output().map_err(start_error)?;
        if !output.status.success() {
            return Err(ExecutionError::CommandFailed(output.status.code()).into());
        }
        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        ctx.define(&args.string("output"), &Value::String(text))?;
    } else {
        command.stdout(Stdio::inherit());
        let status = command.status().map_err(start_error)?;
        if !status.success() {
            return Err(ExecutionError::CommandFailed(status.code()).into());
        }
    }

    Ok(())
}

fn make_directories(_ctx: &mut ExecutionContext, args: &BoundArgs) -> Result<()> {
    for dir in args.strings("mkdir") {
        fs::create_dir_all(&dir)?;
    }
    Ok(())
}
