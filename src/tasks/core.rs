//! Core tasks: output, errors, target calls and control flow

use crate::error::{ExecutionError, Result};
use crate::runner::{engine, threads, ExecutionContext};
use crate::tasks::binder::{BoundArgs, Field, Schema, Shape};
use crate::tasks::{Registry, TaskDescriptor};
use serde_yaml::Value;

pub fn register(registry: &mut Registry) {
    registry.register_task(TaskDescriptor {
        name: "print".to_string(),
        schema: Schema::new(vec![Field::new("print", Shape::Any)]),
        handler: print,
        help: "Print a message on the console.\n\n\
               Arguments:\n\
               - print: the message (string)"
            .to_string(),
    });

    registry.register_task(TaskDescriptor {
        name: "throw".to_string(),
        schema: Schema::new(vec![Field::new("throw", Shape::String)]),
        handler: throw,
        help: "Fail with an error message.\n\n\
               Arguments:\n\
               - throw: the error message (string)"
            .to_string(),
    });

    registry.register_task(TaskDescriptor {
        name: "call".to_string(),
        schema: Schema::new(vec![
            Field::new("call", Shape::List(Box::new(Shape::String))).wrap(),
        ]),
        handler: call,
        help: "Run targets, resolved from the root of the build.\n\n\
               Arguments:\n\
               - call: the target(s) to run (strings, wrap)"
            .to_string(),
    });

    registry.register_task(TaskDescriptor {
        name: "super".to_string(),
        schema: Schema::new(vec![Field::new("super", Shape::Any).optional()]),
        handler: super_target,
        help: "Run the steps of the parent target with the same name.\n\n\
               Arguments:\n\
               - super: none"
            .to_string(),
    });

    registry.register_task(TaskDescriptor {
        name: "try".to_string(),
        schema: Schema::new(vec![
            Field::new("try", Shape::Any).steps(),
            Field::new("catch", Shape::Any).steps().optional(),
            Field::new("finally", Shape::Any).steps().optional(),
        ]),
        handler: try_catch,
        help: "Run steps and handle their failure.\n\n\
               Arguments:\n\
               - try: steps to run (steps)\n\
               - catch: steps run on failure, with _error set (steps, optional)\n\
               - finally: steps always run (steps, optional)"
            .to_string(),
    });

    registry.register_task(TaskDescriptor {
        name: "threads".to_string(),
        schema: Schema::new(vec![
            Field::new("threads", Shape::Int).expression(),
            Field::new("input", Shape::List(Box::new(Shape::Any)))
                .expression()
                .optional(),
            Field::new("steps", Shape::Any).steps(),
            Field::new("verbose", Shape::Bool).optional(),
        ]),
        handler: run_threads,
        help: "Run steps in parallel threads.\n\n\
               Arguments:\n\
               - threads: number of threads (integer, expression)\n\
               - input: items consumed by threads as _input (list, expression, optional)\n\
               - steps: steps run for each item (steps)\n\
               - verbose: print thread activity (boolean, optional)\n\n\
               Threads get their index in _thread and may set _output. Collected outputs\n\
               are in _output once all threads are done."
            .to_string(),
    });
}

fn print(ctx: &mut ExecutionContext, args: &BoundArgs) -> Result<()> {
    ctx.console.message(&args.string("print"));
    Ok(())
}

fn throw(_ctx: &mut ExecutionContext, args: &BoundArgs) -> Result<()> {
    Err(ExecutionError::Thrown(args.string("throw")).into())
}

fn call(ctx: &mut ExecutionContext, args: &BoundArgs) -> Result<()> {
    for target in args.strings("call") {
        engine::run_target(ctx, &target)?;
    }
    Ok(())
}

fn super_target(ctx: &mut ExecutionContext, _args: &BoundArgs) -> Result<()> {
    engine::run_parent(ctx)
}

fn try_catch(ctx: &mut ExecutionContext, args: &BoundArgs) -> Result<()> {
    let result = match engine::run_steps(ctx, args.steps("try")) {
        Err(e) if args.is_set("catch") => {
            ctx.define("_error", &Value::String(e.to_string()))?;
            engine::run_steps(ctx, args.steps("catch"))
        }
        other => other,
    };

    let cleanup = engine::run_steps(ctx, args.steps("finally"));
    result.and(cleanup)
}

fn run_threads(ctx: &mut ExecutionContext, args: &BoundArgs) -> Result<()> {
    let count = args.int("threads");
    if count <= 0 {
        return Err(ExecutionError::InvalidThreads(count).into());
    }

    let input = if args.is_set("input") {
        Some(args.list("input"))
    } else {
        None
    };

    threads::run_parallel(
        ctx,
        count as usize,
        input,
        args.steps("steps"),
        args.bool("verbose"),
    )
}
