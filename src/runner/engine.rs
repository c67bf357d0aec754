//! Target execution
//!
//! Targets are always looked up from the root of the hierarchy, so that a definition
//! overriding a target also overrides it as a dependency of inherited targets.

use crate::build::{BuildId, Step, Target};
use crate::error::{ConfigError, ResolutionError, Result};
use crate::runner::singleton::SingletonGuard;
use crate::runner::ExecutionContext;
use crate::tasks::binder;
use std::sync::Arc;

/// Run targets, or the default targets when none are given
pub fn run(ctx: &mut ExecutionContext, targets: &[String]) -> Result<()> {
    let tree = Arc::clone(ctx.tree());

    let _guard = match tree.resolved_singleton(tree.root_id()) {
        Some(port) => {
            let port = ctx.evaluate_port(port)?;
            ctx.console.debug(&format!("Acquiring singleton port {}", port));
            Some(SingletonGuard::acquire(port)?)
        }
        None => None,
    };

    let targets = if targets.is_empty() {
        tree.resolved_default_targets(tree.root_id())
    } else {
        targets.to_vec()
    };
    if targets.is_empty() {
        return Err(ResolutionError::NoDefaultTarget.into());
    }

    for target in &targets {
        run_target(ctx, target)?;
    }
    Ok(())
}

/// Run a target by name, resolved from the root
pub fn run_target(ctx: &mut ExecutionContext, name: &str) -> Result<()> {
    let tree = Arc::clone(ctx.tree());
    let (owner, target) = tree
        .resolved_target(tree.root_id(), name)
        .ok_or_else(|| ResolutionError::TargetNotFound(name.to_string()))?;

    run_resolved(ctx, owner, target).map_err(|e| e.in_target(name))
}

fn run_resolved(ctx: &mut ExecutionContext, owner: BuildId, target: &Target) -> Result<()> {
    if let Some(unless) = &target.unless {
        if ctx.evaluate_condition(unless)? {
            ctx.console.title(&target.name);
            ctx.console.skipped(&target.name);
            return Ok(());
        }
    }

    ctx.stack.push(owner, &target.name)?;
    ctx.history.record(&target.name);
    let result = run_body(ctx, owner, target);
    ctx.stack.pop();
    result
}

fn run_body(ctx: &mut ExecutionContext, owner: BuildId, target: &Target) -> Result<()> {
    for dependency in &target.depends {
        ctx.console
            .debug(&format!("Target '{}' depends on '{}'", target.name, dependency));
        run_target(ctx, dependency)?;
    }

    ctx.console.title(&target.name);
    let dir = ctx.tree().get(owner).dir.clone();
    std::env::set_current_dir(&dir)?;
    run_steps(ctx, &target.steps)
}

/// Run steps in order, stopping at the first failure
pub fn run_steps(ctx: &mut ExecutionContext, steps: &[Step]) -> Result<()> {
    for (index, step) in steps.iter().enumerate() {
        run_step(ctx, step).map_err(|e| e.in_step(index + 1))?;
    }
    Ok(())
}

/// Run a script, or bind the arguments of a task and call its handler
pub fn run_step(ctx: &mut ExecutionContext, step: &Step) -> Result<()> {
    match step {
        Step::Script { source } => {
            ctx.run_script(source)?;
            Ok(())
        }
        Step::Task { task, args } => {
            let registry = Arc::clone(ctx.registry());
            let descriptor = registry
                .task(task)
                .ok_or_else(|| ConfigError::UnknownTask(task.clone()))?;
            let bound = binder::bind(ctx, descriptor, args)?;
            (descriptor.handler)(ctx, &bound)
        }
    }
}

/// Run the steps of the parent target with the name of the current one
pub fn run_parent(ctx: &mut ExecutionContext) -> Result<()> {
    let frame = ctx
        .stack
        .current()
        .cloned()
        .ok_or(ResolutionError::NoCurrentTarget)?;
    let tree = Arc::clone(ctx.tree());
    let (owner, target) = tree
        .resolved_parent_target(frame.build, &frame.target)
        .ok_or_else(|| ResolutionError::NoParentTarget(frame.target.clone()))?;

    ctx.stack.push(owner, &target.name)?;
    ctx.history.record(&target.name);
    let result = run_steps(ctx, &target.steps);
    ctx.stack.pop();
    result
}
