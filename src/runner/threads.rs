//! Parallel step execution
//!
//! Workers run on forks of the calling context and share only the input queue and the
//! output and error channels. Every worker runs until its queue is empty, even after a
//! sibling failed.

use crate::build::Step;
use crate::error::{BuildError, ExecutionError, Result};
use crate::runner::engine::run_steps;
use crate::runner::interpolate::to_text;
use crate::runner::{ContextFork, ExecutionContext};
use crate::ui::Console;
use serde_yaml::Value;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use std::thread;

/// Worker index, 0 based
pub const THREAD: &str = "_thread";

/// Item drawn from the input queue
pub const INPUT: &str = "_input";

/// Output of an iteration, then outputs of all iterations in the calling context
pub const OUTPUT: &str = "_output";

/// Run `steps` in `workers` threads
///
/// With an input list, workers draw items until the queue is empty. Without one, each
/// worker runs a single iteration with a null input. Outputs are collected in arrival
/// order into `_output`; if any iteration failed, one of the errors is returned.
pub fn run_parallel(
    ctx: &mut ExecutionContext,
    workers: usize,
    input: Option<Vec<Value>>,
    steps: &[Step],
    verbose: bool,
) -> Result<()> {
    let queue = match input {
        Some(items) => {
            let (sender, receiver) = mpsc::sync_channel(items.len().max(1));
            for item in items {
                // The receiver is alive and the channel is large enough
                let _ = sender.send(item);
            }
            drop(sender);
            Some(Mutex::new(receiver))
        }
        None => None,
    };

    let fork = ctx.fork();
    let console = ctx.console;
    let (output_sender, outputs) = mpsc::channel::<Value>();
    let (error_sender, errors) = mpsc::channel::<BuildError>();

    if verbose {
        console.info(&format!("Starting {} threads", workers));
    }

    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|index| {
                let worker = Worker {
                    index,
                    fork: fork.clone(),
                    queue: queue.as_ref(),
                    outputs: output_sender.clone(),
                    errors: error_sender.clone(),
                    verbose,
                };
                scope.spawn(move || worker.run(steps))
            })
            .collect();

        for (index, handle) in handles.into_iter().enumerate() {
            if handle.join().is_err() {
                let _ = error_sender.send(ExecutionError::WorkerPanic(index).into());
            }
        }
    });

    drop(output_sender);
    drop(error_sender);

    let collected: Vec<Value> = outputs.try_iter().collect();
    if verbose {
        console.info(&format!("Threads done, {} outputs", collected.len()));
    }
    ctx.define(OUTPUT, &Value::Sequence(collected))?;

    match errors.try_iter().next() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

struct Worker<'a> {
    index: usize,
    fork: ContextFork,
    queue: Option<&'a Mutex<Receiver<Value>>>,
    outputs: Sender<Value>,
    errors: Sender<BuildError>,
    verbose: bool,
}

impl Worker<'_> {
    fn run(self, steps: &[Step]) {
        let mut ctx = match self.fork.clone().into_context() {
            Ok(ctx) => ctx,
            Err(e) => {
                let _ = self.errors.send(e);
                return;
            }
        };
        let console = ctx.console;

        if let Err(e) = ctx.define(THREAD, &Value::from(self.index as u64)) {
            let _ = self.errors.send(e.into());
            return;
        }

        match self.queue {
            Some(queue) => {
                while let Some(item) = next_item(queue) {
                    self.iteration(&mut ctx, &console, item, steps);
                }
            }
            None => self.iteration(&mut ctx, &console, Value::Null, steps),
        }

        if self.verbose {
            console.info(&format!("Thread {} done", self.index));
        }
    }

    fn iteration(&self, ctx: &mut ExecutionContext, console: &Console, item: Value, steps: &[Step]) {
        if self.verbose {
            console.info(&format!("Thread {} processing '{}'", self.index, to_text(&item)));
        }

        match iterate(ctx, item, steps) {
            Ok(Some(Value::Null)) | Ok(None) => {}
            Ok(Some(output)) => {
                let _ = self.outputs.send(output);
            }
            Err(e) => {
                console.debug(&format!("Thread {} failed: {}", self.index, e));
                let _ = self.errors.send(e);
            }
        }
    }
}

fn iterate(ctx: &mut ExecutionContext, item: Value, steps: &[Step]) -> Result<Option<Value>> {
    ctx.define(INPUT, &item)?;
    ctx.define(OUTPUT, &Value::Null)?;
    run_steps(ctx, steps)?;
    Ok(ctx.get(OUTPUT)?)
}

/// Take the next item without waiting
fn next_item(queue: &Mutex<Receiver<Value>>) -> Option<Value> {
    match queue.lock() {
        Ok(receiver) => receiver.try_recv().ok(),
        Err(_) => None,
    }
}
