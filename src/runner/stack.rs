//! Execution stack and history

use crate::build::BuildId;
use crate::error::{ExecutionError, ExecutionResult};

/// A target being run, identified by its owning build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub build: BuildId,
    pub target: String,
}

/// Targets currently running, outermost first
#[derive(Debug, Clone, Default)]
pub struct ExecutionStack {
    frames: Vec<Frame>,
}

impl ExecutionStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a target, failing if it is already running
    pub fn push(&mut self, build: BuildId, target: &str) -> ExecutionResult<()> {
        let frame = Frame {
            build,
            target: target.to_string(),
        };

        if self.frames.contains(&frame) {
            let mut chain: Vec<&str> = self.frames.iter().map(|f| f.target.as_str()).collect();
            chain.push(target);
            return Err(ExecutionError::Cycle(chain.join(" -> ")));
        }

        self.frames.push(frame);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    /// Innermost running target
    pub fn current(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Every target entered during a run, in order
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<String>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, target: &str) {
        self.entries.push(target.to_string());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// How many times a target was entered
    pub fn count(&self, target: &str) -> usize {
        self.entries.iter().filter(|entry| *entry == target).count()
    }
}
