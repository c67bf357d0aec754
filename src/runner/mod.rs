//! Build execution
//!
//! This module holds the execution context and its interpreter, property evaluation,
//! the target engine, and the concurrency primitives used while running.

pub mod context;
pub mod engine;
pub mod eval;
pub mod interpolate;
pub mod script;
pub mod singleton;
pub mod stack;
pub mod threads;

// Re-export main types
pub use context::{ContextFork, ExecutionContext};
pub use engine::{run, run_parent, run_steps, run_target};
pub use singleton::SingletonGuard;
pub use stack::{ExecutionStack, Frame, History};
