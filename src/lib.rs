//! Spire - a declarative build tool
//!
//! Build files declare targets made of steps, targets depend on other targets and build
//! files inherit from parent build files. Values are computed through properties
//! evaluated by an embedded Lua interpreter.

// Public modules
pub mod build;
pub mod cli;
pub mod config;
pub mod error;
pub mod runner;
pub mod tasks;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use error::{BuildError, Result};

/// Current version of Spire
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
