//! Console output
//!
//! All engine output goes through a [`Console`], which filters messages by verbosity.

use colored::Colorize;

/// Width of target title lines
const TITLE_WIDTH: usize = 72;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    Silent = 0,
    Quiet = 1,
    #[default]
    Normal = 2,
    Verbose = 3,
}

/// Verbosity-aware printer
#[derive(Debug, Clone, Copy, Default)]
pub struct Console {
    pub verbosity: Verbosity,
}

impl Console {
    pub fn new(verbosity: Verbosity) -> Self {
        Console { verbosity }
    }

    /// Print the title line of a target
    pub fn title(&self, name: &str) {
        if self.verbosity >= Verbosity::Normal {
            let prefix = "-".repeat(TITLE_WIDTH.saturating_sub(name.len() + 1));
            eprintln!("{} {}", prefix.yellow(), name.yellow().bold());
        }
    }

    /// Print the notice of a skipped target
    pub fn skipped(&self, name: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("{}", format!("Skipping target '{}'", name).dimmed());
        }
    }

    /// Print a command before it runs
    pub fn command(&self, line: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("[RUN] {}", line);
        }
    }

    /// Print a message from a build (print task)
    pub fn message(&self, text: &str) {
        if self.verbosity >= Verbosity::Quiet {
            println!("{}", text);
        }
    }

    /// Print info message
    pub fn info(&self, message: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("[INFO] {}", message);
        }
    }

    /// Print debug message (only in verbose mode)
    pub fn debug(&self, message: &str) {
        if self.verbosity >= Verbosity::Verbose {
            eprintln!("[DEBUG] {}", message);
        }
    }

    /// Print the final status of a run
    pub fn outcome(&self, success: bool) {
        if self.verbosity < Verbosity::Normal {
            return;
        }
        if success {
            eprintln!("{}", "OK".green().bold());
        } else {
            eprintln!("{}", "ERROR".red().bold());
        }
    }
}
