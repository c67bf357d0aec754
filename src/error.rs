//! Error types for Spire

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Spire operations
pub type Result<T> = std::result::Result<T, BuildError>;

/// Main error type for Spire
#[derive(Error, Debug)]
pub enum BuildError {
    /// Build file and registry configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Missing files, targets or shells
    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// Expression and property evaluation errors
    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvalError),

    /// Target and task execution errors
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An error raised while loading a build file
    #[error("in build file '{}': {source}", .path.display())]
    File {
        path: PathBuf,
        source: Box<BuildError>,
    },

    /// An error raised while running a target
    #[error("target '{name}': {source}")]
    Target {
        name: String,
        source: Box<BuildError>,
    },

    /// An error raised by a step, with its 1-based index
    #[error("step {index}: {source}")]
    Step {
        index: usize,
        source: Box<BuildError>,
    },
}

impl BuildError {
    /// Wrap this error with the name of the target that produced it
    pub fn in_target(self, name: &str) -> Self {
        BuildError::Target {
            name: name.to_string(),
            source: Box::new(self),
        }
    }

    /// Wrap this error with the 1-based index of the step that produced it
    pub fn in_step(self, index: usize) -> Self {
        BuildError::Step {
            index,
            source: Box::new(self),
        }
    }

    /// Wrap this error with the build file that produced it
    pub fn in_file(self, path: &std::path::Path) -> Self {
        BuildError::File {
            path: path.to_path_buf(),
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping file, target and step context
    pub fn root_cause(&self) -> &BuildError {
        match self {
            BuildError::File { source, .. }
            | BuildError::Target { source, .. }
            | BuildError::Step { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Build file parsing and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown field '{0}' in build file")]
    UnknownField(String),

    #[error("Invalid build file: {0}")]
    Invalid(String),

    #[error("Invalid step {index} in target '{target}': {message}")]
    InvalidStep {
        target: String,
        index: usize,
        message: String,
    },

    #[error("No registered task in step with keys: {0}")]
    UnknownTask(String),

    #[error("Step matches several tasks: {0}")]
    AmbiguousStep(String),

    #[error("Invalid arguments for task '{task}': {source}")]
    Arguments {
        task: String,
        source: ArgumentError,
    },

    #[error("Circular extends: {0}")]
    ExtendsCycle(String),

    #[error("Build file '{}' requires version {required}, this is {actual}", .path.display())]
    Version {
        path: PathBuf,
        required: String,
        actual: String,
    },
}

/// Errors raised while looking things up in a build hierarchy
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("Failed to find build file (searched: {0})")]
    BuildFileNotFound(String),

    #[error("Parent build '{0}' not found")]
    ParentNotFound(String),

    #[error("Target '{0}' not found")]
    TargetNotFound(String),

    #[error("No target given and no default target defined")]
    NoDefaultTarget,

    #[error("No parent target '{0}' to delegate to")]
    NoParentTarget(String),

    #[error("No current target to delegate from")]
    NoCurrentTarget,

    #[error("No shell defined for OS '{0}' and no default shell")]
    NoShell(String),
}

/// Expression, property and argument evaluation errors
#[derive(Error, Debug)]
pub enum EvalError {
    #[error("{0}")]
    Script(String),

    #[error("Invalid expression syntax: {0}")]
    InvalidSyntax(String),

    #[error("Could not resolve properties {names:?}: {cause}")]
    Unresolved { names: Vec<String>, cause: String },

    #[error("Invalid arguments for task '{task}': {source}")]
    Arguments {
        task: String,
        source: ArgumentError,
    },

    #[error("Environment variable '{name}' must evaluate to a string, got {actual}")]
    NotAString { name: String, actual: String },

    #[error("Invalid environment value for '{0}'")]
    InvalidEnvironment(String),

    #[error("Failed to load dotenv file '{}': {message}", .path.display())]
    Dotenv { path: PathBuf, message: String },

    #[error("Failed to load configuration file '{}': {message}", .path.display())]
    Configuration { path: PathBuf, message: String },

    #[error("Singleton port must be an integer between 1 and 65535, got {0}")]
    InvalidPort(String),

    #[error("Skip condition must evaluate to a boolean, got {0}")]
    NotABoolean(String),
}

impl From<mlua::Error> for EvalError {
    fn from(err: mlua::Error) -> Self {
        EvalError::Script(err.to_string())
    }
}

impl From<mlua::Error> for BuildError {
    fn from(err: mlua::Error) -> Self {
        BuildError::Evaluation(err.into())
    }
}

/// Argument schema violations, reported with the field that caused them
#[derive(Error, Debug)]
pub enum ArgumentError {
    #[error("unknown argument '{0}'")]
    Unknown(String),

    #[error("missing mandatory argument '{0}'")]
    Missing(String),

    #[error("argument '{field}' must be {expected}, got {actual}")]
    Shape {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("argument '{field}': {message}")]
    Steps { field: String, message: String },
}

/// Target and task execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Infinite loop in targets: {0}")]
    Cycle(String),

    #[error("Command failed with exit code {0:?}")]
    CommandFailed(Option<i32>),

    #[error("Failed to start command '{command}': {error}")]
    CommandStart { command: String, error: String },

    #[error("{0}")]
    Thrown(String),

    #[error("Another instance is running (port {port} is busy: {error})")]
    SingletonBusy { port: u16, error: String },

    #[error("Threads count must be positive, got {0}")]
    InvalidThreads(i64),

    #[error("Worker {0} panicked")]
    WorkerPanic(usize),
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for resolution operations
pub type ResolutionResult<T> = std::result::Result<T, ResolutionError>;

/// Specialized result type for evaluation operations
pub type EvalResult<T> = std::result::Result<T, EvalError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;
