//! Raw build file types
//!
//! This module defines the data structures that represent a build file as written, before
//! steps are parsed and the inheritance hierarchy is resolved.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// Top-level keys accepted in a build file
pub const BUILD_FILE_FIELDS: &[&str] = &[
    "doc",
    "default",
    "extends",
    "repository",
    "context",
    "singleton",
    "shell",
    "properties",
    "configuration",
    "expose",
    "environment",
    "dotenv",
    "targets",
    "version",
];

/// Top-level build file structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BuildFile {
    /// Build documentation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    /// Default target(s)
    #[serde(default, deserialize_with = "string_or_list")]
    pub default: Vec<String>,

    /// Parent builds, in precedence order
    #[serde(default, deserialize_with = "string_or_list")]
    pub extends: Vec<String>,

    /// Repository root for parent lookup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    /// Script sources run when the context is initialized
    #[serde(default, deserialize_with = "string_or_list")]
    pub context: Vec<String>,

    /// Port (or expression) for the single-instance guard
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub singleton: Option<Value>,

    /// Shell command prefix per OS (or `default`)
    #[serde(default)]
    pub shell: BTreeMap<String, ShellCommand>,

    /// Raw properties
    #[serde(default)]
    pub properties: Mapping,

    /// YAML files merged over properties
    #[serde(default, deserialize_with = "string_or_list")]
    pub configuration: Vec<String>,

    /// Public property names
    #[serde(default, deserialize_with = "string_or_list")]
    pub expose: Vec<String>,

    /// Raw environment entries
    #[serde(default)]
    pub environment: BTreeMap<String, Value>,

    /// Dotenv files loaded into the environment
    #[serde(default, deserialize_with = "string_or_list")]
    pub dotenv: Vec<String>,

    /// Targets defined in this file
    #[serde(default)]
    pub targets: BTreeMap<String, TargetConfig>,

    /// Semver requirement on the engine version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// A target as written in a build file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Documentation for help text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    /// Targets to run before this one
    #[serde(default, deserialize_with = "string_or_list")]
    pub depends: Vec<String>,

    /// Skip condition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unless: Option<Value>,

    /// Raw steps
    #[serde(default)]
    pub steps: Vec<Value>,
}

/// A shell command prefix, written either as a single word or a list
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ShellCommand {
    Single(String),
    Multiple(Vec<String>),
}

impl ShellCommand {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            ShellCommand::Single(s) => vec![s],
            ShellCommand::Multiple(v) => v,
        }
    }
}

/// Custom deserializer for fields that accept a single string or a list of strings
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    let value = Value::deserialize(deserializer)?;

    match value {
        Value::String(s) => Ok(vec![s]),
        Value::Sequence(seq) => {
            let mut items = Vec::new();
            for item in seq {
                match item {
                    Value::String(s) => items.push(s),
                    other => {
                        return Err(D::Error::custom(format!(
                            "expected a string in list, got {:?}",
                            other
                        )))
                    }
                }
            }
            Ok(items)
        }
        Value::Null => Ok(Vec::new()),
        _ => Err(D::Error::custom("expected a string or a list of strings")),
    }
}
