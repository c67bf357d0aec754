//! Build file validation
//!
//! Checks that go beyond what the typed decoding enforces.

use crate::config::types::BUILD_FILE_FIELDS;
use crate::error::{ConfigError, ConfigResult};
use semver::{Version, VersionReq};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Reject unknown top-level keys
pub fn check_fields(value: &Value) -> ConfigResult<()> {
    let mapping = value
        .as_mapping()
        .ok_or_else(|| ConfigError::Invalid("build file must be a mapping".to_string()))?;

    for key in mapping.keys() {
        let name = key
            .as_str()
            .ok_or_else(|| ConfigError::Invalid(format!("non-string key {:?}", key)))?;
        if !BUILD_FILE_FIELDS.contains(&name) {
            return Err(ConfigError::UnknownField(name.to_string()));
        }
    }

    Ok(())
}

/// Convert a raw properties mapping into a map keyed by name
pub fn property_map(mapping: Mapping) -> ConfigResult<BTreeMap<String, Value>> {
    let mut properties = BTreeMap::new();
    for (key, value) in mapping {
        match key {
            Value::String(name) => {
                properties.insert(name, value);
            }
            other => {
                return Err(ConfigError::Invalid(format!(
                    "property names must be strings, got {:?}",
                    other
                )))
            }
        }
    }
    Ok(properties)
}

/// Parse a version requirement and check it against the engine version
pub fn check_version(path: &Path, requirement: Option<&str>) -> ConfigResult<Option<VersionReq>> {
    let Some(requirement) = requirement else {
        return Ok(None);
    };

    let req = VersionReq::parse(requirement).map_err(|e| {
        ConfigError::Invalid(format!("invalid version requirement '{}': {}", requirement, e))
    })?;
    let actual = Version::parse(crate::VERSION)
        .map_err(|e| ConfigError::Invalid(format!("invalid engine version: {}", e)))?;

    if !req.matches(&actual) {
        return Err(ConfigError::Version {
            path: path.to_path_buf(),
            required: requirement.to_string(),
            actual: actual.to_string(),
        });
    }

    Ok(Some(req))
}

/// Validate a shell table
pub fn validate_shell(shell: &BTreeMap<String, Vec<String>>) -> ConfigResult<()> {
    for (os, command) in shell {
        if command.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "shell for '{}' must not be empty",
                os
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_fields_accepts_known_keys() {
        let value: Value = serde_yaml::from_str("doc: x\ndefault: t\nproperties: {}\n").unwrap();
        assert!(check_fields(&value).is_ok());
    }

    #[test]
    fn test_check_fields_rejects_unknown() {
        let value: Value = serde_yaml::from_str("doc: x\nfoo: 1\n").unwrap();
        assert!(matches!(
            check_fields(&value),
            Err(ConfigError::UnknownField(ref f)) if f == "foo"
        ));
    }

    #[test]
    fn test_property_map_rejects_non_string_keys() {
        let mapping: Mapping = serde_yaml::from_str("1: one\n").unwrap();
        assert!(property_map(mapping).is_err());
    }

    #[test]
    fn test_check_version() {
        let path = Path::new("build.yml");
        assert!(check_version(path, None).unwrap().is_none());
        assert!(check_version(path, Some(">=0.0.1")).unwrap().is_some());
        assert!(matches!(
            check_version(path, Some(">=99.0.0")),
            Err(ConfigError::Version { .. })
        ));
        assert!(matches!(
            check_version(path, Some("not a version")),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_validate_shell_rejects_empty_command() {
        let mut shell = BTreeMap::new();
        shell.insert("default".to_string(), Vec::new());
        assert!(validate_shell(&shell).is_err());
    }
}
