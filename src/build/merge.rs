//! Merge accessors over a build hierarchy
//!
//! Properties, environment and shell tables let the last listed parent win, while
//! targets let the first listed parent win. A definition's own entries always win.

use crate::build::{BuildDefinition, BuildId, BuildTree, Target};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Shell table used when no definition in the hierarchy declares one
pub fn default_shell() -> BTreeMap<String, Vec<String>> {
    let mut shell = BTreeMap::new();
    shell.insert(
        "default".to_string(),
        vec!["sh".to_string(), "-c".to_string()],
    );
    shell.insert(
        "windows".to_string(),
        vec!["cmd".to_string(), "/c".to_string()],
    );
    shell
}

impl BuildTree {
    /// Properties with parents folded in list order, own last
    pub fn resolved_properties(&self, id: BuildId) -> BTreeMap<String, Value> {
        let build = self.get(id);
        let mut properties = BTreeMap::new();
        for &parent in &build.parents {
            properties.extend(self.resolved_properties(parent));
        }
        properties.extend(build.properties.clone());
        properties
    }

    /// Environment entries, same precedence as properties
    pub fn resolved_environment(&self, id: BuildId) -> BTreeMap<String, Value> {
        let build = self.get(id);
        let mut environment = BTreeMap::new();
        for &parent in &build.parents {
            environment.extend(self.resolved_environment(parent));
        }
        environment.extend(build.environment.clone());
        environment
    }

    /// Shell table, same precedence as properties
    pub fn resolved_shell(&self, id: BuildId) -> BTreeMap<String, Vec<String>> {
        let shell = self.declared_shell(id);
        if shell.is_empty() {
            default_shell()
        } else {
            shell
        }
    }

    fn declared_shell(&self, id: BuildId) -> BTreeMap<String, Vec<String>> {
        let build = self.get(id);
        let mut shell = BTreeMap::new();
        for &parent in &build.parents {
            shell.extend(self.declared_shell(parent));
        }
        shell.extend(build.shell.clone());
        shell
    }

    /// Targets with parents folded in reverse list order, own last
    pub fn resolved_targets(&self, id: BuildId) -> BTreeMap<String, (BuildId, &Target)> {
        let build = self.get(id);
        let mut targets = BTreeMap::new();
        for &parent in build.parents.iter().rev() {
            targets.extend(self.resolved_targets(parent));
        }
        for (name, target) in &build.targets {
            targets.insert(name.clone(), (id, target));
        }
        targets
    }

    /// Own default targets, else the first non empty default among parents
    pub fn resolved_default_targets(&self, id: BuildId) -> Vec<String> {
        let build = self.get(id);
        if !build.default.is_empty() {
            return build.default.clone();
        }
        build
            .parents
            .iter()
            .map(|&parent| self.resolved_default_targets(parent))
            .find(|default| !default.is_empty())
            .unwrap_or_default()
    }

    /// Own target if present, else the first match among parents in list order
    pub fn resolved_target(&self, id: BuildId, name: &str) -> Option<(BuildId, &Target)> {
        if let Some(target) = self.get(id).targets.get(name) {
            return Some((id, target));
        }
        self.resolved_parent_target(id, name)
    }

    /// Same as [`resolved_target`](Self::resolved_target) with the definition itself skipped
    pub fn resolved_parent_target(&self, id: BuildId, name: &str) -> Option<(BuildId, &Target)> {
        self.get(id)
            .parents
            .iter()
            .find_map(|&parent| self.resolved_target(parent, name))
    }

    /// Own singleton port, else the first one declared among parents
    pub fn resolved_singleton(&self, id: BuildId) -> Option<&Value> {
        let build = self.get(id);
        build.singleton.as_ref().or_else(|| {
            build
                .parents
                .iter()
                .find_map(|&parent| self.resolved_singleton(parent))
        })
    }

    /// Context scripts of parents in list order, then own
    pub fn resolved_scripts(&self, id: BuildId) -> Vec<String> {
        self.concatenated(id, &|build| &build.scripts)
    }

    /// Dotenv files of parents in list order, then own
    pub fn resolved_dotenv(&self, id: BuildId) -> Vec<String> {
        self.concatenated(id, &|build| &build.dotenv)
    }

    /// Configuration files of parents in list order, then own
    pub fn resolved_configuration(&self, id: BuildId) -> Vec<String> {
        self.concatenated(id, &|build| &build.configuration)
    }

    /// Exposed property names of the whole hierarchy
    pub fn resolved_expose(&self, id: BuildId) -> Vec<String> {
        let mut expose = self.concatenated(id, &|build| &build.expose);
        expose.sort();
        expose.dedup();
        expose
    }

    fn concatenated(
        &self,
        id: BuildId,
        field: &dyn Fn(&BuildDefinition) -> &Vec<String>,
    ) -> Vec<String> {
        let build = self.get(id);
        let mut list = Vec::new();
        for &parent in &build.parents {
            list.extend(self.concatenated(parent, field));
        }
        list.extend(field(build).iter().cloned());
        list
    }
}
