//! Loading a build file and its parents

use crate::build::{BuildDefinition, BuildId, BuildTree, Target};
use crate::config::{check_version, parse_build_file, property_map, validate_shell, BuildFile};
use crate::error::{BuildError, ConfigError, ResolutionError, Result};
use crate::tasks::Registry;
use crate::utils::{absolute, default_repository, resolve_path};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Options that apply to a whole hierarchy
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Invocation directory
    pub here: PathBuf,

    /// Repository override
    pub repository: Option<PathBuf>,

    /// Run in the invocation directory instead of the build directory
    pub template: bool,
}

impl LoadOptions {
    /// Options for an invocation from the current directory
    pub fn new() -> Self {
        LoadOptions {
            here: absolute(Path::new(".")),
            repository: None,
            template: false,
        }
    }

    /// Set the invocation directory
    pub fn with_here(mut self, here: PathBuf) -> Self {
        self.here = here;
        self
    }

    /// Override the repository root
    pub fn with_repository(mut self, repository: PathBuf) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Enable template mode
    pub fn with_template(mut self, template: bool) -> Self {
        self.template = template;
        self
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildTree {
    /// Load a build file and, recursively, every parent it extends
    pub fn load(path: &Path, registry: &Registry, options: &LoadOptions) -> Result<BuildTree> {
        let mut loader = Loader {
            registry,
            options,
            builds: Vec::new(),
            index: HashMap::new(),
            loading: Vec::new(),
            repository: None,
        };

        let root = loader.load(&absolute(path))?;
        let mut tree = BuildTree {
            builds: loader.builds,
            root,
        };
        tree.propagate(options);
        Ok(tree)
    }

    /// Make every definition agree on directories and root
    fn propagate(&mut self, options: &LoadOptions) {
        let root = self.root;
        let (dir, repository) = {
            let build = self.get(root);
            let dir = if options.template {
                options.here.clone()
            } else {
                build.dir.clone()
            };
            (dir, build.repository.clone())
        };

        for build in &mut self.builds {
            build.dir = dir.clone();
            build.here = options.here.clone();
            build.repository = repository.clone();
            build.root = root;
        }
    }
}

/// Parent lookup: a literal path first, then under the repository root
pub fn find_parent(entry: &str, dir: &Path, repository: &Path) -> Result<PathBuf> {
    let literal = resolve_path(dir, entry);
    if literal.is_file() {
        return Ok(literal);
    }

    let in_repository = resolve_path(repository, entry);
    if in_repository.is_file() {
        return Ok(in_repository);
    }

    Err(ResolutionError::ParentNotFound(entry.to_string()).into())
}

struct Loader<'a> {
    registry: &'a Registry,
    options: &'a LoadOptions,
    builds: Vec<BuildDefinition>,
    index: HashMap<PathBuf, BuildId>,
    loading: Vec<PathBuf>,
    repository: Option<PathBuf>,
}

impl Loader<'_> {
    fn load(&mut self, path: &Path) -> Result<BuildId> {
        let path = path
            .canonicalize()
            .map_err(|e| BuildError::from(e).in_file(path))?;

        if let Some(&id) = self.index.get(&path) {
            return Ok(id);
        }

        if self.loading.contains(&path) {
            let mut chain: Vec<String> = self
                .loading
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            chain.push(path.display().to_string());
            return Err(ConfigError::ExtendsCycle(chain.join(" -> ")).into());
        }

        self.loading.push(path.clone());
        let result = self.load_file(&path);
        self.loading.pop();

        let build = result.map_err(|e| e.in_file(&path))?;
        let id = BuildId(self.builds.len());
        self.builds.push(build);
        self.index.insert(path, id);
        Ok(id)
    }

    fn load_file(&mut self, path: &Path) -> Result<BuildDefinition> {
        let file = parse_build_file(path)?;
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        // The first file loaded is the root and fixes the repository for the hierarchy
        let repository = match &self.repository {
            Some(repository) => repository.clone(),
            None => {
                let repository = match (&self.options.repository, &file.repository) {
                    (Some(repository), _) => repository.clone(),
                    (None, Some(declared)) => resolve_path(&dir, declared),
                    (None, None) => default_repository(),
                };
                self.repository = Some(repository.clone());
                repository
            }
        };

        let mut parents = Vec::with_capacity(file.extends.len());
        for entry in &file.extends {
            let parent = find_parent(entry, &dir, &repository)?;
            parents.push(self.load(&parent)?);
        }

        definition(path, dir, repository, file, parents, self.registry, &self.options.here)
    }
}

fn definition(
    path: &Path,
    dir: PathBuf,
    repository: PathBuf,
    file: BuildFile,
    parents: Vec<BuildId>,
    registry: &Registry,
    here: &Path,
) -> Result<BuildDefinition> {
    let version = check_version(path, file.version.as_deref())?;

    let shell: BTreeMap<String, Vec<String>> = file
        .shell
        .into_iter()
        .map(|(os, command)| (os, command.into_vec()))
        .collect();
    validate_shell(&shell)?;

    let mut targets = BTreeMap::new();
    for (name, config) in file.targets {
        let target = Target::from_config(&name, config, registry)?;
        targets.insert(name, target);
    }

    Ok(BuildDefinition {
        file: path.to_path_buf(),
        dir,
        here: here.to_path_buf(),
        repository,
        doc: file.doc.unwrap_or_default(),
        default: file.default,
        extends: file.extends,
        parents,
        scripts: file.context,
        singleton: file.singleton,
        shell,
        properties: property_map(file.properties)?,
        configuration: file.configuration,
        expose: file.expose,
        environment: file.environment,
        dotenv: file.dotenv,
        version,
        targets,
        root: BuildId(0),
    })
}
