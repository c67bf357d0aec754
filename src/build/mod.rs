//! Build definitions and their inheritance hierarchy
//!
//! A loaded build file and all of its transitive parents live in a [`BuildTree`]
//! arena. Definitions refer to their parents by [`BuildId`], so a parent reachable
//! through several `extends` paths is loaded once.

pub mod load;
pub mod merge;
pub mod target;

pub use load::LoadOptions;
pub use target::{Step, Target};

use semver::VersionReq;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Index of a definition in a [`BuildTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BuildId(pub(crate) usize);

/// One loaded build file
#[derive(Debug, Clone)]
pub struct BuildDefinition {
    /// Path of the build file
    pub file: PathBuf,

    /// Working directory of the build
    pub dir: PathBuf,

    /// Directory the engine was invoked from
    pub here: PathBuf,

    /// Repository root used to find parents
    pub repository: PathBuf,

    /// Build documentation
    pub doc: String,

    /// Default target names
    pub default: Vec<String>,

    /// Raw `extends` references
    pub extends: Vec<String>,

    /// Resolved parents, same order as `extends`
    pub parents: Vec<BuildId>,

    /// Context script sources
    pub scripts: Vec<String>,

    /// Singleton port expression
    pub singleton: Option<Value>,

    /// Shell command prefix per OS
    pub shell: BTreeMap<String, Vec<String>>,

    /// Raw properties
    pub properties: BTreeMap<String, Value>,

    /// Configuration files merged over properties
    pub configuration: Vec<String>,

    /// Public property names
    pub expose: Vec<String>,

    /// Raw environment entries
    pub environment: BTreeMap<String, Value>,

    /// Dotenv files
    pub dotenv: Vec<String>,

    /// Engine version requirement
    pub version: Option<VersionReq>,

    /// Targets declared in this file
    pub targets: BTreeMap<String, Target>,

    /// The definition that was originally loaded
    pub root: BuildId,
}

/// Arena of the definitions of one build hierarchy
#[derive(Debug, Clone)]
pub struct BuildTree {
    builds: Vec<BuildDefinition>,
    root: BuildId,
}

impl BuildTree {
    /// Identifier of the root definition
    pub fn root_id(&self) -> BuildId {
        self.root
    }

    /// The root definition
    pub fn root(&self) -> &BuildDefinition {
        self.get(self.root)
    }

    /// Definition by identifier
    pub fn get(&self, id: BuildId) -> &BuildDefinition {
        &self.builds[id.0]
    }

    /// All definitions, parents before children
    pub fn builds(&self) -> impl Iterator<Item = (BuildId, &BuildDefinition)> {
        self.builds
            .iter()
            .enumerate()
            .map(|(index, build)| (BuildId(index), build))
    }

    /// Number of definitions in the hierarchy
    pub fn len(&self) -> usize {
        self.builds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builds.is_empty()
    }
}
