//! Core domain models.
//!
//! An [`AssetSpec`] is one record of the YAML configuration.  Translation
//! turns specs into immutable [`Node`] descriptors, which are registered in a
//! [`Repository`] together with the single [`Job`] that materializes them.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use nodes::ExecutableNode;
use serde::{Deserialize, Serialize};

use crate::{dag::validate_graph, EngineError};

// ---------------------------------------------------------------------------
// AssetSpec
// ---------------------------------------------------------------------------

/// Declarative description of one CSV-backed asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSpec {
    /// Unique asset name; also the name of its producer node and store table.
    pub name: String,
    pub directory: PathBuf,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Names this asset must wait for.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub upstreams: BTreeSet<String>,
    /// When set, a loader node writes this asset into the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
}

impl AssetSpec {
    pub fn new(
        name: impl Into<String>,
        directory: impl Into<PathBuf>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            directory: directory.into(),
            file_name: file_name.into(),
            description: None,
            upstreams: BTreeSet::new(),
            database_url: None,
        }
    }

    /// Spec for `directory/file_name`, named after the file without `.csv`.
    pub fn from_csv_file(directory: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        let file_name = file_name.into();
        let name = file_name
            .strip_suffix(".csv")
            .unwrap_or(&file_name)
            .to_owned();
        Self::new(name, directory, file_name)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_upstream(mut self, upstream: impl Into<String>) -> Self {
        self.upstreams.insert(upstream.into());
        self
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// `directory` joined with `file_name`.
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }

    /// The configured description, or one generated from the file name.
    pub fn description(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("Asset generated from {}", self.file_name))
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// What a node's action does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Reads a CSV file and yields a table.
    Producer,
    /// Writes one producer's table to a store.
    Loader,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Producer => write!(f, "producer"),
            Self::Loader => write!(f, "loader"),
        }
    }
}

/// A named unit of work with its declared upstream edges.
#[derive(Clone)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub description: String,
    pub upstreams: BTreeSet<String>,
    pub action: Arc<dyn ExecutableNode>,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("description", &self.description)
            .field("upstreams", &self.upstreams)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Job / Repository
// ---------------------------------------------------------------------------

/// A request to materialize a set of nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    /// Node names the job materializes.
    pub selection: Vec<String>,
}

/// Validated registration: every node plus one job selecting all of them.
#[derive(Debug, Clone)]
pub struct Repository {
    nodes: Vec<Node>,
    job: Job,
    order: Vec<String>,
}

impl Repository {
    /// Register `nodes` under a job named `job_name`.
    ///
    /// # Errors
    /// Whatever [`validate_graph`] rejects: duplicate names, unknown
    /// upstreams, or cycles.
    pub fn new(job_name: impl Into<String>, nodes: Vec<Node>) -> Result<Self, EngineError> {
        let order = validate_graph(&nodes)?;
        let job = Job {
            name: job_name.into(),
            selection: nodes.iter().map(|n| n.name.clone()).collect(),
        };
        Ok(Self { nodes, job, order })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    /// Node names in a dependency-respecting order.
    pub fn execution_order(&self) -> &[String] {
        &self.order
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }
}
