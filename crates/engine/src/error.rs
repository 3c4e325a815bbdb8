//! Engine-level error types.

use std::path::PathBuf;

use thiserror::Error;

/// The asset configuration could not be read or is invalid.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("configuration file '{}' not found", .path.display())]
    NotFound { path: PathBuf },

    /// The file or directory exists but could not be read.
    #[error("cannot read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not a sequence of asset mappings.
    #[error("malformed configuration '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A record lacks `name`, `directory` or `file_name`.
    #[error("'{}': asset #{index} is missing required field '{field}'", .path.display())]
    MissingField {
        path: PathBuf,
        index: usize,
        field: &'static str,
    },

    /// Specs could not be written back out.
    #[error("cannot write '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot serialise asset specs: {0}")]
    Serialize(#[source] serde_yaml::Error),
}

/// Errors produced while turning specs into a registered graph.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Two nodes share a name (including a clash with a generated loader name).
    #[error("duplicate node name: '{0}'")]
    DuplicateName(String),

    /// A node lists an upstream that no node provides.
    #[error("node '{node}' depends on unknown upstream '{upstream}'")]
    UnknownUpstream { node: String, upstream: String },

    /// The dependency graph is not acyclic.
    #[error("dependency graph contains a cycle through: {}", .nodes.join(", "))]
    CycleDetected { nodes: Vec<String> },
}
