//! Node-level error types.

use std::path::PathBuf;

use thiserror::Error;

/// A producer could not turn its source file into a table.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file is missing or unreadable.
    #[error("asset '{asset}': cannot read '{}': {source}", .path.display())]
    Io {
        asset: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid CSV (ragged rows, bad UTF-8, …).
    #[error("asset '{asset}': cannot parse '{}': {source}", .path.display())]
    Parse {
        asset: String,
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The file has no header row.
    #[error("asset '{asset}': '{}' has no header row", .path.display())]
    MissingHeader { asset: String, path: PathBuf },
}

/// A loader could not write its table to the store.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The store is unreachable or the URL is unusable.
    #[error("asset '{asset}': cannot connect to store: {source}")]
    Connect {
        asset: String,
        #[source]
        source: db::DbError,
    },

    /// A statement or the commit failed; the write was rolled back.
    #[error("asset '{asset}': writing table '{table}' failed: {source}")]
    Write {
        asset: String,
        table: String,
        #[source]
        source: db::DbError,
    },
}

/// Errors returned by a node's `execute` method.
///
/// The runner uses [`NodeError::is_retryable`] to decide retry behaviour:
/// only transient store connection failures are retried, everything else
/// fails the node immediately.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    /// The node expected a table from an upstream that did not provide one.
    #[error("node '{node}' expected a table from upstream '{upstream}'")]
    MissingInput { node: String, upstream: String },
}

impl NodeError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Persist(PersistError::Connect { source, .. }) => source.is_transient(),
            _ => false,
        }
    }
}
