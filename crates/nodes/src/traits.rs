//! The `ExecutableNode` trait — the contract every node action must fulfil.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{NodeError, Table};

/// Shared context passed to every node during a run.
///
/// Defined here (in the nodes crate) so both the engine and individual node
/// implementations can import it without a circular dependency.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// ID of the current run.
    pub run_id: uuid::Uuid,
    /// Name of the job being materialized.
    pub job_name: String,
}

/// What a node hands to its downstreams.
#[derive(Debug, Clone)]
pub enum Output {
    /// A materialized table (producers).
    Table(Arc<Table>),
    /// A table was written to a store (loaders).
    Persisted { table: String, rows: u64 },
}

impl Output {
    pub fn as_table(&self) -> Option<&Arc<Table>> {
        match self {
            Self::Table(table) => Some(table),
            Self::Persisted { .. } => None,
        }
    }
}

/// Outputs of a node's upstreams, keyed by upstream node name.
pub type NodeInputs = HashMap<String, Output>;

/// The core node trait.
#[async_trait]
pub trait ExecutableNode: Send + Sync {
    /// Execute the node given its upstreams' outputs and return its own.
    async fn execute(
        &self,
        inputs: &NodeInputs,
        ctx: &ExecutionContext,
    ) -> Result<Output, NodeError>;
}
