//! `MockNode` — a test double for `ExecutableNode`.
//!
//! Useful in runner tests where touching the filesystem or a store is
//! irrelevant.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{
    ExecutableNode, ExecutionContext, LoadError, NodeError, NodeInputs, Output, PersistError,
    Table,
};

/// Behaviour injected into `MockNode` at construction time.
pub enum MockBehaviour {
    /// Return a clone of the given table.
    ReturnTable(Table),
    /// Fail every call with a non-retryable load error.
    FailLoad,
    /// Fail the first `n` calls with a transient store error, then persist.
    FailTransient(usize),
}

/// A mock node that records every call it receives and returns a
/// programmer-specified result.
pub struct MockNode {
    /// Label used in errors and test assertions.
    pub name: String,
    /// What the node will do when `execute` is called.
    pub behaviour: MockBehaviour,
    /// Upstream names seen by each call (sorted, in call order).
    pub calls: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MockNode {
    fn with(name: impl Into<String>, behaviour: MockBehaviour) -> Self {
        Self {
            name: name.into(),
            behaviour,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that always succeeds with the given table.
    pub fn returning(name: impl Into<String>, table: Table) -> Self {
        Self::with(name, MockBehaviour::ReturnTable(table))
    }

    /// Create a mock that always fails with a `LoadError`.
    pub fn failing_load(name: impl Into<String>) -> Self {
        Self::with(name, MockBehaviour::FailLoad)
    }

    /// Create a mock whose first `failures` calls fail with a retryable error.
    pub fn flaky(name: impl Into<String>, failures: usize) -> Self {
        Self::with(name, MockBehaviour::FailTransient(failures))
    }

    /// Number of times this node has been executed.
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Upstream names passed to the most recent call.
    pub fn last_inputs(&self) -> Option<Vec<String>> {
        self.calls.lock().ok().and_then(|c| c.last().cloned())
    }
}

#[async_trait]
impl ExecutableNode for MockNode {
    async fn execute(&self, inputs: &NodeInputs, _ctx: &ExecutionContext) -> Result<Output, NodeError> {
        let call = {
            let mut seen: Vec<String> = inputs.keys().cloned().collect();
            seen.sort();
            let mut calls = self.calls.lock().unwrap_or_else(|p| p.into_inner());
            calls.push(seen);
            calls.len()
        };

        match &self.behaviour {
            MockBehaviour::ReturnTable(table) => Ok(Output::Table(Arc::new(table.clone()))),
            MockBehaviour::FailLoad => Err(LoadError::MissingHeader {
                asset: self.name.clone(),
                path: format!("{}.csv", self.name).into(),
            }
            .into()),
            MockBehaviour::FailTransient(failures) if call <= *failures => {
                Err(PersistError::Connect {
                    asset: self.name.clone(),
                    source: db::DbError::Io(std::io::ErrorKind::ConnectionRefused.into()),
                }
                .into())
            }
            MockBehaviour::FailTransient(_) => Ok(Output::Persisted {
                table: self.name.clone(),
                rows: 0,
            }),
        }
    }
}
