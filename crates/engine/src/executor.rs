//! Sequential job runner.
//!
//! `JobExecutor` materializes a [`Repository`]'s job in-process:
//! 1. Walks nodes in the repository's topological order.
//! 2. Hands each node the outputs of its upstreams, keyed by name.
//! 3. Retries retryable failures (transient store errors) up to
//!    `max_retries` with exponential back-off.
//! 4. Marks every node downstream of a failure as skipped; independent
//!    branches keep running.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use nodes::{ExecutionContext, NodeError, NodeInputs, Output};

use crate::{Node, NodeKind, Repository};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for the executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum number of times a retryable node failure will be retried.
    pub max_retries: u32,
    /// Base delay for exponential back-off between retries.
    pub retry_base_delay: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_base_delay: Duration::from_millis(100),
        }
    }
}

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

/// Final state of one node in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NodeStatus {
    Succeeded,
    Failed { error: String },
    /// Not executed because `upstream` failed or was itself skipped.
    Skipped { upstream: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeRun {
    pub name: String,
    pub kind: NodeKind,
    #[serde(flatten)]
    pub status: NodeStatus,
    /// Times the action was invoked (0 when skipped).
    pub attempts: u32,
}

/// The result of materializing a job.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub job_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One entry per node, in execution order.
    pub nodes: Vec<NodeRun>,
}

impl RunReport {
    /// `true` when every node succeeded.
    pub fn succeeded(&self) -> bool {
        self.nodes.iter().all(|n| n.status == NodeStatus::Succeeded)
    }

    pub fn status_of(&self, name: &str) -> Option<&NodeStatus> {
        self.nodes.iter().find(|n| n.name == name).map(|n| &n.status)
    }

    pub fn failures(&self) -> impl Iterator<Item = &NodeRun> {
        self.nodes
            .iter()
            .filter(|n| matches!(n.status, NodeStatus::Failed { .. }))
    }
}

// ---------------------------------------------------------------------------
// JobExecutor
// ---------------------------------------------------------------------------

/// Stateless runner for a repository's job.
#[derive(Debug, Clone, Default)]
pub struct JobExecutor {
    config: ExecutorConfig,
}

impl JobExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Run every node selected by the repository's job.
    ///
    /// Node failures never abort the run; they are recorded in the report.
    #[instrument(skip_all, fields(job = %repository.job().name))]
    pub async fn run(&self, repository: &Repository) -> RunReport {
        let job = repository.job();
        let ctx = ExecutionContext {
            run_id: Uuid::new_v4(),
            job_name: job.name.clone(),
        };
        let started_at = Utc::now();
        let selected: HashSet<&str> = job.selection.iter().map(String::as_str).collect();

        info!(
            run_id = %ctx.run_id,
            "materializing {} nodes in order: {:?}",
            job.selection.len(),
            repository.execution_order()
        );

        let mut outputs: HashMap<String, Output> = HashMap::new();
        // Nodes whose downstreams must not run (failed or skipped).
        let mut blocked: HashSet<String> = HashSet::new();
        let mut runs: Vec<NodeRun> = Vec::with_capacity(selected.len());

        for name in repository.execution_order() {
            if !selected.contains(name.as_str()) {
                continue;
            }
            let Some(node) = repository.node(name) else {
                continue;
            };

            if let Some(upstream) = node.upstreams.iter().find(|u| blocked.contains(*u)) {
                warn!("node '{}' skipped: upstream '{}' did not succeed", name, upstream);
                blocked.insert(name.clone());
                runs.push(NodeRun {
                    name: name.clone(),
                    kind: node.kind,
                    status: NodeStatus::Skipped {
                        upstream: upstream.clone(),
                    },
                    attempts: 0,
                });
                continue;
            }

            let inputs: NodeInputs = node
                .upstreams
                .iter()
                .filter_map(|u| outputs.get(u).map(|o| (u.clone(), o.clone())))
                .collect();

            let (result, attempts) = self.execute_with_retry(node, &inputs, &ctx).await;

            let status = match result {
                Ok(output) => {
                    info!("node '{}' succeeded", name);
                    outputs.insert(name.clone(), output);
                    NodeStatus::Succeeded
                }
                Err(err) => {
                    error!("node '{}' failed after {} attempt(s): {}", name, attempts, err);
                    blocked.insert(name.clone());
                    NodeStatus::Failed {
                        error: err.to_string(),
                    }
                }
            };

            runs.push(NodeRun {
                name: name.clone(),
                kind: node.kind,
                status,
                attempts,
            });
        }

        let report = RunReport {
            run_id: ctx.run_id,
            job_name: ctx.job_name,
            started_at,
            finished_at: Utc::now(),
            nodes: runs,
        };

        if report.succeeded() {
            info!("job '{}' run {} succeeded", report.job_name, report.run_id);
        } else {
            error!(
                "job '{}' run {} finished with {} failed node(s)",
                report.job_name,
                report.run_id,
                report.failures().count()
            );
        }

        report
    }

    // -----------------------------------------------------------------------
    // Internal: execute a single node with retry logic.
    // -----------------------------------------------------------------------

    async fn execute_with_retry(
        &self,
        node: &Node,
        inputs: &NodeInputs,
        ctx: &ExecutionContext,
    ) -> (Result<Output, NodeError>, u32) {
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match node.action.execute(inputs, ctx).await {
                Ok(output) => return (Ok(output), attempts),

                Err(err) if err.is_retryable() && attempts <= self.config.max_retries => {
                    let delay = self.config.retry_base_delay * 2u32.pow(attempts - 1);

                    warn!(
                        "node '{}' retryable error (attempt {}/{}), retrying in {:?}: {}",
                        node.name,
                        attempts,
                        self.config.max_retries + 1,
                        delay,
                        err
                    );

                    tokio::time::sleep(delay).await;
                }

                Err(err) => return (Err(err), attempts),
            }
        }
    }
}
