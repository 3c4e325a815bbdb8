//! `DbLoader` — writes an upstream table into a store, replacing it.

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::{ExecutableNode, ExecutionContext, NodeError, NodeInputs, Output, PersistError};

/// Loader action for an asset with a `database_url`.
#[derive(Clone)]
pub struct DbLoader {
    asset: String,
    upstream: String,
    table: String,
    database_url: String,
}

// The URL may carry credentials.
impl std::fmt::Debug for DbLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbLoader")
            .field("asset", &self.asset)
            .field("upstream", &self.upstream)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl DbLoader {
    /// `upstream` is the producer whose table is written to `table`.
    pub fn new(
        asset: impl Into<String>,
        upstream: impl Into<String>,
        table: impl Into<String>,
        database_url: impl Into<String>,
    ) -> Self {
        Self {
            asset: asset.into(),
            upstream: upstream.into(),
            table: table.into(),
            database_url: database_url.into(),
        }
    }
}

#[async_trait]
impl ExecutableNode for DbLoader {
    #[instrument(skip_all, fields(asset = %self.asset, table = %self.table, run_id = %ctx.run_id))]
    async fn execute(&self, inputs: &NodeInputs, ctx: &ExecutionContext) -> Result<Output, NodeError> {
        let table = inputs
            .get(&self.upstream)
            .and_then(Output::as_table)
            .ok_or_else(|| NodeError::MissingInput {
                node: self.asset.clone(),
                upstream: self.upstream.clone(),
            })?;

        let mut conn = db::connect(&self.database_url)
            .await
            .map_err(|source| PersistError::Connect {
                asset: self.asset.clone(),
                source,
            })?;

        // On error `conn` is dropped here, which rolls back and releases it.
        let rows = db::repository::tables::replace_table(
            &mut conn,
            &self.table,
            &table.columns,
            &table.rows,
        )
        .await
        .map_err(|source| PersistError::Write {
            asset: self.asset.clone(),
            table: self.table.clone(),
            source,
        })?;

        db::close(conn).await;

        info!(rows, "table '{}' replaced", self.table);
        Ok(Output::Persisted {
            table: self.table.clone(),
            rows,
        })
    }
}
