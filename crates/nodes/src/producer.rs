//! `CsvProducer` — reads one CSV file into a [`Table`].

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::{ExecutableNode, ExecutionContext, LoadError, NodeError, NodeInputs, Output, Table};

/// Producer action for a CSV-backed asset.
///
/// Upstream outputs are ignored: a producer's upstreams only order it after
/// other assets, they do not feed it data.
#[derive(Debug, Clone)]
pub struct CsvProducer {
    asset: String,
    path: PathBuf,
}

impl CsvProducer {
    pub fn new(asset: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            asset: asset.into(),
            path: path.into(),
        }
    }

    /// Read and parse the file.
    pub async fn load(&self) -> Result<Table, LoadError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| LoadError::Io {
                asset: self.asset.clone(),
                path: self.path.clone(),
                source,
            })?;

        let table =
            Table::from_csv_reader(bytes.as_slice()).map_err(|source| LoadError::Parse {
                asset: self.asset.clone(),
                path: self.path.clone(),
                source,
            })?;

        if table.columns.is_empty() {
            return Err(LoadError::MissingHeader {
                asset: self.asset.clone(),
                path: self.path.clone(),
            });
        }

        Ok(table)
    }
}

#[async_trait]
impl ExecutableNode for CsvProducer {
    #[instrument(skip_all, fields(asset = %self.asset, run_id = %ctx.run_id))]
    async fn execute(&self, _inputs: &NodeInputs, ctx: &ExecutionContext) -> Result<Output, NodeError> {
        let table = self.load().await?;
        info!(
            rows = table.row_count(),
            columns = table.columns.len(),
            "loaded {}",
            self.path.display()
        );
        Ok(Output::Table(Arc::new(table)))
    }
}
