//! Spec-to-graph translation.
//!
//! Each spec becomes a producer node named after the asset and, if it has a
//! `database_url`, a loader node `{name}_db_load` whose only upstream is the
//! producer.  Translation is a pure mapping and performs no validation;
//! [`build_repository`] validates the result at registration time.

use std::collections::BTreeSet;
use std::sync::Arc;

use nodes::{CsvProducer, DbLoader};

use crate::{AssetSpec, EngineError, Node, NodeKind, Repository};

/// Appended to an asset name to form its loader node's name.
pub const LOADER_SUFFIX: &str = "_db_load";

/// Name of the umbrella job when none is given.
pub const DEFAULT_JOB_NAME: &str = "process_csvs_job";

/// Producer node for `spec`: reads `directory/file_name`.
pub fn build_producer_node(spec: &AssetSpec) -> Node {
    Node {
        name: spec.name.clone(),
        kind: NodeKind::Producer,
        description: spec.description(),
        upstreams: spec.upstreams.clone(),
        action: Arc::new(CsvProducer::new(&spec.name, spec.path())),
    }
}

/// Loader node for `spec`, or `None` without a `database_url`.
///
/// The loader replaces the store table named after the asset.
pub fn build_loader_node(spec: &AssetSpec) -> Option<Node> {
    let url = spec.database_url.as_ref()?;
    let name = format!("{}{LOADER_SUFFIX}", spec.name);

    Some(Node {
        description: format!("Loads asset {} into the database", spec.name),
        kind: NodeKind::Loader,
        upstreams: BTreeSet::from([spec.name.clone()]),
        action: Arc::new(DbLoader::new(&name, &spec.name, &spec.name, url)),
        name,
    })
}

/// Nodes for every spec, in input order: each producer is followed by its
/// loader (if any).
pub fn translate(specs: &[AssetSpec]) -> Vec<Node> {
    specs
        .iter()
        .flat_map(|spec| std::iter::once(build_producer_node(spec)).chain(build_loader_node(spec)))
        .collect()
}

/// Translate `specs` and register the nodes under a single job.
///
/// # Errors
/// Duplicate names, unknown upstreams and cycles are rejected here.
pub fn build_repository(
    specs: &[AssetSpec],
    job_name: impl Into<String>,
) -> Result<Repository, EngineError> {
    Repository::new(job_name, translate(specs))
}
