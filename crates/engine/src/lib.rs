//! `engine` crate — asset specs, the spec-to-graph translator, graph
//! validation, and a sequential job runner.

pub mod config;
pub mod dag;
pub mod error;
pub mod executor;
pub mod models;
pub mod translate;

pub use config::{load_specs, save_specs, specs_from_directory};
pub use dag::validate_graph;
pub use error::{ConfigError, EngineError};
pub use executor::{ExecutorConfig, JobExecutor, NodeRun, NodeStatus, RunReport};
pub use models::{AssetSpec, Job, Node, NodeKind, Repository};
pub use translate::{build_loader_node, build_producer_node, build_repository, translate};

#[cfg(test)]
mod executor_tests;
