//! `nodes` crate — the `ExecutableNode` trait and the two asset actions.
//!
//! A producer reads a CSV file into a [`Table`]; a loader writes an upstream
//! table into a store.  The engine crate dispatches execution through the
//! [`ExecutableNode`] trait object.

pub mod error;
pub mod loader;
pub mod mock;
pub mod producer;
pub mod table;
pub mod traits;

pub use error::{LoadError, NodeError, PersistError};
pub use loader::DbLoader;
pub use producer::CsvProducer;
pub use table::Table;
pub use traits::{ExecutableNode, ExecutionContext, NodeInputs, Output};
