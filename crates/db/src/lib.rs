//! `db` crate — pure persistence layer.
//!
//! Opens scoped connections to any store `sqlx::any` can reach and exposes
//! repository functions over them.  No business logic lives here.

pub mod connection;
pub mod error;
pub mod models;
pub mod repository;

pub use connection::{close, connect, normalize_url};
pub use error::DbError;
pub use models::{Column, ColumnType, Value};
