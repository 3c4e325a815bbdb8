//! Repository functions — one function per store operation.
//!
//! Every function takes a `&mut AnyConnection` and returns a `Result<T, DbError>`.
//! No business logic, no domain types — pure SQL.

pub mod tables;
