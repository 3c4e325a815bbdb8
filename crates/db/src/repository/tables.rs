//! Whole-table writes.

use sqlx::{AnyConnection, Connection};
use tracing::debug;

use crate::{
    models::{Column, Value},
    DbError,
};

/// Placeholder dialect of the connected backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    /// `?` (SQLite, MySQL)
    Question,
    /// `$1`, `$2`, … (PostgreSQL)
    Dollar,
}

impl Placeholder {
    fn of(conn: &AnyConnection) -> Self {
        if conn.backend_name().eq_ignore_ascii_case("postgresql") {
            Self::Dollar
        } else {
            Self::Question
        }
    }
}

/// Quote an identifier with double quotes, doubling any embedded quote.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn create_table_sql(table: &str, columns: &[Column]) -> String {
    let defs: Vec<String> = columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), c.column_type.sql_type()))
        .collect();
    format!("CREATE TABLE {} ({})", quote_ident(table), defs.join(", "))
}

/// NULL cells are written as literals so only typed values are bound.
fn insert_sql(table: &str, columns: &[Column], row: &[Value], placeholder: Placeholder) -> String {
    let names: Vec<String> = columns.iter().map(|c| quote_ident(&c.name)).collect();
    let mut bound = 0usize;
    let values: Vec<String> = row
        .iter()
        .map(|v| {
            if v.is_null() {
                "NULL".to_owned()
            } else {
                bound += 1;
                match placeholder {
                    Placeholder::Question => "?".to_owned(),
                    Placeholder::Dollar => format!("${bound}"),
                }
            }
        })
        .collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        names.join(", "),
        values.join(", ")
    )
}

/// Replace `table` with the given columns and rows.
///
/// Drop, create and every insert run inside one transaction: if any
/// statement fails the transaction is rolled back on drop and the previous
/// table (if any) is left as it was.
///
/// Returns the number of rows written.
///
/// # Errors
/// - [`DbError::NoColumns`] if `columns` is empty.
/// - [`DbError::Sqlx`] for any statement or commit failure.
pub async fn replace_table(
    conn: &mut AnyConnection,
    table: &str,
    columns: &[Column],
    rows: &[Vec<Value>],
) -> Result<u64, DbError> {
    if columns.is_empty() {
        return Err(DbError::NoColumns(table.to_owned()));
    }

    let placeholder = Placeholder::of(conn);
    let mut tx = conn.begin().await?;

    sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)))
        .execute(&mut *tx)
        .await?;
    sqlx::query(&create_table_sql(table, columns))
        .execute(&mut *tx)
        .await?;

    let mut written = 0u64;
    for row in rows {
        let sql = insert_sql(table, columns, row, placeholder);
        let mut query = sqlx::query(&sql);
        for value in row {
            query = match value {
                Value::Null => query,
                Value::Integer(i) => query.bind(*i),
                Value::Real(f) => query.bind(*f),
                Value::Text(s) => query.bind(s.as_str()),
            };
        }
        written += query.execute(&mut *tx).await?.rows_affected();
    }

    tx.commit().await?;
    debug!(table, rows = written, "table replaced");

    Ok(written)
}
