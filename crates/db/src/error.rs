//! Typed error type for the db crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("I/O error preparing store: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported database URL '{0}'")]
    UnsupportedUrl(String),

    #[error("table '{0}' has no columns")]
    NoColumns(String),
}

impl DbError {
    /// Whether retrying the same operation might succeed.
    ///
    /// Only network-level I/O failures count; a missing or unwritable store
    /// file fails the same way every time.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Io(err) => is_transient_io(err),
            Self::Sqlx(sqlx::Error::Io(err)) => is_transient_io(err),
            Self::Sqlx(err) => matches!(err, sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed),
            Self::UnsupportedUrl(_) | Self::NoColumns(_) => false,
        }
    }
}

fn is_transient_io(err: &std::io::Error) -> bool {
    use std::io::ErrorKind;

    matches!(
        err.kind(),
        ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::BrokenPipe
            | ErrorKind::TimedOut
            | ErrorKind::Interrupted
    )
}
