//! Store connections.
//!
//! Every loader opens exactly one connection for the duration of its write,
//! so there is no pool here.  URLs may be written the SQLAlchemy way
//! (`sqlite:///relative.db`, `postgresql+psycopg2://…`); they are rewritten
//! into the form `sqlx` expects before connecting.

use std::path::Path;

use sqlx::{AnyConnection, Connection};
use tracing::{debug, warn};

use crate::DbError;

/// A parsed store location.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    /// `path == None` means an in-memory database.
    Sqlite {
        path: Option<String>,
        query: Option<String>,
    },
    Postgres {
        rest: String,
    },
}

impl Target {
    fn parse(database_url: &str) -> Result<Self, DbError> {
        let (scheme, rest) = database_url
            .split_once(':')
            .ok_or_else(|| DbError::UnsupportedUrl(database_url.to_owned()))?;

        // `postgresql+psycopg2` → `postgresql`
        let scheme = scheme.split('+').next().unwrap_or(scheme);

        match scheme {
            "sqlite" => {
                let location = if let Some(stripped) = rest.strip_prefix("///") {
                    stripped
                } else if let Some(stripped) = rest.strip_prefix("//") {
                    stripped
                } else {
                    rest
                };

                let (path, query) = match location.split_once('?') {
                    Some((p, q)) => (p, Some(q.to_owned())),
                    None => (location, None),
                };

                let path = match path {
                    "" | ":memory:" => None,
                    p => Some(p.to_owned()),
                };

                Ok(Self::Sqlite { path, query })
            }
            "postgres" | "postgresql" => Ok(Self::Postgres {
                rest: rest.to_owned(),
            }),
            _ => Err(DbError::UnsupportedUrl(database_url.to_owned())),
        }
    }

    fn backend(&self) -> &'static str {
        match self {
            Self::Sqlite { .. } => "sqlite",
            Self::Postgres { .. } => "postgres",
        }
    }

    fn to_url(&self) -> String {
        match self {
            Self::Sqlite { path: None, .. } => "sqlite::memory:".to_owned(),
            Self::Sqlite {
                path: Some(path),
                query,
            } => {
                // The store is created on first write, like SQLAlchemy does.
                let query = match query {
                    Some(q) if q.split('&').any(|kv| kv.starts_with("mode=")) => q.clone(),
                    Some(q) if !q.is_empty() => format!("{q}&mode=rwc"),
                    _ => "mode=rwc".to_owned(),
                };
                // Opaque `sqlite:` form: no authority for the URL parser to
                // validate, and sqlx percent-decodes the path back.
                format!("sqlite:{}?{query}", encode_path(path))
            }
            Self::Postgres { rest } => format!("postgres:{rest}"),
        }
    }
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

/// Rewrite `database_url` into the form `sqlx::any` connects with.
///
/// # Errors
/// [`DbError::UnsupportedUrl`] for schemes other than SQLite and PostgreSQL.
pub fn normalize_url(database_url: &str) -> Result<String, DbError> {
    Target::parse(database_url).map(|t| t.to_url())
}

/// Open a single connection to `database_url`.
///
/// For file-backed SQLite stores the parent directory is created first.
/// The caller owns the connection; dropping it releases it.
pub async fn connect(database_url: &str) -> Result<AnyConnection, DbError> {
    sqlx::any::install_default_drivers();

    let target = Target::parse(database_url)?;

    if let Target::Sqlite {
        path: Some(path), ..
    } = &target
    {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
    }

    debug!(backend = target.backend(), "opening store connection");
    let conn = AnyConnection::connect(&target.to_url()).await?;
    Ok(conn)
}

/// Close a connection after a successful write.
///
/// The data is already committed, so a failed close is only logged.
pub async fn close(conn: AnyConnection) {
    if let Err(err) = conn.close().await {
        warn!("closing store connection failed: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn sqlalchemy_relative_sqlite_url_becomes_relative_path() {
        assert_eq!(
            normalize_url("sqlite:///example.db").unwrap(),
            "sqlite:example.db?mode=rwc"
        );
        assert_eq!(
            normalize_url("sqlite:///data/example.db").unwrap(),
            "sqlite:data/example.db?mode=rwc"
        );
    }

    #[test]
    fn sqlalchemy_absolute_sqlite_url_keeps_leading_slash() {
        assert_eq!(
            normalize_url("sqlite:////var/data/x.db").unwrap(),
            "sqlite:/var/data/x.db?mode=rwc"
        );
    }

    #[test]
    fn relative_path_with_space_is_escaped() {
        let url = normalize_url("sqlite:///my data/x y.db").unwrap();
        assert_eq!(url, "sqlite:my%20data/x%20y.db?mode=rwc");
        sqlx::any::AnyConnectOptions::from_str(&url).expect("sqlx accepts the rewritten URL");
    }

    #[test]
    fn reserved_characters_in_path_are_escaped() {
        assert_eq!(
            normalize_url("sqlite:////tmp/a%41b#1.db").unwrap(),
            "sqlite:/tmp/a%2541b%231.db?mode=rwc"
        );
    }

    #[test]
    fn explicit_mode_is_preserved() {
        assert_eq!(
            normalize_url("sqlite:///x.db?mode=ro").unwrap(),
            "sqlite:x.db?mode=ro"
        );
        assert_eq!(
            normalize_url("sqlite:///x.db?cache=shared").unwrap(),
            "sqlite:x.db?cache=shared&mode=rwc"
        );
    }

    #[test]
    fn empty_sqlite_url_is_in_memory() {
        assert_eq!(normalize_url("sqlite://").unwrap(), "sqlite::memory:");
        assert_eq!(normalize_url("sqlite::memory:").unwrap(), "sqlite::memory:");
    }

    #[test]
    fn postgres_driver_suffix_is_stripped() {
        assert_eq!(
            normalize_url("postgresql+psycopg2://u:p@localhost/db").unwrap(),
            "postgres://u:p@localhost/db"
        );
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        assert!(matches!(
            normalize_url("oracle://scott@db"),
            Err(DbError::UnsupportedUrl(_))
        ));
        assert!(matches!(
            normalize_url("no-scheme-here"),
            Err(DbError::UnsupportedUrl(_))
        ));
    }

    async fn create_and_close(path: &Path) {
        let url = format!("sqlite:///{}", path.display());
        let mut conn = connect(&url).await.unwrap();
        sqlx::query("CREATE TABLE t (x BIGINT)")
            .execute(&mut conn)
            .await
            .unwrap();
        close(conn).await;
    }

    #[tokio::test]
    async fn absolute_path_with_space_is_opened_literally() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("my data").join("store file.db");

        create_and_close(&path).await;

        assert!(path.exists(), "expected {} to exist", path.display());
    }

    #[tokio::test]
    async fn absolute_path_with_percent_is_not_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a%41b.db");

        create_and_close(&path).await;

        assert!(path.exists(), "expected {} to exist", path.display());
        assert!(!dir.path().join("aAb.db").exists());
    }
}
