//! Loading and saving asset specifications.
//!
//! The configuration is a YAML sequence of mappings:
//!
//! ```yaml
//! - name: orders
//!   directory: /data
//!   file_name: orders.csv
//!   upstreams: [customers]
//!   database_url: sqlite:///warehouse.db
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::{AssetSpec, ConfigError};

/// One record as written in the file, before required fields are checked.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAssetSpec {
    name: Option<String>,
    directory: Option<PathBuf>,
    file_name: Option<String>,
    description: Option<String>,
    upstreams: Option<BTreeSet<String>>,
    database_url: Option<String>,
}

impl RawAssetSpec {
    fn into_spec(self, path: &Path, index: usize) -> Result<AssetSpec, ConfigError> {
        let missing = |field| ConfigError::MissingField {
            path: path.to_owned(),
            index,
            field,
        };

        let name = self
            .name
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| missing("name"))?;
        let directory = self
            .directory
            .filter(|d| !d.as_os_str().is_empty())
            .ok_or_else(|| missing("directory"))?;
        let file_name = self
            .file_name
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| missing("file_name"))?;

        Ok(AssetSpec {
            name,
            directory,
            file_name,
            description: self.description,
            upstreams: self.upstreams.unwrap_or_default(),
            database_url: self.database_url,
        })
    }
}

/// Parse YAML text; `path` is only used for error context.
pub fn parse_specs(text: &str, path: &Path) -> Result<Vec<AssetSpec>, ConfigError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let raw: Vec<RawAssetSpec> =
        serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;

    raw.into_iter()
        .enumerate()
        .map(|(index, r)| r.into_spec(path, index))
        .collect()
}

/// Read the asset list at `path`, preserving record order.
///
/// # Errors
/// - [`ConfigError::NotFound`] if the file does not exist.
/// - [`ConfigError::Read`] for other I/O failures.
/// - [`ConfigError::Parse`] for malformed YAML or unknown keys.
/// - [`ConfigError::MissingField`] if a required field is absent or blank.
pub fn load_specs(path: impl AsRef<Path>) -> Result<Vec<AssetSpec>, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_owned(),
            }
        } else {
            ConfigError::Read {
                path: path.to_owned(),
                source,
            }
        }
    })?;

    let specs = parse_specs(&text, path)?;
    info!("loaded {} asset specs from {}", specs.len(), path.display());
    Ok(specs)
}

/// Write `specs` in the format [`load_specs`] reads.
pub fn save_specs(path: impl AsRef<Path>, specs: &[AssetSpec]) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let text = serde_yaml::to_string(specs).map_err(ConfigError::Serialize)?;
    std::fs::write(path, text).map_err(|source| ConfigError::Write {
        path: path.to_owned(),
        source,
    })?;
    debug!("wrote {} asset specs to {}", specs.len(), path.display());
    Ok(())
}

/// One spec per `*.csv` file in `directory`, sorted by file name.
///
/// Names come from [`AssetSpec::from_csv_file`]; every spec gets
/// `database_url` when one is given.
pub fn specs_from_directory(
    directory: impl AsRef<Path>,
    database_url: Option<&str>,
) -> Result<Vec<AssetSpec>, ConfigError> {
    let directory = directory.as_ref();
    let read_err = |source| ConfigError::Read {
        path: directory.to_owned(),
        source,
    };

    let mut file_names = Vec::new();
    for entry in std::fs::read_dir(directory).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        let is_file = entry.file_type().map_err(read_err)?.is_file();
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if is_file && file_name.ends_with(".csv") {
            file_names.push(file_name);
        }
    }
    file_names.sort();

    let specs: Vec<AssetSpec> = file_names
        .into_iter()
        .map(|f| {
            let spec = AssetSpec::from_csv_file(directory, f);
            match database_url {
                Some(url) => spec.with_database_url(url),
                None => spec,
            }
        })
        .collect();

    info!("found {} CSV files in {}", specs.len(), directory.display());
    Ok(specs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Result<Vec<AssetSpec>, ConfigError> {
        parse_specs(text, Path::new("assets.yaml"))
    }

    #[test]
    fn parses_records_in_order_with_defaults() {
        let specs = parse(
            r#"
- name: customers
  directory: /data
  file_name: customers.csv
- name: orders
  directory: /data
  file_name: orders.csv
  description: Daily orders
  upstreams: [customers, customers]
  database_url: sqlite:///x.db
"#,
        )
        .unwrap();

        assert_eq!(
            specs,
            vec![
                AssetSpec::new("customers", "/data", "customers.csv"),
                AssetSpec::new("orders", "/data", "orders.csv")
                    .with_description("Daily orders")
                    .with_upstream("customers")
                    .with_database_url("sqlite:///x.db"),
            ]
        );
    }

    #[test]
    fn null_upstreams_mean_none() {
        let specs = parse("- {name: a, directory: d, file_name: a.csv, upstreams: ~}").unwrap();
        assert!(specs[0].upstreams.is_empty());
    }

    #[test]
    fn empty_document_is_empty_list() {
        assert!(parse("  \n").unwrap().is_empty());
        assert!(parse("[]").unwrap().is_empty());
    }

    #[test]
    fn missing_required_field_names_record_and_field() {
        let err = parse(
            r#"
- {name: a, directory: d, file_name: a.csv}
- {name: b, file_name: b.csv}
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingField { index: 1, field: "directory", .. }
        ));
    }

    #[test]
    fn blank_name_counts_as_missing() {
        let err = parse("- {name: '  ', directory: d, file_name: a.csv}").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field: "name", .. }));
    }

    #[test]
    fn unknown_key_is_a_parse_error() {
        let err = parse("- {name: a, directory: d, file_name: a.csv, upstream: [b]}").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn mapping_document_is_a_parse_error() {
        let err = parse("name: a\ndirectory: d\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_specs(dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assets.yaml");
        let specs = vec![
            AssetSpec::new("a", "/data/in", "a.csv"),
            AssetSpec::new("b", "rel/dir", "b.csv")
                .with_description("")
                .with_upstream("a")
                .with_upstream("z")
                .with_database_url("postgres://u:p@h/db"),
        ];

        save_specs(&path, &specs).unwrap();
        assert_eq!(load_specs(&path).unwrap(), specs);
    }

    #[test]
    fn directory_scan_picks_csv_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for f in ["b.csv", "a.csv", "notes.txt"] {
            std::fs::write(dir.path().join(f), "x\n1\n").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.csv")).unwrap();

        let specs = specs_from_directory(dir.path(), Some("sqlite:///x.db")).unwrap();
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(specs.iter().all(|s| s.database_url.as_deref() == Some("sqlite:///x.db")));
    }

    #[test]
    fn directory_scan_of_missing_directory_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = specs_from_directory(dir.path().join("gone"), None).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
