//! # Dataset Loaders
//!
//! Turn files on disk into a validated [`Dataset`]. ARFF files (optionally
//! gzip-compressed) carry declared attribute kinds; headered CSV/TSV files
//! have their kinds inferred from the column types polars detects.

pub mod arff;
pub mod tabular;

use crate::attribute::{Attribute, Dataset, DatasetError};
use polars::prelude::PolarsError;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed data section: {0}")]
    Csv(#[from] csv::Error),
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    Polars(#[from] PolarsError),
    #[error("Syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("The file declares no attributes.")]
    NoAttributes,
    #[error("Target attribute '{0}' was not found. Please check spelling and case.")]
    MissingTarget(String),
    #[error("Unsupported dataset format '{0}'; expected .arff, .arff.gz, .csv or .tsv.")]
    UnsupportedFormat(String),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// File formats `load_dataset` recognises by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Arff,
    Delimited(u8),
}

impl DatasetFormat {
    pub fn detect(path: &Path) -> Result<Self, LoadError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if name.ends_with(".arff") || name.ends_with(".arff.gz") {
            Ok(Self::Arff)
        } else if name.ends_with(".tsv") {
            Ok(Self::Delimited(b'\t'))
        } else if name.ends_with(".csv") {
            Ok(Self::Delimited(b','))
        } else {
            Err(LoadError::UnsupportedFormat(path.display().to_string()))
        }
    }
}

/// Loads `path` with the reader its extension calls for. `target` names the
/// class column; without it the last column is used.
pub fn load_dataset(path: impl AsRef<Path>, target: Option<&str>) -> Result<Dataset, LoadError> {
    let path = path.as_ref();
    let dataset = match DatasetFormat::detect(path)? {
        DatasetFormat::Arff => arff::load_arff(path, target)?,
        DatasetFormat::Delimited(separator) => tabular::load_delimited(path, separator, target)?,
    };
    log::info!(
        "Loaded '{}' from {}: {} attributes, {} instances, target '{}'.",
        dataset.relation(),
        path.display(),
        dataset.attributes().len(),
        dataset.instances().len(),
        dataset.target_attribute().name
    );
    Ok(dataset)
}

/// Column index of the target: the named attribute, or the last one.
fn resolve_target(attributes: &[Attribute], target: Option<&str>) -> Result<usize, LoadError> {
    match target {
        Some(name) => attributes
            .iter()
            .position(|a| a.name == name)
            .ok_or_else(|| LoadError::MissingTarget(name.to_string())),
        None => attributes
            .len()
            .checked_sub(1)
            .ok_or(LoadError::NoAttributes),
    }
}

/// The file name without any of the extensions `load_dataset` understands.
fn relation_from_path(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut stem = name.as_str();
    for suffix in [".gz", ".arff", ".csv", ".tsv"] {
        if let Some(stripped) = stem.strip_suffix(suffix) {
            stem = stripped;
        }
    }
    stem.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeKind;

    #[test]
    fn formats_follow_extensions() {
        assert_eq!(DatasetFormat::detect(Path::new("d/x.arff")).unwrap(), DatasetFormat::Arff);
        assert_eq!(DatasetFormat::detect(Path::new("x.ARFF.gz")).unwrap(), DatasetFormat::Arff);
        assert_eq!(
            DatasetFormat::detect(Path::new("x.tsv")).unwrap(),
            DatasetFormat::Delimited(b'\t')
        );
        assert!(matches!(
            DatasetFormat::detect(Path::new("x.parquet")),
            Err(LoadError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn target_defaults_to_the_last_column() {
        let attributes = vec![
            Attribute::new(0, "a", AttributeKind::Boolean),
            Attribute::new(1, "class", AttributeKind::Boolean),
        ];
        assert_eq!(resolve_target(&attributes, None).unwrap(), 1);
        assert_eq!(resolve_target(&attributes, Some("a")).unwrap(), 0);
        assert!(matches!(
            resolve_target(&attributes, Some("b")),
            Err(LoadError::MissingTarget(name)) if name == "b"
        ));
        assert!(matches!(resolve_target(&[], None), Err(LoadError::NoAttributes)));
    }

    #[test]
    fn relation_names_drop_known_extensions() {
        assert_eq!(relation_from_path(Path::new("/tmp/speed.arff.gz")), "speed");
        assert_eq!(relation_from_path(Path::new("speed.csv")), "speed");
        assert_eq!(relation_from_path(Path::new("speed")), "speed");
    }
}
