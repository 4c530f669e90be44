//! Headered CSV/TSV reader built on polars.
//!
//! Column kinds are inferred from the dtypes polars detects:
//!
//! - Boolean columns, and integer columns holding only 0 and 1, become Boolean.
//! - Other integer and float columns become Numeric.
//! - Everything else becomes a Set over the distinct values seen.
//!
//! Nulls, and cells reading `?`, are stored as the unknown marker.

use super::{LoadError, relation_from_path, resolve_target};
use crate::attribute::{Attribute, AttributeKind, Dataset, UNKNOWN_VALUE};
use ahash::AHashSet;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Loads a delimited file whose first line holds the column names.
pub fn load_delimited(
    path: impl AsRef<Path>,
    separator: u8,
    target: Option<&str>,
) -> Result<Dataset, LoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let df = CsvReader::new(file)
        .with_options(
            CsvReadOptions::default()
                .with_has_header(true)
                .with_parse_options(
                    CsvParseOptions::default()
                        .with_separator(separator)
                        .with_null_values(Some(NullValues::AllColumnsSingle(UNKNOWN_VALUE.into()))),
                ),
        )
        .finish()?;

    let height = df.height();
    let mut attributes = Vec::with_capacity(df.width());
    let mut columns: Vec<Vec<String>> = Vec::with_capacity(df.width());
    for (id, column) in df.get_columns().iter().enumerate() {
        let series = column.as_materialized_series();
        let (kind, values) = column_values(series)?;
        let attribute = match kind {
            AttributeKind::Set => Attribute::new(id, series.name().as_str(), kind)
                .with_domain(distinct_known(&values)),
            _ => Attribute::new(id, series.name().as_str(), kind),
        };
        attributes.push(attribute);
        columns.push(values);
    }

    let target = resolve_target(&attributes, target)?;
    let rows: Vec<Vec<String>> = (0..height)
        .map(|row| columns.iter().map(|column| column[row].clone()).collect())
        .collect();
    Ok(Dataset::new(relation_from_path(path), attributes, rows, target)?)
}

/// Infers a column's kind and renders its cells as strings.
fn column_values(series: &Series) -> Result<(AttributeKind, Vec<String>), LoadError> {
    let dtype = series.dtype();
    if dtype == &DataType::Boolean {
        let values = series
            .bool()?
            .into_iter()
            .map(|cell| match cell {
                Some(true) => "1".to_string(),
                Some(false) => "0".to_string(),
                None => UNKNOWN_VALUE.to_string(),
            })
            .collect();
        return Ok((AttributeKind::Boolean, values));
    }

    let values = render(series)?;
    let kind = if dtype.is_integer() && values.iter().all(|v| matches!(v.as_str(), "0" | "1" | "?")) {
        AttributeKind::Boolean
    } else if dtype.is_integer() || dtype.is_float() {
        AttributeKind::Numeric
    } else {
        AttributeKind::Set
    };
    Ok((kind, values))
}

fn render(series: &Series) -> Result<Vec<String>, LoadError> {
    let text = series.cast(&DataType::String)?;
    Ok(text
        .str()?
        .into_iter()
        .map(|cell| cell.unwrap_or(UNKNOWN_VALUE).to_string())
        .collect())
}

fn distinct_known(values: &[String]) -> Vec<String> {
    let mut seen = AHashSet::new();
    values
        .iter()
        .filter(|v| v.as_str() != UNKNOWN_VALUE && seen.insert(v.as_str()))
        .cloned()
        .collect()
}
