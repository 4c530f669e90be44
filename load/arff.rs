//! ARFF reader.
//!
//! The header is read line by line: `@relation`, one `@attribute` per column,
//! then `@data`. Everything after `@data` is handed to a `csv` reader that
//! uses `'` as its quote character, so quoted values may contain commas.
//! Lines starting with `%` are comments in both sections.

use super::{LoadError, relation_from_path, resolve_target};
use crate::attribute::{Attribute, Dataset, DatasetError, parse_attribute};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

const FALLBACK_RELATION: &str = "dataset";

/// Reads an ARFF document. `target` names the class attribute; without it the
/// last attribute is the target.
pub fn read_arff<R: BufRead>(reader: R, target: Option<&str>) -> Result<Dataset, LoadError> {
    parse(reader, "<input>", FALLBACK_RELATION, target)
}

/// Reads an ARFF file from disk, decompressing it first if it ends in `.gz`.
/// A file without `@relation` is named after its file stem.
pub fn load_arff(path: impl AsRef<Path>, target: Option<&str>) -> Result<Dataset, LoadError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: display.clone(),
        source,
    })?;
    let input: Box<dyn Read + Send> = if path.extension().is_some_and(|ext| ext == "gz") {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };
    parse(BufReader::new(input), &display, &relation_from_path(path), target)
}

fn parse<R: BufRead>(
    mut reader: R,
    source_name: &str,
    fallback_relation: &str,
    target: Option<&str>,
) -> Result<Dataset, LoadError> {
    let mut relation: Option<String> = None;
    let mut attributes: Vec<Attribute> = Vec::new();
    let mut line = String::new();
    let mut line_number = 0usize;

    loop {
        line.clear();
        let read = reader.read_line(&mut line).map_err(|source| LoadError::Io {
            path: source_name.to_string(),
            source,
        })?;
        if read == 0 {
            return Err(LoadError::Syntax {
                line: line_number,
                message: "reached the end of the file before '@data'".to_string(),
            });
        }
        line_number += 1;

        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('%') {
            continue;
        }
        let (keyword, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword, rest.trim()),
            None => (trimmed, ""),
        };
        match keyword.to_ascii_lowercase().as_str() {
            "@relation" => relation = Some(unquote(rest).to_string()),
            "@attribute" => {
                let (name, kind) = split_declaration(rest).ok_or_else(|| LoadError::Syntax {
                    line: line_number,
                    message: format!("expected '@attribute <name> <kind>', found '{trimmed}'"),
                })?;
                attributes.push(parse_attribute(attributes.len(), name, kind)?);
            }
            "@data" => break,
            other => {
                return Err(LoadError::Syntax {
                    line: line_number,
                    message: format!("unexpected header keyword '{other}'"),
                });
            }
        }
    }

    if attributes.is_empty() {
        return Err(LoadError::NoAttributes);
    }
    let target = resolve_target(&attributes, target)?;
    let rows = read_rows(reader, attributes.len())?;

    let relation = relation
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| fallback_relation.to_string());
    Ok(Dataset::new(relation, attributes, rows, target)?)
}

/// Reads the data section. Row numbers in errors are 1-based and count data
/// rows only.
fn read_rows<R: Read>(reader: R, arity: usize) -> Result<Vec<Vec<String>>, LoadError> {
    let mut data = csv::ReaderBuilder::new()
        .has_headers(false)
        .quote(b'\'')
        .comment(Some(b'%'))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in data.records() {
        let record = record?;
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        if record.len() != arity {
            return Err(DatasetError::ArityMismatch {
                row: rows.len() + 1,
                expected: arity,
                found: record.len(),
            }
            .into());
        }
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Splits `<name> <kind>`, where the name may be quoted.
fn split_declaration(rest: &str) -> Option<(&str, &str)> {
    let (name, kind) = match rest.chars().next()? {
        quote @ ('\'' | '"') => {
            let body = &rest[1..];
            let end = body.find(quote)?;
            (&body[..end], &body[end + 1..])
        }
        _ => rest.split_once(char::is_whitespace)?,
    };
    let kind = kind.trim();
    (!kind.is_empty()).then_some((name, kind))
}

fn unquote(text: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = text.strip_prefix(quote).and_then(|t| t.strip_suffix(quote)) {
            return inner;
        }
    }
    text
}
