//! # Attribute and Instance Model
//!
//! Typed columns and the raw rows they index into. An attribute's `id` is its
//! column position in every instance row; `Dataset::new` refuses to build a
//! dataset where that correspondence does not hold.
//!
//! Values are kept exactly as the loader produced them. The literal `?` marks a
//! missing value for every kind of attribute.

use crate::metric::Metric;
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The marker used for missing values in every column.
pub const UNKNOWN_VALUE: &str = "?";

/// Errors raised while assembling or indexing a dataset.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DatasetError {
    #[error(
        "Row/attribute arity mismatch in row {row}: expected {expected} values but the row holds {found}."
    )]
    ArityMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Target column {target} is out of range for a dataset with {attributes} attributes.")]
    TargetOutOfRange { target: usize, attributes: usize },
    #[error("Column {column} declares an unsupported attribute kind '{declared}'.")]
    UnknownKind { column: usize, declared: String },
    #[error("Column {column} declares a malformed integer range list '{declared}'.")]
    MalformedRange { column: usize, declared: String },
    #[error("Attribute at position {position} carries id {id}; ids must equal column positions.")]
    AttributeIdMismatch { position: usize, id: usize },
}

/// The kind tag of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttributeKind {
    Boolean,
    Numeric,
    Set,
    Range,
}

/// Per-kind behaviour, looked up instead of dispatched.
struct KindRules {
    metrics: &'static [Metric],
    numeric_values: bool,
}

const BOOLEAN_RULES: KindRules = KindRules {
    metrics: &[Metric::Eq],
    numeric_values: false,
};
const NUMERIC_RULES: KindRules = KindRules {
    metrics: &[Metric::Eq, Metric::GtEq, Metric::LtEq],
    numeric_values: true,
};
const SET_RULES: KindRules = KindRules {
    metrics: &[Metric::Eq],
    numeric_values: false,
};
const RANGE_RULES: KindRules = KindRules {
    metrics: &[Metric::Eq],
    numeric_values: false,
};

impl AttributeKind {
    fn rules(self) -> &'static KindRules {
        match self {
            Self::Boolean => &BOOLEAN_RULES,
            Self::Numeric => &NUMERIC_RULES,
            Self::Set => &SET_RULES,
            Self::Range => &RANGE_RULES,
        }
    }

    /// Comparators a predicate on this kind may use.
    pub fn metrics(self) -> &'static [Metric] {
        self.rules().metrics
    }

    /// Whether the values of this kind are ordered numbers.
    pub fn is_numeric(self) -> bool {
        self.rules().numeric_values
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Numeric => "numeric",
            Self::Set => "set",
            Self::Range => "range",
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// An inclusive integer interval such as `[18-25]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange {
    pub min: i64,
    pub max: i64,
}

impl IntRange {
    /// Parses the `[lo-hi]` notation. Both bounds must be non-negative integers.
    pub fn parse(text: &str) -> Option<Self> {
        let inner = text.trim().strip_prefix('[')?.strip_suffix(']')?;
        let (lo, hi) = inner.split_once('-')?;
        let min = lo.trim().parse::<u32>().ok()?;
        let max = hi.trim().parse::<u32>().ok()?;
        Some(Self {
            min: i64::from(min),
            max: i64::from(max),
        })
    }
}

impl fmt::Display for IntRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}-{}]", self.min, self.max)
    }
}

/// A typed column. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: usize,
    pub name: String,
    pub kind: AttributeKind,
    /// Declared categories (Set), range labels (Range) or `0`/`1` (Boolean).
    /// Empty for Numeric columns.
    pub domain: Vec<String>,
}

impl Attribute {
    pub fn new(id: usize, name: impl Into<String>, kind: AttributeKind) -> Self {
        let domain = match kind {
            AttributeKind::Boolean => vec!["0".to_string(), "1".to_string()],
            _ => Vec::new(),
        };
        Self {
            id,
            name: name.into(),
            kind,
            domain,
        }
    }

    pub fn with_domain(mut self, domain: Vec<String>) -> Self {
        self.domain = domain;
        self
    }

    /// The declared ranges of a Range attribute, in declaration order.
    pub fn ranges(&self) -> Vec<IntRange> {
        if self.kind != AttributeKind::Range {
            return Vec::new();
        }
        self.domain.iter().filter_map(|d| IntRange::parse(d)).collect()
    }
}

/// Builds an attribute from a declared kind such as `numeric`, `{0,1}`,
/// `{red,green}` or `{[0-5],[6-10]}`.
pub fn parse_attribute(
    column: usize,
    name: impl Into<String>,
    declared_kind: &str,
) -> Result<Attribute, DatasetError> {
    let declared = declared_kind.trim();
    let lowered = declared.to_ascii_lowercase();
    if matches!(lowered.as_str(), "numeric" | "real" | "integer") {
        return Ok(Attribute::new(column, name, AttributeKind::Numeric));
    }

    let Some(inner) = declared
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
    else {
        return Err(DatasetError::UnknownKind {
            column,
            declared: declared.to_string(),
        });
    };

    let items: Vec<String> = split_nominal_list(inner);
    if items.is_empty() {
        return Err(DatasetError::UnknownKind {
            column,
            declared: declared.to_string(),
        });
    }

    let mut sorted: Vec<&str> = items.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    if sorted == ["0", "1"] {
        return Ok(Attribute::new(column, name, AttributeKind::Boolean));
    }

    if items.iter().any(|item| item.starts_with('[')) {
        if items.iter().any(|item| IntRange::parse(item).is_none()) {
            return Err(DatasetError::MalformedRange {
                column,
                declared: declared.to_string(),
            });
        }
        return Ok(Attribute::new(column, name, AttributeKind::Range).with_domain(items));
    }

    Ok(Attribute::new(column, name, AttributeKind::Set).with_domain(items))
}

/// Splits the body of a `{...}` declaration, honouring single-quoted items.
fn split_nominal_list(inner: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in inner.chars() {
        match c {
            '\'' => quoted = !quoted,
            ',' if !quoted => {
                items.push(std::mem::take(&mut current));
            }
            other => current.push(other),
        }
    }
    items.push(current);
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// A single value viewed with its numeric interpretation, if it has one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell<'a> {
    pub raw: &'a str,
    pub number: Option<f64>,
}

impl<'a> Cell<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self {
            raw,
            number: parse_number(raw),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.raw == UNKNOWN_VALUE
    }
}

/// Parses a finite floating-point number; anything else is `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    if raw == UNKNOWN_VALUE {
        return None;
    }
    lexical_core::parse::<f64>(raw.as_bytes())
        .ok()
        .filter(|value| value.is_finite())
}

/// One row of raw values. Numeric interpretations are computed once, up front.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    row: usize,
    values: Vec<String>,
    numbers: Vec<Option<f64>>,
}

impl Instance {
    pub fn new(row: usize, values: Vec<String>) -> Self {
        let numbers = values.iter().map(|v| parse_number(v)).collect();
        Self {
            row,
            values,
            numbers,
        }
    }

    /// Zero-based position of this row in its dataset.
    pub fn row(&self) -> usize {
        self.row
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// The raw value this row holds for `attribute`.
    pub fn value(&self, attribute: &Attribute) -> Result<&str, DatasetError> {
        self.cell(attribute.id).map(|cell| cell.raw)
    }

    pub fn cell(&self, column: usize) -> Result<Cell<'_>, DatasetError> {
        match (self.values.get(column), self.numbers.get(column)) {
            (Some(raw), Some(number)) => Ok(Cell {
                raw,
                number: *number,
            }),
            _ => Err(DatasetError::ArityMismatch {
                row: self.row,
                expected: column + 1,
                found: self.values.len(),
            }),
        }
    }
}

/// Free-function form of [`Instance::value`].
pub fn get_value<'a>(instance: &'a Instance, attribute: &Attribute) -> Result<&'a str, DatasetError> {
    instance.value(attribute)
}

/// A read-only table of attributes, rows and the binary target column.
#[derive(Debug, Clone)]
pub struct Dataset {
    relation: String,
    attributes: Vec<Attribute>,
    instances: Vec<Instance>,
    target: usize,
}

impl Dataset {
    /// Validates and assembles a dataset. Every row must hold exactly one value
    /// per attribute and every attribute id must equal its position.
    pub fn new(
        relation: impl Into<String>,
        attributes: Vec<Attribute>,
        rows: Vec<Vec<String>>,
        target: usize,
    ) -> Result<Self, DatasetError> {
        for (position, attribute) in attributes.iter().enumerate() {
            if attribute.id != position {
                return Err(DatasetError::AttributeIdMismatch {
                    position,
                    id: attribute.id,
                });
            }
        }
        if target >= attributes.len() {
            return Err(DatasetError::TargetOutOfRange {
                target,
                attributes: attributes.len(),
            });
        }

        let mut instances = Vec::with_capacity(rows.len());
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != attributes.len() {
                return Err(DatasetError::ArityMismatch {
                    row,
                    expected: attributes.len(),
                    found: values.len(),
                });
            }
            instances.push(Instance::new(row, values));
        }

        Ok(Self {
            relation: relation.into(),
            attributes,
            instances,
            target,
        })
    }

    pub fn relation(&self) -> &str {
        &self.relation
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn target_attribute(&self) -> &Attribute {
        &self.attributes[self.target]
    }

    pub fn attribute_by_name(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Whether the row's target value matches `positive_label`. Unknown targets
    /// are never positive.
    pub fn is_positive(&self, instance: &Instance, positive_label: &str) -> Result<bool, DatasetError> {
        let cell = instance.cell(self.target)?;
        Ok(!cell.is_unknown() && Metric::Eq.compare_cells(cell, Cell::new(positive_label)))
    }

    /// Positive flags for every row, in row order.
    pub fn positive_mask(&self, positive_label: &str) -> Result<Vec<bool>, DatasetError> {
        self.instances
            .iter()
            .map(|instance| self.is_positive(instance, positive_label))
            .collect()
    }

    /// `(positives, negatives)` over all rows.
    pub fn class_balance(&self, positive_label: &str) -> Result<(usize, usize), DatasetError> {
        let mask = self.positive_mask(positive_label)?;
        let positives = mask.iter().filter(|&&p| p).count();
        Ok((positives, mask.len() - positives))
    }

    /// Distinct known values of a column, in order of first appearance.
    pub fn distinct_values(&self, attribute: &Attribute) -> Result<Vec<String>, DatasetError> {
        let mut seen = AHashSet::new();
        let mut values = Vec::new();
        for instance in &self.instances {
            let value = instance.value(attribute)?;
            if value != UNKNOWN_VALUE && seen.insert(value) {
                values.push(value.to_string());
            }
        }
        Ok(values)
    }
}
