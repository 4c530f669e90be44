//! Comparison metrics used by predicates.
//!
//! Each metric maps to a plain comparator function through [`Metric::comparator`];
//! there is no per-variant behaviour beyond that table.

use crate::attribute::{AttributeKind, Cell};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    /// `==`: numeric equality when both sides are numbers, string equality otherwise.
    Eq,
    /// `>=`: numeric only.
    GtEq,
    /// `<=`: numeric only.
    LtEq,
}

type Comparator = fn(Cell<'_>, Cell<'_>) -> bool;

fn equal(left: Cell<'_>, right: Cell<'_>) -> bool {
    match (left.number, right.number) {
        (Some(l), Some(r)) => l == r,
        _ => left.raw == right.raw,
    }
}

fn greater_or_equal(left: Cell<'_>, right: Cell<'_>) -> bool {
    matches!((left.number, right.number), (Some(l), Some(r)) if l >= r)
}

fn less_or_equal(left: Cell<'_>, right: Cell<'_>) -> bool {
    matches!((left.number, right.number), (Some(l), Some(r)) if l <= r)
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Eq, Metric::GtEq, Metric::LtEq];

    fn comparator(self) -> Comparator {
        match self {
            Self::Eq => equal,
            Self::GtEq => greater_or_equal,
            Self::LtEq => less_or_equal,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::GtEq => ">=",
            Self::LtEq => "<=",
        }
    }

    /// Compares an instance value (`left`) against a cutoff (`right`).
    /// An unknown value on either side never matches.
    pub fn compare(self, left: &str, right: &str) -> bool {
        self.compare_cells(Cell::new(left), Cell::new(right))
    }

    /// [`Metric::compare`] over values whose numbers are already parsed.
    pub fn compare_cells(self, left: Cell<'_>, right: Cell<'_>) -> bool {
        if left.is_unknown() || right.is_unknown() {
            return false;
        }
        (self.comparator())(left, right)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// The comparators a predicate on an attribute of `kind` may use.
pub fn applicable_metrics(kind: AttributeKind) -> &'static [Metric] {
    kind.metrics()
}
