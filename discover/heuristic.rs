//! # Quality Heuristics
//!
//! Pure scoring functions over the confusion counts of a subgroup:
//!
//! - `p`: covered positives, `n`: covered negatives
//! - `P`: all positives, `N`: all negatives
//!
//! The formulas follow Fürnkranz & Flach, "ROC 'n' Rule Learning", Machine
//! Learning 58(1), 2005. WRAcc and chi-squared score [`SENTINEL_SCORE`] for
//! empty coverage or a missing class; [`QualityHeuristic::score`] turns any
//! other non-finite result into the same sentinel so such groups sort last.

use crate::confusion::ConfusionMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Score assigned when a heuristic does not produce a finite number.
pub const SENTINEL_SCORE: f64 = f64::NEG_INFINITY;

/// A scoring function over `(p, n, P, N)`.
pub trait QualityHeuristic: Send + Sync {
    fn name(&self) -> &str;

    /// Human-readable formula, shown in reports.
    fn formula(&self) -> &str {
        ""
    }

    /// The raw formula. May be NaN or infinite for degenerate counts.
    #[allow(non_snake_case)]
    fn raw_score(&self, p: f64, n: f64, P: f64, N: f64) -> f64;

    fn score(&self, counts: &ConfusionMatrix) -> f64 {
        let raw = self.raw_score(
            counts.covered_positive as f64,
            counts.covered_negative as f64,
            counts.positive_total as f64,
            counts.negative_total as f64,
        );
        if raw.is_finite() { raw } else { SENTINEL_SCORE }
    }
}

/// The built-in heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Heuristic {
    /// Weighted relative accuracy.
    #[default]
    Wracc,
    Sensitivity,
    Specificity,
    ChiSquared,
}

impl Heuristic {
    pub const ALL: [Heuristic; 4] = [
        Heuristic::Wracc,
        Heuristic::Sensitivity,
        Heuristic::Specificity,
        Heuristic::ChiSquared,
    ];
}

impl QualityHeuristic for Heuristic {
    fn name(&self) -> &str {
        match self {
            Self::Wracc => "Weighted relative accuracy",
            Self::Sensitivity => "Sensitivity quality measure",
            Self::Specificity => "Specificity quality measure",
            Self::ChiSquared => "Chi-squared",
        }
    }

    fn formula(&self) -> &str {
        match self {
            Self::Wracc => "((p + n) / (P + N)) * (p / (p + n) - P / (P + N))",
            Self::Sensitivity => "p / P",
            Self::Specificity => "1 - n / N",
            Self::ChiSquared => {
                "(((p * N - P * n) ^ 2) / (P + N)) * ((P + N) ^ 2 / (P * N * (p + n) * (P + N - p - n)))"
            }
        }
    }

    #[allow(non_snake_case)]
    fn raw_score(&self, p: f64, n: f64, P: f64, N: f64) -> f64 {
        match self {
            // both need a covered row and both classes present
            Self::Wracc | Self::ChiSquared if p + n == 0.0 || P * N == 0.0 => SENTINEL_SCORE,
            Self::Wracc => ((p + n) / (P + N)) * (p / (p + n) - P / (P + N)),
            Self::Sensitivity => p / P,
            Self::Specificity => 1.0 - n / N,
            Self::ChiSquared => {
                let cross = p * N - P * n;
                let total = P + N;
                ((cross * cross) / total) * ((total * total) / (P * N * (p + n) * (total - p - n)))
            }
        }
    }
}

impl fmt::Display for Heuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
