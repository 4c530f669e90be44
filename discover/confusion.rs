//! # Confusion-Matrix Evaluation
//!
//! A single pass over the dataset tallies, for one group, how many rows it
//! covers per class. Rows whose coverage cannot be decided because of a
//! missing value are kept out of the covered counts but still count toward
//! the class totals.
//!
//! Counts depend only on the group's predicates, never on the heuristic, so an
//! [`Evaluator`] may memoise them per structural signature. The memo lives
//! inside one evaluator (one search call) and is cleared between levels.

use crate::attribute::{Dataset, DatasetError};
use crate::group::{Coverage, DuplicatePolicy, Group, GroupArena, Signature};
use crate::heuristic::QualityHeuristic;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Raw counts for one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// `p`, covered rows of the positive class.
    pub covered_positive: usize,
    /// `n`, covered rows of the negative class.
    pub covered_negative: usize,
    /// `P`, all positive rows.
    pub positive_total: usize,
    /// `N`, all negative rows.
    pub negative_total: usize,
    /// Positive rows whose coverage a missing value left undecided.
    pub unknown_positive: usize,
    /// Negative rows whose coverage a missing value left undecided.
    pub unknown_negative: usize,
}

impl ConfusionMatrix {
    pub fn covered(&self) -> usize {
        self.covered_positive + self.covered_negative
    }

    pub fn total(&self) -> usize {
        self.positive_total + self.negative_total
    }

    /// Rows of either class left undecided by a missing value.
    pub fn unknown(&self) -> usize {
        self.unknown_positive + self.unknown_negative
    }

    pub fn not_covered_positive(&self) -> usize {
        self.positive_total - self.covered_positive - self.unknown_positive
    }

    pub fn not_covered_negative(&self) -> usize {
        self.negative_total - self.covered_negative - self.unknown_negative
    }

    /// Rows whose coverage was decided.
    pub fn determined(&self) -> usize {
        self.total() - self.unknown()
    }

    fn record(&mut self, coverage: Coverage, positive: bool) {
        if positive {
            self.positive_total += 1;
        } else {
            self.negative_total += 1;
        }
        match coverage {
            Coverage::Covered if positive => self.covered_positive += 1,
            Coverage::Covered => self.covered_negative += 1,
            Coverage::Unknown if positive => self.unknown_positive += 1,
            Coverage::Unknown => self.unknown_negative += 1,
            Coverage::NotCovered => {}
        }
    }
}

/// A group's counts and its heuristic score. Set once after evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub counts: ConfusionMatrix,
    pub score: f64,
}

/// Tallies `group` over every row of `dataset`.
pub fn confusion_matrix(
    arena: &GroupArena,
    group: &Group,
    dataset: &Dataset,
    positives: &[bool],
) -> Result<ConfusionMatrix, DatasetError> {
    let mut counts = ConfusionMatrix::default();
    for (instance, &positive) in dataset.instances().iter().zip(positives) {
        counts.record(arena.coverage(group, instance)?, positive);
    }
    Ok(counts)
}

/// Memo of counts keyed by value-sensitive signature.
#[derive(Debug, Default)]
pub struct ConfusionCache {
    entries: DashMap<Signature, ConfusionMatrix>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

/// Hit/miss totals since the cache was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

impl ConfusionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, key: &Signature) -> Option<ConfusionMatrix> {
        let found = self.entries.get(key).map(|entry| *entry.value());
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    fn put(&self, key: Signature, counts: ConfusionMatrix) {
        self.entries.insert(key, counts);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}

/// Evaluates groups against one dataset with a fixed positive label.
pub struct Evaluator<'d> {
    dataset: &'d Dataset,
    positives: Vec<bool>,
    cache: Option<ConfusionCache>,
}

impl<'d> Evaluator<'d> {
    pub fn new(dataset: &'d Dataset, positive_label: &str, memoize: bool) -> Result<Self, DatasetError> {
        Ok(Self {
            dataset,
            positives: dataset.positive_mask(positive_label)?,
            cache: memoize.then(ConfusionCache::new),
        })
    }

    pub fn dataset(&self) -> &'d Dataset {
        self.dataset
    }

    pub fn confusion(&self, arena: &GroupArena, group: &Group) -> Result<ConfusionMatrix, DatasetError> {
        let Some(cache) = &self.cache else {
            return confusion_matrix(arena, group, self.dataset, &self.positives);
        };
        let key = arena.signature(group, DuplicatePolicy::CompareValues);
        if let Some(counts) = cache.get(&key) {
            return Ok(counts);
        }
        let counts = confusion_matrix(arena, group, self.dataset, &self.positives)?;
        cache.put(key, counts);
        Ok(counts)
    }

    pub fn evaluate(
        &self,
        arena: &GroupArena,
        group: &Group,
        heuristic: &dyn QualityHeuristic,
    ) -> Result<EvaluationResult, DatasetError> {
        let counts = self.confusion(arena, group)?;
        Ok(EvaluationResult {
            counts,
            score: heuristic.score(&counts),
        })
    }

    /// Drops memoised counts; called once a level's candidates are settled.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(ConfusionCache::stats)
    }
}
