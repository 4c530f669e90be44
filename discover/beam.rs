//! # Beam-Search Driver
//!
//! Level `k` extends every seed kept at level `k - 1` by one more predicate,
//! so each subgroup reported at level `k` holds exactly `k + 1` predicates.
//! Candidates come from every searchable attribute, every distinct known value
//! of that attribute and every comparator its kind allows.
//!
//! Each attribute fills its own [`BestGroups`]; the attribute-local structures
//! are then merged into the level structure in attribute order. The outcome is
//! therefore the same whether attributes run on rayon workers or in sequence.

use crate::attribute::{Attribute, Dataset, DatasetError};
use crate::config::{ConfigError, SearchConfig};
use crate::confusion::{ConfusionMatrix, EvaluationResult, Evaluator};
use crate::group::{Group, GroupArena, GroupError, GroupId, Predicate};
use crate::heuristic::QualityHeuristic;
use crate::metric::Metric;
use crate::progress::{NoopSearchProgress, SearchProgressObserver, SearchStage};
use crate::retention::{BestGroups, EvaluatedGroup};
use itertools::Itertools;
use log::{debug, info, trace, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error("Invalid subgroup: {0}")]
    Group(#[from] GroupError),
    #[error("Invalid search configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Search was cancelled during level {level}.")]
    Cancelled { level: usize },
    #[error("Failed to build the search thread pool: {0}")]
    ThreadPool(String),
}

/// Cooperative stop flag shared between a running search and its caller.
/// The search polls it once per attribute.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// One predicate of a reported subgroup, resolved to attribute names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Condition {
    pub attribute: String,
    pub attribute_id: usize,
    pub metric: Metric,
    pub value: String,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.attribute, self.metric, self.value)
    }
}

/// A reported subgroup: its predicates from root to leaf plus its evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subgroup {
    pub conditions: Vec<Condition>,
    pub result: EvaluationResult,
}

impl Subgroup {
    pub fn score(&self) -> f64 {
        self.result.score
    }

    pub fn counts(&self) -> &ConfusionMatrix {
        &self.result.counts
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl fmt::Display for Subgroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.conditions.iter().join(" AND "))
    }
}

/// Per-level snapshots, each sorted by descending score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub heuristic: String,
    pub width: usize,
    pub depth: usize,
    pub levels: Vec<Vec<Subgroup>>,
}

impl SearchResult {
    pub fn level(&self, level: usize) -> &[Subgroup] {
        self.levels.get(level).map_or(&[], Vec::as_slice)
    }

    /// Highest-scoring subgroup over all levels; the earliest level wins ties.
    pub fn best(&self) -> Option<&Subgroup> {
        let mut best: Option<&Subgroup> = None;
        for candidate in self.levels.iter().filter_map(|level| level.first()) {
            if best.is_none_or(|b| candidate.score() > b.score()) {
                best = Some(candidate);
            }
        }
        best
    }
}

/// An attribute taking part in the search, with its candidate cutoffs.
struct SearchAttribute<'d> {
    attribute: &'d Attribute,
    values: Vec<String>,
}

/// A group kept by the previous level, stored in the arena.
struct Seed {
    id: GroupId,
    counts: ConfusionMatrix,
}

#[derive(Default)]
struct ScanStats {
    evaluated: usize,
    empty: usize,
    undiscriminating: usize,
    repeated: usize,
}

pub struct BeamSearch<'d> {
    dataset: &'d Dataset,
    config: SearchConfig,
    heuristic: Arc<dyn QualityHeuristic>,
    progress: Arc<dyn SearchProgressObserver>,
    cancellation: CancellationToken,
}

impl<'d> BeamSearch<'d> {
    pub fn new(dataset: &'d Dataset, config: SearchConfig) -> Self {
        let heuristic: Arc<dyn QualityHeuristic> = Arc::new(config.heuristic);
        Self {
            dataset,
            config,
            heuristic,
            progress: Arc::new(NoopSearchProgress),
            cancellation: CancellationToken::new(),
        }
    }

    /// Scores with `heuristic` instead of the one named in the config.
    pub fn with_heuristic(mut self, heuristic: Arc<dyn QualityHeuristic>) -> Self {
        self.heuristic = heuristic;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn SearchProgressObserver>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn run(&self) -> Result<SearchResult, SearchError> {
        self.config.validate()?;
        let attributes = self.search_attributes()?;
        let evaluator = Evaluator::new(self.dataset, &self.config.positive_label, self.config.memoize)?;

        info!(
            "Searching '{}' with {} (width {}, depth {}, {} attributes, {} instances).",
            self.dataset.relation(),
            self.heuristic.name(),
            self.config.width,
            self.config.depth,
            attributes.len(),
            self.dataset.instances().len()
        );

        let levels = match self.config.threads.filter(|_| self.config.parallel) {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| SearchError::ThreadPool(e.to_string()))?;
                pool.install(|| self.run_levels(&attributes, &evaluator))?
            }
            None => self.run_levels(&attributes, &evaluator)?,
        };

        if let Some(stats) = evaluator.cache_stats() {
            debug!(
                "Confusion cache: {} hits, {} misses.",
                stats.hits, stats.misses
            );
        }

        Ok(SearchResult {
            heuristic: self.heuristic.name().to_string(),
            width: self.config.width,
            depth: self.config.depth,
            levels,
        })
    }

    /// Every attribute except the target and blacklisted names, in column order.
    fn search_attributes(&self) -> Result<Vec<SearchAttribute<'d>>, SearchError> {
        for name in &self.config.blacklist {
            if self.dataset.attribute_by_name(name).is_none() {
                warn!("Blacklisted attribute '{name}' does not exist in '{}'.", self.dataset.relation());
            }
        }

        let dataset: &'d Dataset = self.dataset;
        let mut attributes = Vec::new();
        for attribute in dataset.attributes() {
            if attribute.id == dataset.target() || self.config.blacklist.contains(&attribute.name) {
                continue;
            }
            attributes.push(SearchAttribute {
                attribute,
                values: dataset.distinct_values(attribute)?,
            });
        }
        Ok(attributes)
    }

    fn run_levels(
        &self,
        attributes: &[SearchAttribute<'d>],
        evaluator: &Evaluator<'d>,
    ) -> Result<Vec<Vec<Subgroup>>, SearchError> {
        let mut arena = GroupArena::new();
        let mut seeds: Vec<Seed> = Vec::new();
        let mut levels = Vec::with_capacity(self.config.depth);

        for level in 0..self.config.depth {
            if level > 0 && seeds.is_empty() {
                info!("Level {}: no seeds left to extend.", level + 1);
                self.progress.on_level_start(level, 0);
                self.progress.on_level_finish(level, 0);
                levels.push(Vec::new());
                continue;
            }

            self.progress.on_level_start(level, attributes.len());
            let best = self.run_level(level, &arena, &seeds, attributes, evaluator)?;
            evaluator.clear_cache();

            let kept = best.into_sorted_vec();
            match kept.first() {
                Some(top) => info!(
                    "Level {}: kept {} groups, best score {:.6}.",
                    level + 1,
                    kept.len(),
                    top.score()
                ),
                None => info!("Level {}: no candidate survived.", level + 1),
            }

            let mut snapshot = Vec::with_capacity(kept.len());
            let mut next = Vec::with_capacity(kept.len());
            for entry in kept {
                snapshot.push(self.describe(&arena, &entry.group, entry.result));
                let counts = entry.result.counts;
                let id = arena.insert(entry.group);
                next.push(Seed { id, counts });
            }

            self.progress.on_level_finish(level, snapshot.len());
            levels.push(snapshot);
            seeds = next;
        }
        Ok(levels)
    }

    fn run_level(
        &self,
        level: usize,
        arena: &GroupArena,
        seeds: &[Seed],
        attributes: &[SearchAttribute<'d>],
        evaluator: &Evaluator<'d>,
    ) -> Result<BestGroups, SearchError> {
        self.progress.on_stage(level, SearchStage::Candidates);
        let locals: Vec<BestGroups> = if self.config.parallel {
            attributes
                .par_iter()
                .map(|candidate| self.scan_attribute(level, arena, seeds, candidate, evaluator))
                .collect::<Result<_, _>>()?
        } else {
            attributes
                .iter()
                .map(|candidate| self.scan_attribute(level, arena, seeds, candidate, evaluator))
                .collect::<Result<_, _>>()?
        };

        self.progress.on_stage(level, SearchStage::Merge);
        let mut best = BestGroups::new(self.config.width, self.config.duplicate_policy());
        for local in locals {
            best.merge(arena, local);
        }
        Ok(best)
    }

    fn scan_attribute(
        &self,
        level: usize,
        arena: &GroupArena,
        seeds: &[Seed],
        candidate: &SearchAttribute<'d>,
        evaluator: &Evaluator<'d>,
    ) -> Result<BestGroups, SearchError> {
        if self.cancellation.is_cancelled() {
            return Err(SearchError::Cancelled { level });
        }

        let attribute = candidate.attribute;
        let mut local = BestGroups::new(self.config.width, self.config.duplicate_policy());
        let mut stats = ScanStats::default();

        for value in &candidate.values {
            for &metric in attribute.kind.metrics() {
                let predicate = Predicate::new(attribute, value.as_str(), metric)?;
                if level == 0 {
                    let group = arena.root(predicate);
                    self.consider(arena, group, None, evaluator, &mut local, &mut stats)?;
                    continue;
                }
                for seed in seeds {
                    if arena.contains_predicate(arena.get(seed.id), attribute.id, metric) {
                        stats.repeated += 1;
                        continue;
                    }
                    let group = arena.extend(Some(seed.id), predicate.clone())?;
                    self.consider(arena, group, Some(&seed.counts), evaluator, &mut local, &mut stats)?;
                }
            }
        }

        debug!(
            "Level {}, attribute '{}': {} candidates, {} empty, {} without effect, {} repeated, {} kept.",
            level + 1,
            attribute.name,
            stats.evaluated,
            stats.empty,
            stats.undiscriminating,
            stats.repeated,
            local.len()
        );
        self.progress.on_attribute_done(level, attribute.id);
        Ok(local)
    }

    /// Evaluates `group` and offers it to `local` unless it covers no row or
    /// every row its seed already covered.
    fn consider(
        &self,
        arena: &GroupArena,
        group: Group,
        seed: Option<&ConfusionMatrix>,
        evaluator: &Evaluator<'d>,
        local: &mut BestGroups,
        stats: &mut ScanStats,
    ) -> Result<(), SearchError> {
        let result = evaluator.evaluate(arena, &group, self.heuristic.as_ref())?;
        stats.evaluated += 1;
        let counts = &result.counts;

        if counts.covered() == 0 {
            stats.empty += 1;
            trace!("Skipping {:?}: covers no instance.", group.predicate());
            return Ok(());
        }
        let unchanged = match seed {
            Some(seed) => counts.covered() == seed.covered(),
            None => counts.covered() + counts.unknown() == counts.total(),
        };
        if unchanged {
            stats.undiscriminating += 1;
            trace!("Skipping {:?}: covers the whole remaining population.", group.predicate());
            return Ok(());
        }

        local.add(arena, EvaluatedGroup::new(group, result));
        Ok(())
    }

    fn describe(&self, arena: &GroupArena, group: &Group, result: EvaluationResult) -> Subgroup {
        let attributes = self.dataset.attributes();
        let mut conditions: Vec<Condition> = arena
            .chain(group)
            .map(|predicate| Condition {
                attribute: attributes[predicate.attribute()].name.clone(),
                attribute_id: predicate.attribute(),
                metric: predicate.metric(),
                value: predicate.value().to_string(),
            })
            .collect();
        conditions.reverse();
        Subgroup { conditions, result }
    }
}

/// Runs one search with the heuristic named in `config`.
pub fn search(dataset: &Dataset, config: &SearchConfig) -> Result<SearchResult, SearchError> {
    BeamSearch::new(dataset, config.clone()).run()
}
