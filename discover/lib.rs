#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
pub mod attribute;
pub mod beam;
pub mod config;
pub mod confusion;
pub mod group;
pub mod heuristic;
pub mod metric;
pub mod progress;
pub mod report;
pub mod retention;

#[path = "../load/mod.rs"]
pub mod load;

pub use attribute::{Attribute, AttributeKind, Dataset, DatasetError, Instance, UNKNOWN_VALUE};
pub use beam::{BeamSearch, CancellationToken, Condition, SearchError, SearchResult, Subgroup, search};
pub use config::{ConfigError, SearchConfig};
pub use confusion::{ConfusionMatrix, EvaluationResult, Evaluator};
pub use group::{DuplicatePolicy, GroupArena, GroupError, Predicate};
pub use heuristic::{Heuristic, QualityHeuristic, SENTINEL_SCORE};
pub use metric::Metric;
pub use progress::{NoopSearchProgress, SearchProgressObserver, SearchStage};
pub use retention::BestGroups;
