use std::fmt;

/// Phases of one beam-search level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SearchStage {
    Candidates,
    Merge,
}

impl SearchStage {
    pub fn describe(self) -> &'static str {
        match self {
            Self::Candidates => "candidate evaluation",
            Self::Merge => "beam merge",
        }
    }
}

impl fmt::Display for SearchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Observer for reporting incremental progress while a search runs.
///
/// Attribute callbacks may arrive from several rayon workers at once and in
/// any order, so implementations take `&self` and must be thread safe.
pub trait SearchProgressObserver: Send + Sync {
    fn on_level_start(&self, level: usize, attributes: usize) {
        let _ = (level, attributes);
    }
    fn on_stage(&self, level: usize, stage: SearchStage) {
        let _ = (level, stage);
    }
    fn on_attribute_done(&self, level: usize, attribute: usize) {
        let _ = (level, attribute);
    }
    fn on_level_finish(&self, level: usize, kept: usize) {
        let _ = (level, kept);
    }
}

#[derive(Default)]
pub struct NoopSearchProgress;

impl SearchProgressObserver for NoopSearchProgress {}
