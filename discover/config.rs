//! Search parameters, persisted as TOML.

use crate::attribute::UNKNOWN_VALUE;
use crate::group::DuplicatePolicy;
use crate::heuristic::Heuristic;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_SEARCH_WIDTH: usize = 10;
pub const DEFAULT_SEARCH_DEPTH: usize = 3;
pub const DEFAULT_POSITIVE_LABEL: &str = "1";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Search width must be at least 1.")]
    ZeroWidth,
    #[error("Search depth must be at least 1.")]
    ZeroDepth,
    #[error("A dedicated thread pool needs at least one thread.")]
    ZeroThreads,
    #[error("The positive label may not be the unknown marker '?'.")]
    UnknownPositiveLabel,
    #[error("Failed to read or write config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML config file: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize config to TOML format: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Everything a beam search needs besides the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Beam width: groups kept per level.
    pub width: usize,
    /// Number of conjunction levels.
    pub depth: usize,
    pub heuristic: Heuristic,
    /// Whether cutoff values take part in duplicate detection.
    pub compare_values: bool,
    /// Attribute names left out of the search.
    pub blacklist: Vec<String>,
    /// Target value counted as the positive class.
    pub positive_label: String,
    /// Evaluate attributes on the rayon pool.
    pub parallel: bool,
    /// Size of a dedicated pool; `None` uses the global rayon pool.
    pub threads: Option<usize>,
    /// Memoise confusion counts within a level.
    pub memoize: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_SEARCH_WIDTH,
            depth: DEFAULT_SEARCH_DEPTH,
            heuristic: Heuristic::default(),
            compare_values: true,
            blacklist: Vec::new(),
            positive_label: DEFAULT_POSITIVE_LABEL.to_string(),
            parallel: true,
            threads: None,
            memoize: true,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 {
            return Err(ConfigError::ZeroWidth);
        }
        if self.depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        if self.threads == Some(0) {
            return Err(ConfigError::ZeroThreads);
        }
        if self.positive_label == UNKNOWN_VALUE {
            return Err(ConfigError::UnknownPositiveLabel);
        }
        Ok(())
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        DuplicatePolicy::from_compare_values(self.compare_values)
    }

    /// Loads a config; fields missing from the file keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self)?;
        let mut writer = BufWriter::new(fs::File::create(path)?);
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}
