//! Serializable benchmark configuration.
//!
//! A benchmark run is described by a TOML file: the task/session/run group,
//! the strategies to compare (built-in presets and/or strategy JSON files),
//! the inclusion threshold, and either explicit per-subject input files or
//! synthetic-data settings. Validation collects every violation and fails
//! before any subject is processed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use denoiselab_core::domain::strategy::presets;
use denoiselab_core::{InclusionPolicy, StrategySpec};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("unknown preset '{0}'")]
    UnknownPreset(String),

    #[error("failed to read strategy file {path}: {source}")]
    StrategyIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse strategy file {path}: {source}")]
    StrategyParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Strategy(#[from] denoiselab_core::ConfigError),

    #[error("benchmark config invalid: {}", .violations.join("; "))]
    Invalid { violations: Vec<String> },
}

/// The (task, session?, run?) key a group of subjects belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupKey {
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,
}

impl GroupKey {
    pub fn task(task: &str) -> Self {
        Self {
            task: task.to_string(),
            session: None,
            run: None,
        }
    }

    /// Artifact/diagnostic label: `task-rest[_ses-01][_run-2]`.
    pub fn label(&self) -> String {
        let mut label = format!("task-{}", self.task);
        if let Some(ses) = &self.session {
            label.push_str(&format!("_ses-{ses}"));
        }
        if let Some(run) = &self.run {
            label.push_str(&format!("_run-{run}"));
        }
        label
    }
}

/// One subject's input files: a confound TSV and one connectivity NPY per
/// strategy name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubjectEntry {
    pub id: String,
    pub confounds: PathBuf,
    pub connectivity: BTreeMap<String, PathBuf>,
}

/// Settings for the synthetic-data mode used by demos and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyntheticSettings {
    #[serde(default = "default_n_subjects")]
    pub n_subjects: usize,
    #[serde(default = "default_n_timepoints")]
    pub n_timepoints: usize,
    #[serde(default = "default_n_regions")]
    pub n_regions: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_n_subjects() -> usize {
    8
}
fn default_n_timepoints() -> usize {
    200
}
fn default_n_regions() -> usize {
    20
}
fn default_seed() -> u64 {
    7
}

impl Default for SyntheticSettings {
    fn default() -> Self {
        Self {
            n_subjects: default_n_subjects(),
            n_timepoints: default_n_timepoints(),
            n_regions: default_n_regions(),
            seed: default_seed(),
        }
    }
}

fn default_mean_fd_limit() -> f64 {
    0.2
}

/// A complete benchmark run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BenchmarkConfig {
    pub group: GroupKey,

    /// Built-in strategy presets to include, by name.
    #[serde(default)]
    pub presets: Vec<String>,

    /// Paths to strategy JSON files to include.
    #[serde(default)]
    pub strategy_files: Vec<PathBuf>,

    /// Mean-FD inclusion limit; max-FD and spike-percentage limits are fixed.
    #[serde(default = "default_mean_fd_limit")]
    pub mean_fd_limit: f64,

    /// Explicit per-subject input files. Mutually exclusive with `synthetic`.
    #[serde(default)]
    pub subjects: Vec<SubjectEntry>,

    /// Distance matrix NPY, required with explicit subjects.
    #[serde(default)]
    pub distance_matrix: Option<PathBuf>,

    /// Synthetic-data mode. Mutually exclusive with `subjects`.
    #[serde(default)]
    pub synthetic: Option<SyntheticSettings>,
}

impl BenchmarkConfig {
    /// Read and validate a config from a TOML file.
    pub fn from_toml_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check structural invariants, collecting every violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut violations = Vec::new();

        if self.presets.is_empty() && self.strategy_files.is_empty() {
            violations.push("at least one preset or strategy file is required".to_string());
        }
        if self.group.task.trim().is_empty() {
            violations.push("group.task must be non-empty".to_string());
        }
        if !self.mean_fd_limit.is_finite() || self.mean_fd_limit <= 0.0 {
            violations.push(format!(
                "mean_fd_limit must be a positive number (got {})",
                self.mean_fd_limit
            ));
        }
        match (self.subjects.is_empty(), self.synthetic.is_some()) {
            (true, false) => {
                violations.push("either subjects or synthetic settings are required".to_string())
            }
            (false, true) => {
                violations.push("subjects and synthetic settings are mutually exclusive".to_string())
            }
            _ => {}
        }
        if !self.subjects.is_empty() && self.distance_matrix.is_none() {
            violations.push("distance_matrix is required with explicit subjects".to_string());
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid { violations })
        }
    }

    /// Resolve presets and strategy files into validated specs.
    pub fn load_strategies(&self) -> Result<Vec<StrategySpec>, ConfigError> {
        let mut strategies = Vec::new();

        for name in &self.presets {
            let spec =
                presets::by_name(name).ok_or_else(|| ConfigError::UnknownPreset(name.clone()))?;
            strategies.push(spec);
        }
        for path in &self.strategy_files {
            let text = std::fs::read_to_string(path).map_err(|source| ConfigError::StrategyIo {
                path: path.clone(),
                source,
            })?;
            let spec =
                StrategySpec::from_json(&text).map_err(|source| ConfigError::StrategyParse {
                    path: path.clone(),
                    source,
                })?;
            strategies.push(spec);
        }

        let mut violations = Vec::new();
        for spec in &strategies {
            if let Err(e) = spec.validate() {
                violations.push(e.to_string());
            }
        }
        let mut names: Vec<&str> = strategies.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        for pair in names.windows(2) {
            if pair[0] == pair[1] {
                violations.push(format!("duplicate strategy name '{}'", pair[0]));
            }
        }
        if !violations.is_empty() {
            return Err(ConfigError::Invalid { violations });
        }

        Ok(strategies)
    }

    pub fn inclusion_policy(&self) -> InclusionPolicy {
        InclusionPolicy::new(self.mean_fd_limit)
    }
}
