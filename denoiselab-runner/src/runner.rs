//! Benchmark orchestration — subject fan-out, group aggregation, and the
//! cross-strategy comparison barrier.
//!
//! Per-subject work (design matrix + quality record) is pure and runs on
//! the rayon pool. A failed subject is logged and excluded; its siblings
//! proceed. Aggregation starts only once every subject of a (strategy,
//! group) pair has finished, and a structural aggregation failure aborts
//! only that pair. The comparator runs last, over every strategy that
//! produced an outcome.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use denoiselab_core::data::{read_confounds_tsv, read_npy_matrix, IngestError, NpyError};
use denoiselab_core::fingerprint::spec_fingerprint;
use denoiselab_core::{
    build_design_matrix, summarize_subject, InclusionPolicy, RawConfoundTable, SquareMatrix,
    StrategySpec, SubjectQualityRecord,
};

use crate::compare::{self, ComparisonTables};
use crate::config::{BenchmarkConfig, GroupKey};
use crate::diagnostics::{DiagnosticScope, DiagnosticsLog};
use crate::qcfc::{self, GroupOutcome};

/// Version stamp written into run manifests.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("no strategies configured")]
    NoStrategies,

    #[error(transparent)]
    InvalidStrategy(#[from] denoiselab_core::ConfigError),

    #[error("group '{0}' has no subjects")]
    NoSubjects(String),
}

/// Errors from materializing benchmark inputs from files.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to load confounds for subject '{subject}': {source}")]
    Confounds {
        subject: String,
        source: IngestError,
    },

    #[error("failed to load connectivity for subject '{subject}', strategy '{strategy}': {source}")]
    Connectivity {
        subject: String,
        strategy: String,
        source: NpyError,
    },

    #[error("failed to load distance matrix: {0}")]
    Distance(NpyError),

    #[error("config has no distance matrix path")]
    MissingDistance,

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}

/// One subject's in-memory inputs: confounds plus one connectivity matrix
/// per strategy name.
#[derive(Debug, Clone)]
pub struct SubjectInput {
    pub subject: String,
    pub confounds: RawConfoundTable,
    pub connectivity: BTreeMap<String, SquareMatrix>,
}

/// Everything one group's benchmark needs, fully materialized.
#[derive(Debug, Clone)]
pub struct BenchmarkInputs {
    pub group: GroupKey,
    pub subjects: Vec<SubjectInput>,
    pub distance: SquareMatrix,
}

impl BenchmarkInputs {
    /// Load explicit per-subject files named by the config.
    pub fn load(config: &BenchmarkConfig) -> Result<Self, LoadError> {
        let distance_path = config
            .distance_matrix
            .as_ref()
            .ok_or(LoadError::MissingDistance)?;
        let distance = read_npy_matrix(distance_path).map_err(LoadError::Distance)?;

        let mut subjects = Vec::with_capacity(config.subjects.len());
        for entry in &config.subjects {
            let confounds =
                read_confounds_tsv(&entry.confounds).map_err(|source| LoadError::Confounds {
                    subject: entry.id.clone(),
                    source,
                })?;
            let mut connectivity = BTreeMap::new();
            for (strategy, path) in &entry.connectivity {
                let matrix = read_npy_matrix(path).map_err(|source| LoadError::Connectivity {
                    subject: entry.id.clone(),
                    strategy: strategy.clone(),
                    source,
                })?;
                connectivity.insert(strategy.clone(), matrix);
            }
            subjects.push(SubjectInput {
                subject: entry.id.clone(),
                confounds,
                connectivity,
            });
        }

        Ok(Self {
            group: config.group.clone(),
            subjects,
            distance,
        })
    }
}

/// A unit of work that failed; recorded, never silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectFailure {
    pub subject: String,
    pub strategy: String,
    pub error: String,
}

/// Provenance stamp for one benchmark run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: u32,
    pub created_at: NaiveDateTime,
    pub group: String,
    pub n_subjects: usize,
    pub n_strategies: usize,
    pub strategy_fingerprints: BTreeMap<String, String>,
}

/// Per-strategy output: the quality records that survived plus the
/// aggregated group outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyRun {
    pub strategy: String,
    pub records: Vec<SubjectQualityRecord>,
    pub outcome: GroupOutcome,
}

/// The complete result of one group's benchmark.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub manifest: RunManifest,
    pub strategy_runs: Vec<StrategyRun>,
    /// None when the comparison stage itself failed; the cause is in
    /// `diagnostics`.
    pub comparison: Option<ComparisonTables>,
    pub failures: Vec<SubjectFailure>,
    pub diagnostics: DiagnosticsLog,
}

/// Run the benchmark for one group across all strategies.
pub fn run_benchmark(
    strategies: &[StrategySpec],
    inputs: &BenchmarkInputs,
    policy: &InclusionPolicy,
) -> Result<BenchmarkResult, RunError> {
    if strategies.is_empty() {
        return Err(RunError::NoStrategies);
    }
    // Configuration failures are fatal before any subject is processed.
    for spec in strategies {
        spec.validate()?;
    }
    let group_label = inputs.group.label();
    if inputs.subjects.is_empty() {
        return Err(RunError::NoSubjects(group_label));
    }

    let mut diagnostics = DiagnosticsLog::new();
    let mut failures: Vec<SubjectFailure> = Vec::new();
    let mut strategy_runs: Vec<StrategyRun> = Vec::new();

    for spec in strategies {
        info!(strategy = %spec.name, group = %group_label, "processing strategy");
        let scope = DiagnosticScope::strategy(&spec.name).with_group(&group_label);

        // Subject fan-out: independent pure computations.
        let per_subject: Vec<Result<(SubjectQualityRecord, SquareMatrix), SubjectFailure>> =
            inputs
                .subjects
                .par_iter()
                .map(|subject| process_subject(subject, spec, &inputs.group, policy))
                .collect();

        let mut records = Vec::with_capacity(per_subject.len());
        let mut matrices = Vec::with_capacity(per_subject.len());
        for result in per_subject {
            match result {
                Ok((record, matrix)) => {
                    records.push(record);
                    matrices.push(matrix);
                }
                Err(failure) => {
                    warn!(
                        strategy = %failure.strategy,
                        subject = %failure.subject,
                        "subject failed: {}",
                        failure.error
                    );
                    diagnostics.warn(
                        scope.clone().with_subject(&failure.subject),
                        failure.error.clone(),
                    );
                    failures.push(failure);
                }
            }
        }

        // Group barrier reached: every surviving subject is materialized.
        match qcfc::aggregate(
            &records,
            &matrices,
            &inputs.distance,
            &spec.name,
            &group_label,
            &mut diagnostics,
        ) {
            Ok(outcome) => strategy_runs.push(StrategyRun {
                strategy: spec.name.clone(),
                records,
                outcome,
            }),
            Err(e) => {
                warn!(strategy = %spec.name, "aggregation failed: {e}");
                diagnostics.error(scope, e.to_string());
            }
        }
    }

    // Comparison barrier: all strategy outcomes for this group are in.
    let outcomes: Vec<GroupOutcome> = strategy_runs
        .iter()
        .map(|run| run.outcome.clone())
        .collect();
    let comparison = match compare::compare(&outcomes) {
        Ok(tables) => Some(tables),
        Err(e) => {
            warn!(group = %group_label, "comparison failed: {e}");
            diagnostics.error(
                DiagnosticScope::default().with_group(&group_label),
                e.to_string(),
            );
            None
        }
    };

    let manifest = RunManifest {
        schema_version: SCHEMA_VERSION,
        created_at: chrono::Utc::now().naive_utc(),
        group: group_label,
        n_subjects: inputs.subjects.len(),
        n_strategies: strategies.len(),
        strategy_fingerprints: strategies
            .iter()
            .map(|s| (s.name.clone(), spec_fingerprint(s)))
            .collect(),
    };

    Ok(BenchmarkResult {
        manifest,
        strategy_runs,
        comparison,
        failures,
        diagnostics,
    })
}

/// One group's benchmark outcome inside a multi-group run.
#[derive(Debug)]
pub struct GroupRun {
    pub group: GroupKey,
    pub result: Result<BenchmarkResult, RunError>,
}

/// Run the benchmark over several groups back to back.
///
/// Strategy validation happens once, up front, and is fatal. After that,
/// isolation is by group key: a group whose run fails is recorded with its
/// error and its siblings proceed.
pub fn run_benchmark_groups(
    strategies: &[StrategySpec],
    groups: &[BenchmarkInputs],
    policy: &InclusionPolicy,
) -> Result<Vec<GroupRun>, RunError> {
    if strategies.is_empty() {
        return Err(RunError::NoStrategies);
    }
    for spec in strategies {
        spec.validate()?;
    }

    Ok(groups
        .iter()
        .map(|inputs| {
            let result = run_benchmark(strategies, inputs, policy);
            if let Err(e) = &result {
                warn!(group = %inputs.group.label(), "group failed: {e}");
            }
            GroupRun {
                group: inputs.group.clone(),
                result,
            }
        })
        .collect())
}

fn process_subject(
    subject: &SubjectInput,
    spec: &StrategySpec,
    group: &GroupKey,
    policy: &InclusionPolicy,
) -> Result<(SubjectQualityRecord, SquareMatrix), SubjectFailure> {
    let fail = |error: String| SubjectFailure {
        subject: subject.subject.clone(),
        strategy: spec.name.clone(),
        error,
    };

    let design =
        build_design_matrix(&subject.confounds, spec).map_err(|e| fail(e.to_string()))?;
    let record = summarize_subject(
        &subject.confounds,
        &design,
        &subject.subject,
        &group.task,
        group.session.as_deref(),
        policy,
    )
    .map_err(|e| fail(e.to_string()))?;
    let matrix = subject
        .connectivity
        .get(&spec.name)
        .cloned()
        .ok_or_else(|| fail(format!("no connectivity matrix for strategy '{}'", spec.name)))?;
    Ok((record, matrix))
}

/// Convenience: resolve a config into inputs (synthetic or file-backed).
pub fn materialize_inputs(config: &BenchmarkConfig) -> Result<BenchmarkInputs, LoadError> {
    if let Some(settings) = &config.synthetic {
        let strategies = config.load_strategies()?;
        return Ok(crate::synthetic::benchmark_inputs(
            settings,
            &strategies,
            config.group.clone(),
        ));
    }
    BenchmarkInputs::load(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use denoiselab_core::domain::strategy::presets;

    #[test]
    fn empty_strategy_list_is_fatal() {
        let inputs = BenchmarkInputs {
            group: GroupKey::task("rest"),
            subjects: vec![],
            distance: SquareMatrix::from_vec(vec![0.0, 1.0, 1.0, 0.0]).unwrap(),
        };
        assert!(matches!(
            run_benchmark(&[], &inputs, &InclusionPolicy::default()),
            Err(RunError::NoStrategies)
        ));
    }

    #[test]
    fn invalid_strategy_fails_before_subject_work() {
        let mut bad = presets::simple();
        bad.name = "".into();
        let inputs = BenchmarkInputs {
            group: GroupKey::task("rest"),
            subjects: vec![],
            distance: SquareMatrix::from_vec(vec![0.0, 1.0, 1.0, 0.0]).unwrap(),
        };
        assert!(matches!(
            run_benchmark(&[bad], &inputs, &InclusionPolicy::default()),
            Err(RunError::InvalidStrategy(_))
        ));
    }

    #[test]
    fn empty_group_is_fatal() {
        let inputs = BenchmarkInputs {
            group: GroupKey::task("rest"),
            subjects: vec![],
            distance: SquareMatrix::from_vec(vec![0.0, 1.0, 1.0, 0.0]).unwrap(),
        };
        assert!(matches!(
            run_benchmark(&[presets::simple()], &inputs, &InclusionPolicy::default()),
            Err(RunError::NoSubjects(_))
        ));
    }

    #[test]
    fn failing_group_does_not_block_siblings() {
        let settings = crate::config::SyntheticSettings {
            n_subjects: 3,
            n_timepoints: 80,
            n_regions: 8,
            seed: 5,
        };
        let strategies = vec![presets::simple()];
        let good =
            crate::synthetic::benchmark_inputs(&settings, &strategies, GroupKey::task("rest"));
        let empty = BenchmarkInputs {
            group: GroupKey::task("motor"),
            subjects: vec![],
            distance: good.distance.clone(),
        };

        let runs =
            run_benchmark_groups(&strategies, &[empty, good], &InclusionPolicy::default())
                .unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].group.task, "motor");
        assert!(matches!(runs[0].result, Err(RunError::NoSubjects(_))));
        let ok = runs[1].result.as_ref().unwrap();
        assert_eq!(ok.strategy_runs.len(), 1);
        assert_eq!(ok.manifest.n_subjects, 3);
    }
}
