//! DenoiseLab Runner — benchmark orchestration, aggregation, comparison.
//!
//! This crate builds on `denoiselab-core` to provide:
//! - Group-level QC-FC aggregation with motion-subset summaries
//! - Cross-strategy comparison tables
//! - Parallel per-subject fan-out with failure isolation
//! - Structured diagnostics collected for end-of-run reporting
//! - TSV/JSON artifact export
//! - Benchmark configuration (TOML) and synthetic data generation

pub mod compare;
pub mod config;
pub mod diagnostics;
pub mod export;
pub mod qcfc;
pub mod runner;
pub mod synthetic;

pub use compare::{compare, CompareError, ComparisonTables, WideTable};
pub use config::{BenchmarkConfig, ConfigError, GroupKey, SubjectEntry, SyntheticSettings};
pub use diagnostics::{Diagnostic, DiagnosticScope, DiagnosticsLog, Severity};
pub use export::{save_benchmark_artifacts, summary_tsv, wide_table_tsv, write_design_matrix};
pub use qcfc::{
    aggregate, GroupOutcome, GroupQualitySummary, QcFcError, SampleSubset,
    MIN_LOW_MOTION_SUBJECTS, QCFC_ALPHA,
};
pub use runner::{
    materialize_inputs, run_benchmark, run_benchmark_groups, BenchmarkInputs, BenchmarkResult,
    GroupRun, LoadError, RunError, RunManifest, StrategyRun, SubjectFailure, SubjectInput,
    SCHEMA_VERSION,
};
