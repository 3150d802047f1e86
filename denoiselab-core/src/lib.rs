//! DenoiseLab Core — confound design matrices, subject quality, QC statistics.
//!
//! This crate contains the computational heart of the denoising benchmark:
//! - Domain types (strategy specs, confound tables, quality records, matrices)
//! - Confound design-matrix builder (signal expansion + spike regressors)
//! - Per-subject motion/quality summary with inclusion policy
//! - Statistical primitives (Pearson with p-values, Spearman, t-distribution CDF)
//! - Data boundary (TSV confound ingest, NPY matrix exchange)
//!
//! Everything here is pure: no global state, no logging, no side effects
//! outside the `data` boundary modules.

pub mod data;
pub mod design;
pub mod domain;
pub mod fingerprint;
pub mod quality;
pub mod stats;

pub use design::{build_design_matrix, spike_mask, ConfoundDesignMatrix, DesignError};
pub use domain::confounds::{ConfoundTableError, RawConfoundTable};
pub use domain::matrix::{MatrixError, SquareMatrix, SYMMETRY_ATOL, SYMMETRY_RTOL};
pub use domain::quality::SubjectQualityRecord;
pub use domain::strategy::{
    ConfigError, ConfoundSelection, FilterSettings, SignalGroup, SpikeConfig, StrategySpec,
};
pub use quality::{summarize_subject, InclusionPolicy, QualityError};
