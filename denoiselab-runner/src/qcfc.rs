//! Group-level QC-FC aggregation — one strategy, one task/session/run group.
//!
//! Combines per-subject connectivity matrices and quality records into the
//! quality-control statistics used to rank denoising strategies:
//! - per-edge Pearson correlation between edge weight and subject mean FD,
//!   with two-sided p-values (the QC-FC vector)
//! - percent of edges significant at alpha = 0.05
//! - median absolute QC-FC correlation
//! - Spearman correlation of QC-FC against edge-wise region distance
//!   (distance dependence)
//! - mean degrees-of-freedom loss (confound column count)
//!
//! Each statistic is computed twice: over all subjects, and over the
//! low-motion subsample (include = true), provided that subsample has at
//! least two members. Structural failures (count mismatch, asymmetry)
//! abort this (strategy, group) pair only.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use denoiselab_core::stats;
use denoiselab_core::{SquareMatrix, SubjectQualityRecord, SYMMETRY_ATOL, SYMMETRY_RTOL};

use crate::diagnostics::{DiagnosticScope, DiagnosticsLog};

/// Significance level for counting QC-FC edges.
pub const QCFC_ALPHA: f64 = 0.05;
/// Minimum size of the low-motion subsample.
pub const MIN_LOW_MOTION_SUBJECTS: usize = 2;

#[derive(Debug, Error)]
pub enum QcFcError {
    #[error("{records} quality records but {matrices} connectivity matrices")]
    CountMismatch { records: usize, matrices: usize },

    #[error("connectivity matrix for subject '{subject}' failed validation: {source}")]
    InvalidMatrix {
        subject: String,
        source: denoiselab_core::MatrixError,
    },

    #[error("subject '{subject}' has a {n}-region matrix, expected {expected}")]
    SizeMismatch {
        subject: String,
        n: usize,
        expected: usize,
    },

    #[error("distance matrix failed validation: {0}")]
    InvalidDistance(denoiselab_core::MatrixError),

    #[error("distance matrix has {n} regions, connectivity has {expected}")]
    DistanceSizeMismatch { n: usize, expected: usize },

    #[error("no subjects to aggregate")]
    EmptyGroup,
}

/// Which subsample a summary row describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleSubset {
    AllSubjects,
    LowMotionOnly,
}

impl SampleSubset {
    pub fn label(&self) -> &'static str {
        match self {
            SampleSubset::AllSubjects => "all",
            SampleSubset::LowMotionOnly => "low_motion",
        }
    }
}

/// QC statistics for one (strategy, subset) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupQualitySummary {
    pub strategy: String,
    pub subset: SampleSubset,
    /// Size of the full record set fed to the aggregator.
    pub n_subjects: usize,
    /// Subjects excluded from this subset by the inclusion rule.
    pub n_excluded: usize,
    pub percent_significant_edges: f64,
    pub median_abs_correlation: f64,
    /// Spearman correlation between QC-FC and region distance.
    pub distance_dependence: f64,
    pub mean_dof_loss: f64,
}

/// Full aggregation output for one (strategy, group) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupOutcome {
    pub strategy: String,
    /// One summary per computable subset, AllSubjects first.
    pub summaries: Vec<GroupQualitySummary>,
    /// Per-subset mean edge weights, in the shared edge order.
    pub edge_weights: Vec<(SampleSubset, Vec<f64>)>,
    /// Per-subset QC-FC correlation vectors, in the shared edge order.
    pub qcfc_correlations: Vec<(SampleSubset, Vec<f64>)>,
    /// Subjects with include = false, drawn from the full record set.
    pub excluded_subjects: Vec<String>,
}

impl GroupOutcome {
    fn subset_vector<'a>(
        vectors: &'a [(SampleSubset, Vec<f64>)],
        subset: SampleSubset,
    ) -> Option<&'a [f64]> {
        vectors
            .iter()
            .find(|(s, _)| *s == subset)
            .map(|(_, v)| v.as_slice())
    }

    pub fn edge_weight_vector(&self, subset: SampleSubset) -> Option<&[f64]> {
        Self::subset_vector(&self.edge_weights, subset)
    }

    pub fn qcfc_vector(&self, subset: SampleSubset) -> Option<&[f64]> {
        Self::subset_vector(&self.qcfc_correlations, subset)
    }
}

/// Validate and aggregate one (strategy, group) pair.
///
/// `records[i]` and `matrices[i]` must describe the same subject.
pub fn aggregate(
    records: &[SubjectQualityRecord],
    matrices: &[SquareMatrix],
    distance: &SquareMatrix,
    strategy: &str,
    group: &str,
    log: &mut DiagnosticsLog,
) -> Result<GroupOutcome, QcFcError> {
    if records.len() != matrices.len() {
        return Err(QcFcError::CountMismatch {
            records: records.len(),
            matrices: matrices.len(),
        });
    }
    if records.is_empty() {
        return Err(QcFcError::EmptyGroup);
    }

    // Structural validation of every matrix before any statistic is computed.
    let n_regions = matrices[0].n();
    for (record, matrix) in records.iter().zip(matrices) {
        if matrix.n() != n_regions {
            return Err(QcFcError::SizeMismatch {
                subject: record.subject.clone(),
                n: matrix.n(),
                expected: n_regions,
            });
        }
        matrix
            .check_finite()
            .and_then(|_| matrix.check_symmetric(SYMMETRY_RTOL, SYMMETRY_ATOL))
            .map_err(|source| QcFcError::InvalidMatrix {
                subject: record.subject.clone(),
                source,
            })?;
    }
    if distance.n() != n_regions {
        return Err(QcFcError::DistanceSizeMismatch {
            n: distance.n(),
            expected: n_regions,
        });
    }
    distance
        .check_symmetric(SYMMETRY_RTOL, SYMMETRY_ATOL)
        .and_then(|_| distance.check_zero_diagonal(SYMMETRY_ATOL))
        .map_err(QcFcError::InvalidDistance)?;

    // Every matrix vectorizes in the same fixed edge order.
    let edge_vectors: Vec<Vec<f64>> = matrices.iter().map(|m| m.vectorize_upper()).collect();
    let distance_vector = distance.vectorize_upper();
    let n_edges = distance_vector.len();

    let scope = DiagnosticScope::strategy(strategy).with_group(group);
    let n_subjects = records.len();

    let mut summaries = Vec::with_capacity(2);
    let mut edge_weights = Vec::with_capacity(2);
    let mut qcfc_correlations = Vec::with_capacity(2);

    for subset in [SampleSubset::AllSubjects, SampleSubset::LowMotionOnly] {
        let indices: Vec<usize> = match subset {
            SampleSubset::AllSubjects => (0..n_subjects).collect(),
            SampleSubset::LowMotionOnly => records
                .iter()
                .enumerate()
                .filter_map(|(i, r)| r.include.then_some(i))
                .collect(),
        };

        if subset == SampleSubset::LowMotionOnly && indices.len() < MIN_LOW_MOTION_SUBJECTS {
            log.warn(
                scope.clone(),
                format!(
                    "low-motion subsample has {} subject(s), need at least {}; skipping subset",
                    indices.len(),
                    MIN_LOW_MOTION_SUBJECTS
                ),
            );
            continue;
        }

        let mean_fd: Vec<f64> = indices.iter().map(|&i| records[i].mean_fd).collect();

        let mut correlations = Vec::with_capacity(n_edges);
        let mut p_values = Vec::with_capacity(n_edges);
        let mut n_constant_edges = 0usize;
        for e in 0..n_edges {
            let weights: Vec<f64> = indices.iter().map(|&i| edge_vectors[i][e]).collect();
            let test = stats::pearson_test(&weights, &mean_fd);
            if test.r.is_nan() {
                n_constant_edges += 1;
                correlations.push(0.0);
                p_values.push(1.0);
            } else {
                correlations.push(test.r);
                p_values.push(test.p_value);
            }
        }
        if n_constant_edges > 0 {
            log.warn(
                scope.clone(),
                format!(
                    "{n_constant_edges} edge(s) with constant weight across the {} subset; \
                     correlations set to 0",
                    subset.label()
                ),
            );
        }

        let n_significant = p_values.iter().filter(|&&p| p < QCFC_ALPHA).count();
        let percent_significant_edges = n_significant as f64 / n_edges as f64 * 100.0;

        let abs_correlations: Vec<f64> = correlations.iter().map(|r| r.abs()).collect();
        let median_abs_correlation = stats::median(&abs_correlations);

        let mut distance_dependence = stats::spearman(&correlations, &distance_vector);
        if distance_dependence.is_nan() {
            log.warn(
                scope.clone(),
                format!(
                    "distance dependence undefined for the {} subset; reported as 0",
                    subset.label()
                ),
            );
            distance_dependence = 0.0;
        }

        let dof: Vec<f64> = indices
            .iter()
            .map(|&i| records[i].n_confound_columns as f64)
            .collect();
        let mean_dof_loss = stats::mean(&dof);

        let mean_edge_weights: Vec<f64> = (0..n_edges)
            .map(|e| {
                let values: Vec<f64> = indices.iter().map(|&i| edge_vectors[i][e]).collect();
                stats::mean(&values)
            })
            .collect();

        summaries.push(GroupQualitySummary {
            strategy: strategy.to_string(),
            subset,
            n_subjects,
            n_excluded: n_subjects - indices.len(),
            percent_significant_edges,
            median_abs_correlation,
            distance_dependence,
            mean_dof_loss,
        });
        edge_weights.push((subset, mean_edge_weights));
        qcfc_correlations.push((subset, correlations));
    }

    // Exclusions come from the full record set regardless of which subset
    // summaries were computable.
    let excluded_subjects: Vec<String> = records
        .iter()
        .filter(|r| !r.include)
        .map(|r| r.subject.clone())
        .collect();

    Ok(GroupOutcome {
        strategy: strategy.to_string(),
        summaries,
        edge_weights,
        qcfc_correlations,
        excluded_subjects,
    })
}
