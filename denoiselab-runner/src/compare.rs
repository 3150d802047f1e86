//! Cross-strategy comparison — one task/session/run group.
//!
//! Merges every strategy's group outcome into three tables:
//! - a flattened summary (one row per strategy x subset)
//! - a wide table of mean edge weights, one column per strategy
//! - a wide table of QC-FC correlations, one column per strategy
//!
//! All strategies must report the same edge count (same parcellation);
//! the wide tables are aligned on the shared edge index. Rendering is out
//! of scope: consumers get finished tables only.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::qcfc::{GroupOutcome, GroupQualitySummary, SampleSubset};

#[derive(Debug, Error)]
pub enum CompareError {
    #[error(
        "edge count mismatch: strategy '{first}' reports {first_edges} edges \
         but '{other}' reports {other_edges}"
    )]
    EdgeCountMismatch {
        first: String,
        first_edges: usize,
        other: String,
        other_edges: usize,
    },

    #[error("strategy '{0}' has no all-subjects vectors to compare")]
    MissingVectors(String),

    #[error("no strategy outcomes to compare")]
    Empty,
}

/// Edge-indexed values, one column per strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WideTable {
    pub strategies: Vec<String>,
    /// `rows[edge][strategy_index]`.
    pub rows: Vec<Vec<f64>>,
}

impl WideTable {
    pub fn n_edges(&self) -> usize {
        self.rows.len()
    }

    pub fn column(&self, strategy: &str) -> Option<Vec<f64>> {
        let idx = self.strategies.iter().position(|s| s == strategy)?;
        Some(self.rows.iter().map(|row| row[idx]).collect())
    }
}

/// The comparison output for one group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonTables {
    /// One row per (strategy, subset), in strategy order.
    pub summary: Vec<GroupQualitySummary>,
    /// Mean edge weights across the all-subjects sample.
    pub edge_weights: WideTable,
    /// QC-FC correlations across the all-subjects sample.
    pub qcfc_correlations: WideTable,
}

/// Merge per-strategy outcomes into comparison tables.
pub fn compare(outcomes: &[GroupOutcome]) -> Result<ComparisonTables, CompareError> {
    let first = outcomes.first().ok_or(CompareError::Empty)?;
    let first_edges = all_subjects_vectors(first)?.0.len();

    let mut strategies = Vec::with_capacity(outcomes.len());
    let mut weight_columns = Vec::with_capacity(outcomes.len());
    let mut qcfc_columns = Vec::with_capacity(outcomes.len());
    let mut summary = Vec::new();

    for outcome in outcomes {
        let (weights, qcfc) = all_subjects_vectors(outcome)?;
        if weights.len() != first_edges {
            return Err(CompareError::EdgeCountMismatch {
                first: first.strategy.clone(),
                first_edges,
                other: outcome.strategy.clone(),
                other_edges: weights.len(),
            });
        }
        strategies.push(outcome.strategy.clone());
        weight_columns.push(weights);
        qcfc_columns.push(qcfc);
        summary.extend(outcome.summaries.iter().cloned());
    }

    Ok(ComparisonTables {
        summary,
        edge_weights: transpose(strategies.clone(), weight_columns, first_edges),
        qcfc_correlations: transpose(strategies, qcfc_columns, first_edges),
    })
}

fn all_subjects_vectors(outcome: &GroupOutcome) -> Result<(Vec<f64>, Vec<f64>), CompareError> {
    let weights = outcome
        .edge_weight_vector(SampleSubset::AllSubjects)
        .ok_or_else(|| CompareError::MissingVectors(outcome.strategy.clone()))?;
    let qcfc = outcome
        .qcfc_vector(SampleSubset::AllSubjects)
        .ok_or_else(|| CompareError::MissingVectors(outcome.strategy.clone()))?;
    Ok((weights.to_vec(), qcfc.to_vec()))
}

fn transpose(strategies: Vec<String>, columns: Vec<Vec<f64>>, n_edges: usize) -> WideTable {
    let rows = (0..n_edges)
        .map(|e| columns.iter().map(|c| c[e]).collect())
        .collect();
    WideTable { strategies, rows }
}
