//! Confound design-matrix construction — deterministic signal expansion
//! and spike regressors.
//!
//! Column order is fixed: signal groups in declaration order (wm, csf, gs,
//! motion, acompcor), within a group raw columns first, then `_td`
//! derivatives, then `_quad` terms, spike indicator columns last. Identical
//! inputs always produce byte-identical output.

use thiserror::Error;

use crate::domain::confounds::{columns, RawConfoundTable};
use crate::domain::strategy::{SignalGroup, SpikeConfig, StrategySpec};

#[derive(Debug, Error)]
pub enum DesignError {
    #[error("confound table is missing signal '{column}' required by {context}")]
    MissingSignal { context: String, column: String },

    #[error("invalid {metric} spike threshold {value}: must be finite and non-negative")]
    InvalidThreshold { metric: &'static str, value: f64 },

    #[error("configuration error: {0}")]
    Configuration(String),
}

/// A built design matrix: named f64 columns, one row per timepoint.
///
/// Immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfoundDesignMatrix {
    names: Vec<String>,
    data: Vec<Vec<f64>>,
    n_timepoints: usize,
    n_spike_columns: usize,
}

impl ConfoundDesignMatrix {
    pub fn n_timepoints(&self) -> usize {
        self.n_timepoints
    }

    pub fn n_columns(&self) -> usize {
        self.names.len()
    }

    pub fn n_spike_columns(&self) -> usize {
        self.n_spike_columns
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.data[i].as_slice())
    }

    /// Render as a tab-separated table, one row per timepoint, values with
    /// six decimal places. This is the canonical byte representation used
    /// for fingerprinting and artifact export.
    pub fn to_tsv(&self) -> String {
        let mut out = String::with_capacity(self.n_timepoints * self.names.len() * 10);
        out.push_str(&self.names.join("\t"));
        out.push('\n');
        for t in 0..self.n_timepoints {
            for (i, column) in self.data.iter().enumerate() {
                if i > 0 {
                    out.push('\t');
                }
                out.push_str(&format!("{:.6}", column[t]));
            }
            out.push('\n');
        }
        out
    }

    /// Content hash of the canonical TSV rendering.
    pub fn fingerprint(&self) -> String {
        blake3::hash(self.to_tsv().as_bytes()).to_hex().to_string()
    }
}

/// Discrete first difference with the first timepoint defined as 0.
fn temporal_derivative(signal: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(signal.len());
    out.push(0.0);
    for w in signal.windows(2) {
        out.push(w[1] - w[0]);
    }
    out
}

/// Elementwise square.
fn quadratic(signal: &[f64]) -> Vec<f64> {
    signal.iter().map(|v| v * v).collect()
}

/// The raw column names of one signal group, in the group's fixed order.
fn group_columns(group: &'static str) -> Vec<String> {
    match group {
        "wm" => vec![columns::WHITE_MATTER.to_string()],
        "csf" => vec![columns::CSF.to_string()],
        "gs" => vec![columns::GLOBAL_SIGNAL.to_string()],
        "motion" => columns::MOTION.iter().map(|s| s.to_string()).collect(),
        _ => unreachable!("unknown signal group"),
    }
}

/// Compute the OR of the per-metric outlier masks for spike regression.
///
/// Returns a `Configuration` error when called with spikes disabled; a
/// metric with no threshold contributes an all-false mask.
pub fn spike_mask(raw: &RawConfoundTable, spikes: &SpikeConfig) -> Result<Vec<bool>, DesignError> {
    let SpikeConfig::Enabled {
        fd_threshold,
        dvars_threshold,
    } = spikes
    else {
        return Err(DesignError::Configuration(
            "spike mask requested but spike regression is disabled".to_string(),
        ));
    };

    let mut mask = vec![false; raw.n_timepoints()];

    if let Some(threshold) = fd_threshold {
        validate_threshold("framewise displacement", *threshold)?;
        let fd = require_column(raw, columns::FRAMEWISE_DISPLACEMENT, "spike regression")?;
        for (flag, value) in mask.iter_mut().zip(fd) {
            *flag |= *value > *threshold;
        }
    }

    if let Some(threshold) = dvars_threshold {
        validate_threshold("standardized DVARS", *threshold)?;
        let dvars = require_column(raw, columns::STD_DVARS, "spike regression")?;
        for (flag, value) in mask.iter_mut().zip(dvars) {
            *flag |= *value > *threshold;
        }
    }

    Ok(mask)
}

fn validate_threshold(metric: &'static str, value: f64) -> Result<(), DesignError> {
    if !value.is_finite() || value < 0.0 {
        return Err(DesignError::InvalidThreshold { metric, value });
    }
    Ok(())
}

fn require_column<'a>(
    raw: &'a RawConfoundTable,
    column: &str,
    context: &str,
) -> Result<&'a [f64], DesignError> {
    raw.column(column).ok_or_else(|| DesignError::MissingSignal {
        context: context.to_string(),
        column: column.to_string(),
    })
}

/// Build the design matrix for one (subject, strategy) pair.
pub fn build_design_matrix(
    raw: &RawConfoundTable,
    spec: &StrategySpec,
) -> Result<ConfoundDesignMatrix, DesignError> {
    spec.validate()
        .map_err(|e| DesignError::Configuration(e.to_string()))?;

    let mut names: Vec<String> = Vec::new();
    let mut data: Vec<Vec<f64>> = Vec::new();

    for group in ["wm", "csf", "gs", "motion"] {
        let config = match group {
            "wm" => spec.confounds.wm,
            "csf" => spec.confounds.csf,
            "gs" => spec.confounds.gs,
            "motion" => spec.confounds.motion,
            _ => unreachable!(),
        };
        let SignalGroup::Enabled {
            derivative,
            quadratic: quad,
        } = config
        else {
            continue;
        };

        let group_names = group_columns(group);
        let mut raw_signals: Vec<(&String, &[f64])> = Vec::with_capacity(group_names.len());
        for name in &group_names {
            raw_signals.push((name, require_column(raw, name, &format!("strategy '{}'", spec.name))?));
        }

        for (name, signal) in &raw_signals {
            names.push((*name).clone());
            data.push(signal.to_vec());
        }
        if derivative {
            for (name, signal) in &raw_signals {
                names.push(format!("{name}_td"));
                data.push(temporal_derivative(signal));
            }
        }
        if quad {
            for (name, signal) in &raw_signals {
                names.push(format!("{name}_quad"));
                data.push(quadratic(signal));
            }
        }
    }

    if spec.confounds.acompcor {
        for name in columns::acompcor() {
            let signal = require_column(raw, &name, &format!("strategy '{}'", spec.name))?;
            names.push(name);
            data.push(signal.to_vec());
        }
    }

    let mut n_spike_columns = 0;
    if spec.spikes.is_enabled() {
        let mask = spike_mask(raw, &spec.spikes)?;
        let flagged: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(t, &hit)| hit.then_some(t))
            .collect();
        let width = flagged.len().to_string().len().max(2);
        for (seq, &t) in flagged.iter().enumerate() {
            let mut column = vec![0.0; raw.n_timepoints()];
            column[t] = 1.0;
            names.push(format!("spike_{:0width$}", seq + 1, width = width));
            data.push(column);
        }
        n_spike_columns = flagged.len();
    }

    Ok(ConfoundDesignMatrix {
        names,
        data,
        n_timepoints: raw.n_timepoints(),
        n_spike_columns,
    })
}
