//! Per-subject quality summarization and the inclusion decision.
//!
//! Pure functions over an immutable confound table and a finished design
//! matrix. Thresholds travel in an explicit [`InclusionPolicy`] value;
//! there is no process-wide configuration.

use thiserror::Error;

use crate::design::ConfoundDesignMatrix;
use crate::domain::confounds::{columns, RawConfoundTable};
use crate::domain::quality::SubjectQualityRecord;
use crate::stats;

/// Hard ceiling on the maximum framewise displacement, in mm.
pub const MAX_FD_LIMIT: f64 = 5.0;
/// Hard ceiling on the percentage of spike-flagged timepoints.
pub const SPIKE_PERCENT_LIMIT: f64 = 20.0;

#[derive(Debug, Error)]
pub enum QualityError {
    #[error("confound table is missing signal '{0}'")]
    MissingSignal(String),

    #[error("design matrix has {design} timepoints but the confound table has {raw}")]
    TimepointMismatch { design: usize, raw: usize },
}

/// Subject inclusion thresholds.
///
/// Only the mean-FD limit is tunable; the max-FD and spike-percentage
/// ceilings are fixed properties of the benchmark.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InclusionPolicy {
    pub mean_fd_limit: f64,
}

impl Default for InclusionPolicy {
    fn default() -> Self {
        Self { mean_fd_limit: 0.2 }
    }
}

impl InclusionPolicy {
    pub fn new(mean_fd_limit: f64) -> Self {
        Self { mean_fd_limit }
    }

    /// The inclusion rule: a subject stays in the low-motion sample unless
    /// any motion ceiling is breached.
    pub fn includes(&self, mean_fd: f64, max_fd: f64, perc_spikes: f64) -> bool {
        mean_fd <= self.mean_fd_limit
            && max_fd <= MAX_FD_LIMIT
            && perc_spikes <= SPIKE_PERCENT_LIMIT
    }
}

/// Summarize one (subject, strategy) pair into a quality record.
pub fn summarize_subject(
    raw: &RawConfoundTable,
    design: &ConfoundDesignMatrix,
    subject: &str,
    task: &str,
    session: Option<&str>,
    policy: &InclusionPolicy,
) -> Result<SubjectQualityRecord, QualityError> {
    if design.n_timepoints() != raw.n_timepoints() {
        return Err(QualityError::TimepointMismatch {
            design: design.n_timepoints(),
            raw: raw.n_timepoints(),
        });
    }

    let fd = raw
        .column(columns::FRAMEWISE_DISPLACEMENT)
        .ok_or_else(|| QualityError::MissingSignal(columns::FRAMEWISE_DISPLACEMENT.to_string()))?;

    let mean_fd = stats::mean(fd);
    let max_fd = fd.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let n_spikes = design.n_spike_columns();
    let perc_spikes = n_spikes as f64 / raw.n_timepoints() as f64 * 100.0;

    Ok(SubjectQualityRecord {
        subject: subject.to_string(),
        task: task.to_string(),
        session: session.map(str::to_string),
        mean_fd,
        max_fd,
        n_spikes,
        perc_spikes,
        n_confound_columns: design.n_columns(),
        include: policy.includes(mean_fd, max_fd, perc_spikes),
    })
}
