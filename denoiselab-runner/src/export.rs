//! Artifact export — TSV tables and JSON records.
//!
//! Tables are tab-separated with fixed numeric formatting so repeated runs
//! on identical inputs produce byte-identical artifacts. The artifact
//! bundle for a run lands in one directory named after the group and the
//! manifest timestamp.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use denoiselab_core::{ConfoundDesignMatrix, SubjectQualityRecord};

use crate::compare::WideTable;
use crate::qcfc::GroupQualitySummary;
use crate::runner::BenchmarkResult;

fn tsv_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(vec![])
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush TSV writer")?;
    String::from_utf8(data).context("TSV output is not valid UTF-8")
}

// ─── TSV tables ─────────────────────────────────────────────────────

/// Render the group summary table: one row per (strategy, subset).
pub fn summary_tsv(rows: &[GroupQualitySummary]) -> Result<String> {
    let mut wtr = tsv_writer();
    wtr.write_record([
        "strategy",
        "subset",
        "n_subjects",
        "n_excluded",
        "perc_sig_edges",
        "median_abs_qcfc",
        "distance_dependence",
        "mean_dof_loss",
    ])?;
    for row in rows {
        wtr.write_record(&[
            row.strategy.clone(),
            row.subset.label().to_string(),
            row.n_subjects.to_string(),
            row.n_excluded.to_string(),
            format!("{:.4}", row.percent_significant_edges),
            format!("{:.6}", row.median_abs_correlation),
            format!("{:.6}", row.distance_dependence),
            format!("{:.2}", row.mean_dof_loss),
        ])?;
    }
    finish(wtr)
}

/// Render an edge-aligned wide table: `edge` column plus one column per
/// strategy.
pub fn wide_table_tsv(table: &WideTable) -> Result<String> {
    let mut wtr = tsv_writer();
    let mut header = vec!["edge".to_string()];
    header.extend(table.strategies.iter().cloned());
    wtr.write_record(&header)?;
    for (edge, row) in table.rows.iter().enumerate() {
        let mut record = vec![edge.to_string()];
        record.extend(row.iter().map(|v| format!("{v:.6}")));
        wtr.write_record(&record)?;
    }
    finish(wtr)
}

// ─── JSON artifacts ─────────────────────────────────────────────────

pub fn records_json(records: &[SubjectQualityRecord]) -> Result<String> {
    serde_json::to_string_pretty(records).context("failed to serialize quality records")
}

// ─── Files ──────────────────────────────────────────────────────────

/// Write a design matrix's canonical TSV rendering.
pub fn write_design_matrix(path: &Path, design: &ConfoundDesignMatrix) -> Result<()> {
    std::fs::write(path, design.to_tsv())
        .with_context(|| format!("failed to write design matrix to {}", path.display()))
}

/// Save the full artifact set for one benchmark run.
///
/// Creates `{group}_{timestamp}/` under `out_dir` containing:
/// - `manifest.json` — provenance stamp
/// - `summary.tsv` — one row per (strategy, subset)
/// - `edge_weights.tsv`, `qcfc_correlations.tsv` — aligned wide tables
///   (only when the comparison stage succeeded)
/// - `records_{strategy}.json` — surviving quality records per strategy
/// - `failures.json`, `diagnostics.json` — the failure log and collected
///   diagnostics
///
/// Returns the created directory.
pub fn save_benchmark_artifacts(result: &BenchmarkResult, out_dir: &Path) -> Result<PathBuf> {
    let dirname = format!(
        "{}_{}",
        result.manifest.group,
        result.manifest.created_at.format("%Y%m%d_%H%M%S")
    );
    let run_dir = out_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let manifest = serde_json::to_string_pretty(&result.manifest)
        .context("failed to serialize run manifest")?;
    std::fs::write(run_dir.join("manifest.json"), manifest)?;

    let all_summaries: Vec<GroupQualitySummary> = result
        .strategy_runs
        .iter()
        .flat_map(|run| run.outcome.summaries.iter().cloned())
        .collect();
    std::fs::write(run_dir.join("summary.tsv"), summary_tsv(&all_summaries)?)?;

    if let Some(comparison) = &result.comparison {
        std::fs::write(
            run_dir.join("edge_weights.tsv"),
            wide_table_tsv(&comparison.edge_weights)?,
        )?;
        std::fs::write(
            run_dir.join("qcfc_correlations.tsv"),
            wide_table_tsv(&comparison.qcfc_correlations)?,
        )?;
    }

    for run in &result.strategy_runs {
        std::fs::write(
            run_dir.join(format!("records_{}.json", run.strategy)),
            records_json(&run.records)?,
        )?;
    }

    let failures = serde_json::to_string_pretty(&result.failures)
        .context("failed to serialize failure log")?;
    std::fs::write(run_dir.join("failures.json"), failures)?;

    let diagnostics = serde_json::to_string_pretty(&result.diagnostics)
        .context("failed to serialize diagnostics")?;
    std::fs::write(run_dir.join("diagnostics.json"), diagnostics)?;

    Ok(run_dir)
}
