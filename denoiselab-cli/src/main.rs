//! DenoiseLab CLI — design matrices, subject QC, and full benchmarks.
//!
//! Commands:
//! - `design` — build a confound design matrix from a confounds TSV and a
//!   strategy (preset name or JSON file)
//! - `qc` — summarize one subject's motion/quality into a JSON record
//! - `benchmark` — run the full pipeline from a TOML config
//! - `presets` — list the built-in strategies

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use denoiselab_core::data::read_confounds_tsv;
use denoiselab_core::domain::strategy::presets;
use denoiselab_core::{
    build_design_matrix, summarize_subject, InclusionPolicy, StrategySpec,
};
use denoiselab_runner::{
    materialize_inputs, run_benchmark, save_benchmark_artifacts, write_design_matrix,
    BenchmarkConfig,
};

#[derive(Parser)]
#[command(
    name = "denoiselab",
    about = "DenoiseLab CLI — denoising-strategy benchmarking"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a confound design matrix and write it as TSV.
    Design {
        /// Confounds TSV (one row per timepoint).
        #[arg(long)]
        confounds: PathBuf,

        /// Strategy: a preset name or a path to a strategy JSON file.
        #[arg(long)]
        strategy: String,

        /// Output TSV path.
        #[arg(long)]
        out: PathBuf,
    },
    /// Summarize one subject's motion/quality into a JSON record.
    Qc {
        /// Confounds TSV (one row per timepoint).
        #[arg(long)]
        confounds: PathBuf,

        /// Strategy: a preset name or a path to a strategy JSON file.
        #[arg(long)]
        strategy: String,

        /// Subject identifier (e.g., sub-01).
        #[arg(long)]
        subject: String,

        /// Task label (e.g., rest).
        #[arg(long)]
        task: String,

        /// Optional session label.
        #[arg(long)]
        session: Option<String>,

        /// Mean-FD inclusion limit.
        #[arg(long, default_value_t = 0.2)]
        mean_fd_limit: f64,

        /// Output JSON path; stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run the full benchmark described by a TOML config.
    Benchmark {
        /// Path to the benchmark TOML config.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for the artifact bundle.
        #[arg(long, default_value = "results")]
        out_dir: PathBuf,
    },
    /// List the built-in strategy presets.
    Presets,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Design {
            confounds,
            strategy,
            out,
        } => cmd_design(&confounds, &strategy, &out),
        Commands::Qc {
            confounds,
            strategy,
            subject,
            task,
            session,
            mean_fd_limit,
            out,
        } => cmd_qc(
            &confounds,
            &strategy,
            &subject,
            &task,
            session.as_deref(),
            mean_fd_limit,
            out.as_deref(),
        ),
        Commands::Benchmark { config, out_dir } => cmd_benchmark(&config, &out_dir),
        Commands::Presets => cmd_presets(),
    }
}

/// Resolve a strategy argument: preset name first, then JSON file path.
fn load_strategy(arg: &str) -> Result<StrategySpec> {
    if let Some(spec) = presets::by_name(arg) {
        return Ok(spec);
    }
    let path = Path::new(arg);
    if path.exists() {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read strategy file {}", path.display()))?;
        let spec = StrategySpec::from_json(&text)
            .with_context(|| format!("failed to parse strategy file {}", path.display()))?;
        spec.validate()?;
        return Ok(spec);
    }
    bail!(
        "'{arg}' is neither a built-in preset ({}) nor an existing file",
        presets::all()
            .iter()
            .map(|s| s.name.clone())
            .collect::<Vec<_>>()
            .join(", ")
    );
}

fn cmd_design(confounds: &Path, strategy: &str, out: &Path) -> Result<()> {
    let spec = load_strategy(strategy)?;
    let raw = read_confounds_tsv(confounds)
        .with_context(|| format!("failed to read confounds {}", confounds.display()))?;
    let design = build_design_matrix(&raw, &spec)?;
    write_design_matrix(out, &design)?;
    info!(
        strategy = %spec.name,
        columns = design.n_columns(),
        spikes = design.n_spike_columns(),
        "wrote design matrix to {}",
        out.display()
    );
    Ok(())
}

fn cmd_qc(
    confounds: &Path,
    strategy: &str,
    subject: &str,
    task: &str,
    session: Option<&str>,
    mean_fd_limit: f64,
    out: Option<&Path>,
) -> Result<()> {
    let spec = load_strategy(strategy)?;
    let raw = read_confounds_tsv(confounds)
        .with_context(|| format!("failed to read confounds {}", confounds.display()))?;
    let design = build_design_matrix(&raw, &spec)?;
    let record = summarize_subject(
        &raw,
        &design,
        subject,
        task,
        session,
        &InclusionPolicy::new(mean_fd_limit),
    )?;

    let json = serde_json::to_string_pretty(&record)?;
    match out {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("wrote quality record to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_benchmark(config_path: &Path, out_dir: &Path) -> Result<()> {
    let config = BenchmarkConfig::from_toml_path(config_path)?;
    let strategies = config.load_strategies()?;
    info!(
        group = %config.group.label(),
        strategies = strategies.len(),
        "materializing inputs"
    );
    let inputs = materialize_inputs(&config)?;

    let result = run_benchmark(&strategies, &inputs, &config.inclusion_policy())?;
    let run_dir = save_benchmark_artifacts(&result, out_dir)?;

    println!("benchmark artifacts: {}", run_dir.display());
    for run in &result.strategy_runs {
        for summary in &run.outcome.summaries {
            println!(
                "{:<12} {:<11} sig_edges={:>7.3}% median|qcfc|={:.4} dist_dep={:+.4} dof={:.1}",
                summary.strategy,
                summary.subset.label(),
                summary.percent_significant_edges,
                summary.median_abs_correlation,
                summary.distance_dependence,
                summary.mean_dof_loss,
            );
        }
    }
    if !result.failures.is_empty() {
        println!("{} unit(s) failed; see failures.json", result.failures.len());
    }
    if !result.diagnostics.is_empty() {
        print!("{}", result.diagnostics.render());
    }
    Ok(())
}

fn cmd_presets() -> Result<()> {
    for spec in presets::all() {
        println!("{:<12} {}", spec.name, spec.description);
    }
    Ok(())
}
