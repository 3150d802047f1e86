//! End-to-end benchmark runs on synthetic data: happy path, subject
//! failure isolation, and strategy-level aggregation isolation.

use denoiselab_core::domain::strategy::presets;
use denoiselab_core::{InclusionPolicy, SquareMatrix};
use denoiselab_runner::{
    run_benchmark, save_benchmark_artifacts, synthetic, GroupKey, SampleSubset, Severity,
    SyntheticSettings,
};

fn settings() -> SyntheticSettings {
    SyntheticSettings {
        n_subjects: 8,
        n_timepoints: 150,
        n_regions: 12,
        seed: 99,
    }
}

#[test]
fn full_benchmark_over_presets() {
    let strategies = presets::all();
    let inputs = synthetic::benchmark_inputs(&settings(), &strategies, GroupKey::task("rest"));
    let result = run_benchmark(&strategies, &inputs, &InclusionPolicy::default()).unwrap();

    assert_eq!(result.manifest.n_subjects, 8);
    assert_eq!(result.manifest.n_strategies, strategies.len());
    assert_eq!(result.manifest.group, "task-rest");
    assert_eq!(result.manifest.strategy_fingerprints.len(), strategies.len());

    // Every strategy aggregated; every summary row is finite.
    assert_eq!(result.strategy_runs.len(), strategies.len());
    for run in &result.strategy_runs {
        assert_eq!(run.records.len(), 8);
        assert!(!run.outcome.summaries.is_empty());
        for summary in &run.outcome.summaries {
            assert_eq!(summary.n_subjects, 8);
            assert!(summary.percent_significant_edges.is_finite());
            assert!(summary.median_abs_correlation.is_finite());
            assert!(summary.distance_dependence.is_finite());
            assert!(summary.mean_dof_loss > 0.0);
        }
        let all = run
            .outcome
            .edge_weight_vector(SampleSubset::AllSubjects)
            .unwrap();
        assert_eq!(all.len(), 12 * 11 / 2);
    }

    // The motion gradient in the synthetic data excludes the high movers.
    let first = &result.strategy_runs[0].outcome;
    assert!(!first.excluded_subjects.is_empty());

    // Comparison tables align every strategy on the shared edge index.
    let comparison = result.comparison.as_ref().expect("comparison succeeded");
    assert_eq!(comparison.edge_weights.strategies.len(), strategies.len());
    assert_eq!(comparison.edge_weights.n_edges(), 12 * 11 / 2);
    assert_eq!(comparison.qcfc_correlations.n_edges(), 12 * 11 / 2);
    assert!(comparison.summary.len() >= strategies.len());

    assert!(result.failures.is_empty());
}

#[test]
fn missing_connectivity_isolates_subject() {
    let strategies = vec![presets::simple(), presets::scrubbing()];
    let mut inputs = synthetic::benchmark_inputs(&settings(), &strategies, GroupKey::task("rest"));

    // One subject lost its scrubbing matrix; simple is untouched.
    inputs.subjects[2].connectivity.remove("scrubbing");

    let result = run_benchmark(&strategies, &inputs, &InclusionPolicy::default()).unwrap();

    assert_eq!(result.failures.len(), 1);
    let failure = &result.failures[0];
    assert_eq!(failure.subject, "sub-03");
    assert_eq!(failure.strategy, "scrubbing");

    // Both strategies still aggregated; scrubbing with one fewer subject.
    assert_eq!(result.strategy_runs.len(), 2);
    let simple = &result.strategy_runs[0];
    let scrubbing = &result.strategy_runs[1];
    assert_eq!(simple.records.len(), 8);
    assert_eq!(scrubbing.records.len(), 7);
    assert_eq!(scrubbing.outcome.summaries[0].n_subjects, 7);

    // The failure is also visible as a warning diagnostic.
    assert!(result
        .diagnostics
        .warnings()
        .any(|d| d.scope.subject.as_deref() == Some("sub-03")));

    // Comparison still runs over both strategies.
    assert!(result.comparison.is_some());
}

#[test]
fn asymmetric_matrix_isolates_strategy() {
    let strategies = vec![presets::simple(), presets::scrubbing()];
    let mut inputs = synthetic::benchmark_inputs(&settings(), &strategies, GroupKey::task("rest"));

    // Poison one scrubbing matrix with a strong asymmetry.
    let n = inputs.distance.n();
    let mut rows: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.2 }).collect())
        .collect();
    rows[0][1] = 0.9;
    inputs.subjects[4]
        .connectivity
        .insert("scrubbing".to_string(), SquareMatrix::from_rows(rows).unwrap());

    let result = run_benchmark(&strategies, &inputs, &InclusionPolicy::default()).unwrap();

    // Scrubbing aborted at aggregation; simple survived.
    assert_eq!(result.strategy_runs.len(), 1);
    assert_eq!(result.strategy_runs[0].strategy, "simple");
    assert!(result
        .diagnostics
        .errors()
        .any(|d| d.scope.strategy.as_deref() == Some("scrubbing")));

    // Comparison proceeds over the surviving strategy.
    let comparison = result.comparison.unwrap();
    assert_eq!(comparison.edge_weights.strategies, vec!["simple"]);
}

#[test]
fn artifacts_are_written() {
    let strategies = vec![presets::simple(), presets::compcor()];
    let inputs = synthetic::benchmark_inputs(&settings(), &strategies, GroupKey::task("rest"));
    let result = run_benchmark(&strategies, &inputs, &InclusionPolicy::default()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let run_dir = save_benchmark_artifacts(&result, dir.path()).unwrap();

    assert!(run_dir.join("manifest.json").exists());
    assert!(run_dir.join("summary.tsv").exists());
    assert!(run_dir.join("edge_weights.tsv").exists());
    assert!(run_dir.join("qcfc_correlations.tsv").exists());
    assert!(run_dir.join("records_simple.json").exists());
    assert!(run_dir.join("records_compcor.json").exists());
    assert!(run_dir.join("failures.json").exists());
    assert!(run_dir.join("diagnostics.json").exists());

    let summary = std::fs::read_to_string(run_dir.join("summary.tsv")).unwrap();
    assert!(summary.starts_with("strategy\tsubset\t"));
    assert!(summary.contains("simple\tall\t"));

    let weights = std::fs::read_to_string(run_dir.join("edge_weights.tsv")).unwrap();
    assert_eq!(weights.lines().next().unwrap(), "edge\tsimple\tcompcor");
    // Header plus one row per edge.
    assert_eq!(weights.lines().count(), 1 + 12 * 11 / 2);
}

#[test]
fn low_motion_summary_reports_exclusions() {
    let strategies = vec![presets::simple()];
    let inputs = synthetic::benchmark_inputs(&settings(), &strategies, GroupKey::task("rest"));
    let result = run_benchmark(&strategies, &inputs, &InclusionPolicy::default()).unwrap();

    let outcome = &result.strategy_runs[0].outcome;
    let n_excluded = outcome.excluded_subjects.len();
    assert!(n_excluded > 0, "synthetic data should exclude high movers");

    if let Some(low) = outcome
        .summaries
        .iter()
        .find(|s| s.subset == SampleSubset::LowMotionOnly)
    {
        assert_eq!(low.n_subjects, 8);
        assert_eq!(low.n_excluded, n_excluded);
    } else {
        // Fewer than two low movers: the skip must be on record.
        assert!(result
            .diagnostics
            .entries()
            .iter()
            .any(|d| d.severity == Severity::Warning
                && d.message.contains("low-motion subsample")));
    }
}
