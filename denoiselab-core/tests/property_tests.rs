//! Property tests for design-matrix invariants.
//!
//! Uses proptest to verify:
//! 1. Determinism — identical inputs hash identically
//! 2. Derivative of a constant signal is all zeros
//! 3. Quadratic term equals the elementwise square and is sign-invariant
//! 4. Spike columns form a one-hot indicator over flagged timepoints
//! 5. Upper-triangle vectorization has length n(n-1)/2

use proptest::prelude::*;

use denoiselab_core::domain::confounds::columns;
use denoiselab_core::domain::strategy::{
    ConfoundSelection, FilterSettings, SignalGroup, SpikeConfig, StrategySpec,
};
use denoiselab_core::{build_design_matrix, RawConfoundTable, SquareMatrix};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_signal(len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-10.0..10.0_f64, len)
}

fn arb_fd(len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0..2.0_f64, len)
}

fn table(wm: Vec<f64>, csf: Vec<f64>, fd: Vec<f64>) -> RawConfoundTable {
    let n = wm.len();
    RawConfoundTable::new(vec![
        (columns::WHITE_MATTER.to_string(), wm),
        (columns::CSF.to_string(), csf),
        (columns::FRAMEWISE_DISPLACEMENT.to_string(), fd),
        (columns::STD_DVARS.to_string(), vec![1.0; n]),
    ])
    .unwrap()
}

fn spec(wm: SignalGroup, csf: SignalGroup, spikes: SpikeConfig) -> StrategySpec {
    StrategySpec {
        name: "prop".into(),
        description: "property test strategy".into(),
        confounds: ConfoundSelection {
            wm,
            csf,
            gs: SignalGroup::Disabled,
            motion: SignalGroup::Disabled,
            acompcor: false,
        },
        aroma: false,
        spikes,
        filter: FilterSettings::default(),
        detrend: false,
        standardize: false,
    }
}

proptest! {
    /// Building twice from the same inputs yields byte-identical output.
    #[test]
    fn build_is_deterministic(
        wm in arb_signal(40),
        csf in arb_signal(40),
        fd in arb_fd(40),
    ) {
        let raw = table(wm, csf, fd);
        let strategy = spec(
            SignalGroup::full(),
            SignalGroup::raw(),
            SpikeConfig::Enabled { fd_threshold: Some(0.5), dvars_threshold: None },
        );
        let a = build_design_matrix(&raw, &strategy).unwrap();
        let b = build_design_matrix(&raw, &strategy).unwrap();
        prop_assert_eq!(a.to_tsv(), b.to_tsv());
        prop_assert_eq!(a.fingerprint(), b.fingerprint());
    }

    /// The derivative of a constant signal is identically zero.
    #[test]
    fn derivative_of_constant_is_zero(value in -5.0..5.0_f64, len in 2..60_usize) {
        let raw = table(vec![value; len], vec![0.0; len], vec![0.1; len]);
        let strategy = spec(
            SignalGroup::Enabled { derivative: true, quadratic: false },
            SignalGroup::Disabled,
            SpikeConfig::Disabled,
        );
        let dm = build_design_matrix(&raw, &strategy).unwrap();
        let td = dm.column("white_matter_td").unwrap();
        prop_assert!(td.iter().all(|&v| v == 0.0));
    }

    /// Quadratic expansion squares the raw signal and is invariant under
    /// sign negation of the input.
    #[test]
    fn quadratic_squares_and_is_sign_invariant(wm in arb_signal(30)) {
        let negated: Vec<f64> = wm.iter().map(|v| -v).collect();
        let strategy = spec(
            SignalGroup::Enabled { derivative: false, quadratic: true },
            SignalGroup::Disabled,
            SpikeConfig::Disabled,
        );

        let dm = build_design_matrix(
            &table(wm.clone(), vec![0.0; 30], vec![0.1; 30]),
            &strategy,
        ).unwrap();
        let quad = dm.column("white_matter_quad").unwrap();
        for (v, q) in wm.iter().zip(quad) {
            prop_assert!((v * v - q).abs() < 1e-12);
        }

        let dm_neg = build_design_matrix(
            &table(negated, vec![0.0; 30], vec![0.1; 30]),
            &strategy,
        ).unwrap();
        prop_assert_eq!(
            dm.column("white_matter_quad").unwrap(),
            dm_neg.column("white_matter_quad").unwrap()
        );
    }

    /// Spike columns: one column per flagged timepoint, each exactly
    /// one-hot, and together an identity-like indicator over outliers.
    #[test]
    fn spike_columns_are_one_hot(fd in arb_fd(50)) {
        let threshold = 0.5;
        let raw = table(vec![1.0; 50], vec![1.0; 50], fd.clone());
        let strategy = spec(
            SignalGroup::raw(),
            SignalGroup::Disabled,
            SpikeConfig::Enabled { fd_threshold: Some(threshold), dvars_threshold: None },
        );
        let dm = build_design_matrix(&raw, &strategy).unwrap();

        let flagged: Vec<usize> = fd
            .iter()
            .enumerate()
            .filter_map(|(t, &v)| (v > threshold).then_some(t))
            .collect();
        prop_assert_eq!(dm.n_spike_columns(), flagged.len());

        let spike_names: Vec<&String> = dm
            .column_names()
            .iter()
            .filter(|n| n.starts_with("spike_"))
            .collect();
        prop_assert_eq!(spike_names.len(), flagged.len());

        for (name, &t) in spike_names.iter().zip(&flagged) {
            let column = dm.column(name).unwrap();
            prop_assert_eq!(column.iter().filter(|&&v| v == 1.0).count(), 1);
            prop_assert_eq!(column.iter().filter(|&&v| v == 0.0).count(), column.len() - 1);
            prop_assert_eq!(column[t], 1.0);
        }
    }

    /// Vectorization length matches the edge-count formula.
    #[test]
    fn vectorize_length(n in 2..30_usize) {
        let m = SquareMatrix::from_vec(vec![0.0; n * n]).unwrap();
        prop_assert_eq!(m.vectorize_upper().len(), n * (n - 1) / 2);
    }
}
