//! Seeded synthetic data for demos and integration tests.
//!
//! Deterministic per seed: the same settings always generate the same
//! confound tables and matrices. Motion load grows with the subject index
//! so inclusion logic is exercised, and connectivity carries a mild
//! motion-coupled component so QC-FC statistics are non-degenerate.
//! Never used in production metric paths.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use denoiselab_core::domain::confounds::columns;
use denoiselab_core::{RawConfoundTable, SquareMatrix, StrategySpec};

use crate::config::{GroupKey, SyntheticSettings};
use crate::runner::{BenchmarkInputs, SubjectInput};

fn subject_rng(settings: &SyntheticSettings, subject_index: usize, stream: u64) -> StdRng {
    StdRng::seed_from_u64(
        settings
            .seed
            .wrapping_mul(0x9E37_79B9)
            .wrapping_add(subject_index as u64)
            .wrapping_add(stream << 32),
    )
}

/// Per-subject mean motion level; the last subjects exceed the default
/// 0.2 mm inclusion limit.
fn motion_level(settings: &SyntheticSettings, subject_index: usize) -> f64 {
    0.06 + 0.30 * subject_index as f64 / settings.n_subjects.max(1) as f64
}

/// Generate one subject's confound table.
pub fn confound_table(settings: &SyntheticSettings, subject_index: usize) -> RawConfoundTable {
    let n = settings.n_timepoints;
    let mut rng = subject_rng(settings, subject_index, 1);
    let level = motion_level(settings, subject_index);

    let mut cols: Vec<(String, Vec<f64>)> = Vec::new();

    for name in columns::MOTION {
        let mut walk = 0.0;
        let series: Vec<f64> = (0..n)
            .map(|_| {
                walk += rng.gen_range(-0.05..0.05) * level;
                walk
            })
            .collect();
        cols.push((name.to_string(), series));
    }

    for (name, base) in [
        (columns::WHITE_MATTER, 100.0),
        (columns::CSF, 50.0),
        (columns::GLOBAL_SIGNAL, 10.0),
    ] {
        let series: Vec<f64> = (0..n).map(|_| base + rng.gen_range(-1.0..1.0)).collect();
        cols.push((name.to_string(), series));
    }

    for name in columns::acompcor() {
        let series: Vec<f64> = (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect();
        cols.push((name, series));
    }

    // FD: first timepoint 0 (difference-derived), occasional spikes.
    let fd: Vec<f64> = (0..n)
        .map(|t| {
            if t == 0 {
                0.0
            } else if rng.gen_bool(0.04) {
                level * rng.gen_range(6.0..12.0)
            } else {
                level * rng.gen_range(0.5..1.5)
            }
        })
        .collect();
    cols.push((columns::FRAMEWISE_DISPLACEMENT.to_string(), fd));

    let dvars: Vec<f64> = (0..n)
        .map(|t| {
            if t == 0 {
                0.0
            } else if rng.gen_bool(0.02) {
                rng.gen_range(3.5..6.0)
            } else {
                rng.gen_range(0.8..1.2)
            }
        })
        .collect();
    cols.push((columns::STD_DVARS.to_string(), dvars));

    RawConfoundTable::new(cols).expect("synthetic confound table is well-formed")
}

/// Generate one subject's symmetric connectivity matrix, unit diagonal.
pub fn connectivity_matrix(
    settings: &SyntheticSettings,
    subject_index: usize,
    strategy_index: usize,
) -> SquareMatrix {
    let n = settings.n_regions;
    let mut rng = subject_rng(settings, subject_index, 2 + strategy_index as u64);
    let level = motion_level(settings, subject_index);

    let mut rows = vec![vec![0.0; n]; n];
    for (i, row) in rows.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    for i in 0..n {
        for j in (i + 1)..n {
            // Motion leaks into connectivity; stronger strategies would
            // remove more of it, modeled here as a per-strategy damping.
            let coupling = level * 0.8 / (1.0 + strategy_index as f64);
            let value = (rng.gen_range(-0.5..0.5) + coupling).clamp(-0.99, 0.99);
            rows[i][j] = value;
            rows[j][i] = value;
        }
    }
    SquareMatrix::from_rows(rows).expect("synthetic connectivity matrix is square")
}

/// Pairwise Euclidean distances between seeded random 3-D region centers.
pub fn distance_matrix(settings: &SyntheticSettings) -> SquareMatrix {
    let n = settings.n_regions;
    let mut rng = StdRng::seed_from_u64(settings.seed.wrapping_mul(0xC2B2_AE35));
    let points: Vec<[f64; 3]> = (0..n)
        .map(|_| {
            [
                rng.gen_range(-70.0..70.0),
                rng.gen_range(-100.0..70.0),
                rng.gen_range(-60.0..80.0),
            ]
        })
        .collect();

    let mut rows = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = points[i]
                .iter()
                .zip(&points[j])
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>()
                .sqrt();
            rows[i][j] = d;
            rows[j][i] = d;
        }
    }
    SquareMatrix::from_rows(rows).expect("synthetic distance matrix is square")
}

/// Materialize full benchmark inputs for a strategy set.
pub fn benchmark_inputs(
    settings: &SyntheticSettings,
    strategies: &[StrategySpec],
    group: GroupKey,
) -> BenchmarkInputs {
    let subjects = (0..settings.n_subjects)
        .map(|i| {
            let connectivity = strategies
                .iter()
                .enumerate()
                .map(|(s, spec)| (spec.name.clone(), connectivity_matrix(settings, i, s)))
                .collect();
            SubjectInput {
                subject: format!("sub-{:02}", i + 1),
                confounds: confound_table(settings, i),
                connectivity,
            }
        })
        .collect();

    BenchmarkInputs {
        group,
        subjects,
        distance: distance_matrix(settings),
    }
}
