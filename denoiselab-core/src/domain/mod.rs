//! Domain types: strategy specifications, confound tables, quality records,
//! and square matrices.

pub mod confounds;
pub mod matrix;
pub mod quality;
pub mod strategy;

pub use confounds::{ConfoundTableError, RawConfoundTable};
pub use matrix::{MatrixError, SquareMatrix};
pub use quality::SubjectQualityRecord;
pub use strategy::{ConfigError, ConfoundSelection, SignalGroup, SpikeConfig, StrategySpec};
