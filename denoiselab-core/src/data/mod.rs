//! Data boundary: TSV confound ingest and NPY matrix exchange.

pub mod ingest;
pub mod npy;

pub use ingest::{read_confounds_tsv, IngestError};
pub use npy::{read_npy_matrix, write_npy_matrix, NpyError};
