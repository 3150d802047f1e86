//! Confound-table ingest — tab-separated files into `RawConfoundTable`.
//!
//! The preprocessing pipeline writes one row per timepoint with `n/a`
//! placeholders where a difference-derived signal has no first value;
//! those load as 0.0, matching the derivative convention used when
//! expanding signals.

use std::path::Path;

use polars::prelude::*;

use crate::domain::confounds::{ConfoundTableError, RawConfoundTable};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read confounds table: {0}")]
    Read(#[from] PolarsError),

    #[error("column '{column}' has non-numeric type {dtype}")]
    NonNumericColumn { column: String, dtype: String },

    #[error("invalid confound table: {0}")]
    Table(#[from] ConfoundTableError),
}

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float64
            | DataType::Float32
            | DataType::Int64
            | DataType::Int32
            | DataType::Int16
            | DataType::Int8
            | DataType::UInt64
            | DataType::UInt32
            | DataType::UInt16
            | DataType::UInt8
    )
}

/// Read a tab-separated confound table.
///
/// Column order is preserved; `n/a` cells become 0.0.
pub fn read_confounds_tsv(path: &Path) -> Result<RawConfoundTable, IngestError> {
    let df = LazyCsvReader::new(path)
        .with_separator(b'\t')
        .with_has_header(true)
        .with_null_values(Some(NullValues::AllColumnsSingle("n/a".into())))
        .finish()?
        .collect()?;

    let mut columns: Vec<(String, Vec<f64>)> = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        let name = column.name().to_string();
        if !is_numeric(column.dtype()) {
            return Err(IngestError::NonNumericColumn {
                column: name,
                dtype: format!("{}", column.dtype()),
            });
        }
        let casted = column.cast(&DataType::Float64)?;
        let values: Vec<f64> = casted
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(0.0))
            .collect();
        columns.push((name, values));
    }

    Ok(RawConfoundTable::new(columns)?)
}
