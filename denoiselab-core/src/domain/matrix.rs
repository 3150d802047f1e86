//! Square matrices — connectivity and distance data with symmetry checks
//! and a shared upper-triangle vectorization.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Relative tolerance for symmetry validation.
pub const SYMMETRY_RTOL: f64 = 1e-5;
/// Absolute tolerance for symmetry validation.
pub const SYMMETRY_ATOL: f64 = 1e-8;

#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("matrix data length {len} is not a perfect square")]
    NotSquare { len: usize },

    #[error("matrix is empty")]
    Empty,

    #[error("rows have unequal lengths: row {row} has {len}, expected {expected}")]
    RaggedRows {
        row: usize,
        len: usize,
        expected: usize,
    },

    #[error("non-finite value {value} at ({row}, {col})")]
    NonFinite { row: usize, col: usize, value: f64 },

    #[error("matrix not symmetric at ({row}, {col}): {upper} vs {lower}")]
    Asymmetric {
        row: usize,
        col: usize,
        upper: f64,
        lower: f64,
    },

    #[error("diagonal entry ({row}, {row}) is {value}, expected 0")]
    NonZeroDiagonal { row: usize, value: f64 },
}

/// A dense square matrix of f64 values, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquareMatrix {
    n: usize,
    data: Vec<f64>,
}

impl SquareMatrix {
    /// Build from row-major data; the length must be a perfect square.
    pub fn from_vec(data: Vec<f64>) -> Result<Self, MatrixError> {
        if data.is_empty() {
            return Err(MatrixError::Empty);
        }
        let n = (data.len() as f64).sqrt().round() as usize;
        if n * n != data.len() {
            return Err(MatrixError::NotSquare { len: data.len() });
        }
        Ok(Self { n, data })
    }

    /// Build from nested rows.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, MatrixError> {
        let n = rows.len();
        if n == 0 {
            return Err(MatrixError::Empty);
        }
        let mut data = Vec::with_capacity(n * n);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(MatrixError::RaggedRows {
                    row: i,
                    len: row.len(),
                    expected: n,
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self { n, data })
    }

    /// Side length.
    pub fn n(&self) -> usize {
        self.n
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.n + col]
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Number of off-diagonal upper-triangle entries: n(n-1)/2.
    pub fn edge_count(&self) -> usize {
        self.n * (self.n - 1) / 2
    }

    /// All entries finite.
    pub fn check_finite(&self) -> Result<(), MatrixError> {
        for row in 0..self.n {
            for col in 0..self.n {
                let value = self.get(row, col);
                if !value.is_finite() {
                    return Err(MatrixError::NonFinite { row, col, value });
                }
            }
        }
        Ok(())
    }

    /// Symmetric within `|a - b| <= atol + rtol * |b|`, both orientations.
    pub fn check_symmetric(&self, rtol: f64, atol: f64) -> Result<(), MatrixError> {
        for row in 0..self.n {
            for col in (row + 1)..self.n {
                let upper = self.get(row, col);
                let lower = self.get(col, row);
                let diff = (upper - lower).abs();
                if diff > atol + rtol * lower.abs() && diff > atol + rtol * upper.abs() {
                    return Err(MatrixError::Asymmetric {
                        row,
                        col,
                        upper,
                        lower,
                    });
                }
            }
        }
        Ok(())
    }

    /// Diagonal entries all zero (within the absolute tolerance).
    pub fn check_zero_diagonal(&self, atol: f64) -> Result<(), MatrixError> {
        for row in 0..self.n {
            let value = self.get(row, row);
            if value.abs() > atol {
                return Err(MatrixError::NonZeroDiagonal { row, value });
            }
        }
        Ok(())
    }

    /// Vectorize the upper triangle excluding the diagonal, row-major:
    /// (0,1), (0,2), ..., (0,n-1), (1,2), ...
    ///
    /// Every matrix of the same size vectorizes in the same edge order;
    /// all edge-indexed vectors in the QC pipeline rely on this.
    pub fn vectorize_upper(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.edge_count());
        for row in 0..self.n {
            for col in (row + 1)..self.n {
                out.push(self.get(row, col));
            }
        }
        out
    }
}
